#[path = "common/mod.rs"]
mod common;

use common::*;
use pheno_extract::{CombineMode, FamilyId, PhenoExtract};

fn base(c: &Corpus) -> PhenoExtract {
    PhenoExtract::new()
        .input_dir(&c.data)
        .output_dir(&c.out)
        .output_name("pheno")
        .progress(false)
}

/// Two files, one field each, combine mode, one row per chunk.
/// Each field lands in the output of the file that holds it and the run completes.
#[test]
fn fields_split_across_two_files() {
    let c = Corpus::new();
    c.table(2, &["eid,21-0.0", "1001,5"]);
    c.table(1, &["eid,31-0.0,34-0.0", "1001,7,"]);

    let report = base(&c)
        .combine(CombineMode::Last)
        .chunk_size(1)
        .extract(["21", "31"])
        .unwrap();

    assert!(report.completed);
    assert!(report.unmatched.is_empty());
    assert_eq!(read_text(&pheno(&c.out, "pheno", 2)), "FID IID 21\n1001 1001 5\n");
    assert_eq!(read_text(&pheno(&c.out, "pheno", 1)), "FID IID 31\n1001 1001 7\n");
    assert_eq!(report.files.len(), 2);
    assert_eq!(report.files[0].dataset_id, 2, "higher dataset id is read first");
}

/// A field present in both files is taken from the higher-priority one only,
/// and the lower-priority file is still used for the remaining field.
#[test]
fn higher_priority_file_wins() {
    let c = Corpus::new();
    c.table(200, &["eid,50-0.0", "1,170", "2,180"]);
    c.table(100, &["eid,50-0.0,21-0.0", "1,999,3", "2,888,4"]);

    let report = base(&c).extract(["50-0.0", "21-0.0"]).unwrap();

    assert!(report.completed);
    assert_eq!(read_text(&pheno(&c.out, "pheno", 200)), "FID IID 50-0.0\n1 1 170\n2 2 180\n");
    assert_eq!(read_text(&pheno(&c.out, "pheno", 100)), "FID IID 21-0.0\n1 1 3\n2 2 4\n");
}

/// Once the worklist is drained, later files are never opened for data.
#[test]
fn lower_priority_file_skipped_after_drain() {
    let c = Corpus::new();
    c.table(9, &["eid,50-0.0", "1,170"]);
    c.table(3, &["eid,50-0.0", "1,999"]);

    let report = base(&c).extract(["50-0.0"]).unwrap();

    assert!(report.completed);
    assert_eq!(report.files.len(), 1);
    assert!(pheno(&c.out, "pheno", 9).exists());
    assert!(!pheno(&c.out, "pheno", 3).exists());
}

/// Excluded subjects never appear, in any file.
#[test]
fn excluded_subjects_are_dropped_everywhere() {
    let c = Corpus::new();
    c.table(2, &["eid,50-0.0", "1,170", "2,180", "3,190"]);
    c.table(1, &["eid,21-0.0", "2,1", "3,2"]);
    let ex = c.exclusions(&["2"]);

    let report = base(&c)
        .exclude_file(&ex)
        .chunk_size(1)
        .extract(["50-0.0", "21-0.0"])
        .unwrap();

    assert_eq!(read_text(&pheno(&c.out, "pheno", 2)), "FID IID 50-0.0\n1 1 170\n3 3 190\n");
    assert_eq!(read_text(&pheno(&c.out, "pheno", 1)), "FID IID 21-0.0\n3 3 2\n");
    assert_eq!(report.files[0].rows_excluded, 1);
    assert_eq!(report.files[1].rows_excluded, 1);
}

/// Empty and NA values are written as -9; no row is lost.
#[test]
fn missing_values_are_encoded_not_dropped() {
    let c = Corpus::new();
    c.table(1, &["eid,50-0.0,21-0.0", "1,,4", "2,NA,", "3,175,5"]);

    let report = base(&c).extract(["50-0.0", "21-0.0"]).unwrap();

    assert_eq!(
        read_text(&pheno(&c.out, "pheno", 1)),
        "FID IID 50-0.0 21-0.0\n1 1 -9 4\n2 2 -9 -9\n3 3 175 5\n"
    );
    assert_eq!(report.files[0].rows_written, 3);
}

/// Chunk size changes memory use, never bytes on disk.
#[test]
fn chunk_size_does_not_change_output() {
    let c = Corpus::new();
    c.table(5, &["eid,50-0.0,50-1.0", "1,1,", "2,,2", "3,3,3", "4,,", "5,5,6"]);
    let small = c.fresh_out("small");
    let large = c.fresh_out("large");

    let r1 = base(&c).output_dir(&small).combine(CombineMode::Last).chunk_size(2).extract(["50"]).unwrap();
    let r2 = base(&c).output_dir(&large).combine(CombineMode::Last).chunk_size(10_000).extract(["50"]).unwrap();

    assert_eq!(r1.files[0].chunks, 3);
    assert_eq!(r2.files[0].chunks, 1);
    let a = read_text(&pheno(&small, "pheno", 5));
    let b = read_text(&pheno(&large, "pheno", 5));
    assert_eq!(a, b);
    assert_eq!(a, "FID IID 50\n1 1 1\n2 2 2\n3 3 3\n4 4 -9\n5 5 6\n");
}

/// Same inputs, fresh output directory: byte-identical files.
#[test]
fn rerun_is_byte_identical() {
    let c = Corpus::new();
    c.table(2, &["eid,50-0.0,50-1.0,31-0.0", "1,160,,0", "2,,165,1"]);
    c.table(1, &["eid,21-0.0", "1,5", "2,6"]);
    let ex = c.exclusions(&["9"]);
    let first = c.fresh_out("first");
    let second = c.fresh_out("second");

    for out in [&first, &second] {
        base(&c)
            .output_dir(out)
            .exclude_file(&ex)
            .combine(CombineMode::First)
            .chunk_size(1)
            .extract(["50", "31", "21"])
            .unwrap();
    }

    for id in [2, 1] {
        assert_eq!(read_text(&pheno(&first, "pheno", id)), read_text(&pheno(&second, "pheno", id)));
    }
}

/// Rewriting into a directory that already holds output replaces it rather than appending.
#[test]
fn existing_output_is_truncated() {
    let c = Corpus::new();
    c.table(1, &["eid,50-0.0", "1,170"]);

    base(&c).extract(["50-0.0"]).unwrap();
    base(&c).extract(["50-0.0"]).unwrap();

    assert_eq!(read_text(&pheno(&c.out, "pheno", 1)), "FID IID 50-0.0\n1 1 170\n");
}

#[test]
fn family_id_zero_policy() {
    let c = Corpus::new();
    c.table(1, &["eid,21-0.0", "1001,5"]);

    let report = base(&c).family_id(FamilyId::Zero).extract(["21-0.0"]).unwrap();

    assert_eq!(report.family_id, FamilyId::Zero);
    assert_eq!(read_text(&pheno(&c.out, "pheno", 1)), "FID IID 21-0.0\n0 1001 5\n");
}

/// Unknown ids are reported, not fatal; what was found is still written.
#[test]
fn unmatched_fields_are_reported() {
    let c = Corpus::new();
    c.table(1, &["eid,50-0.0", "1,170"]);

    let report = base(&c).extract(["50-0.0", "999-0.0"]).unwrap();

    assert!(!report.completed);
    assert_eq!(report.unmatched.iter().collect::<Vec<_>>(), vec!["999-0.0"]);
    assert!(pheno(&c.out, "pheno", 1).exists());
}

/// A matching header without data rows still yields a header-only file.
#[test]
fn header_only_file() {
    let c = Corpus::new();
    c.table(4, &["eid,50-0.0"]);

    let report = base(&c).extract(["50-0.0"]).unwrap();

    assert!(report.completed);
    assert_eq!(report.files[0].rows_written, 0);
    assert_eq!(read_text(&pheno(&c.out, "pheno", 4)), "FID IID 50-0.0\n");
}

/// When every row of the first chunk is excluded the header is still written once.
#[test]
fn fully_excluded_first_chunk_keeps_header() {
    let c = Corpus::new();
    c.table(1, &["eid,50-0.0", "1,170", "2,180"]);
    let ex = c.exclusions(&["1"]);

    base(&c).exclude_file(&ex).chunk_size(1).extract(["50-0.0"]).unwrap();

    assert_eq!(read_text(&pheno(&c.out, "pheno", 1)), "FID IID 50-0.0\n2 2 180\n");
}

/// Requesting "1" must not pull in field 12.
#[test]
fn no_substring_matches_end_to_end() {
    let c = Corpus::new();
    c.table(1, &["eid,12-0.0,1-0.0,21-0.0", "5,x,y,z"]);

    base(&c).combine(CombineMode::Last).extract(["1"]).unwrap();

    assert_eq!(read_text(&pheno(&c.out, "pheno", 1)), "FID IID 1\n5 5 y\n");
}

/// Rows with a different field count abort the run.
#[test]
fn malformed_row_is_an_error() {
    let c = Corpus::new();
    c.table(1, &["eid,50-0.0", "1,170", "2,180,extra"]);

    let err = base(&c).extract(["50-0.0"]).unwrap_err();
    assert!(format!("{:#}", err).contains("ukb1.csv"), "error should name the file: {:#}", err);
}

#[test]
fn report_serializes_to_json() {
    let c = Corpus::new();
    c.table(1, &["eid,50-0.0", "1,170"]);
    let path = c.tmp.path().join("report.json");

    let report = base(&c).combine(CombineMode::First).extract(["50", "77"]).unwrap();
    report.write_json(&path).unwrap();

    let v: serde_json::Value = serde_json::from_str(&read_text(&path)).unwrap();
    assert_eq!(v["completed"], serde_json::json!(false));
    assert_eq!(v["unmatched"], serde_json::json!(["77"]));
    assert_eq!(v["combine"], serde_json::json!("first"));
    assert_eq!(v["family_id"], serde_json::json!("subject-id"));
    assert_eq!(v["files"][0]["columns"], serde_json::json!(["50"]));
    assert_eq!(v["files"][0]["rows_written"], serde_json::json!(1));
}
