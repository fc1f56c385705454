#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch layout for one test: `<tmp>/data` holds the ukb tables,
/// `<tmp>/out` is the (existing) output directory.
pub struct Corpus {
    pub tmp: TempDir,
    pub data: PathBuf,
    pub out: PathBuf,
}

impl Corpus {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        let out = tmp.path().join("out");
        fs::create_dir_all(&data).unwrap();
        fs::create_dir_all(&out).unwrap();
        Self { tmp, data, out }
    }

    /// Write `ukb<id>.csv` with the given lines (header first).
    pub fn table(&self, dataset_id: u64, lines: &[&str]) -> PathBuf {
        write_lines(&self.data.join(format!("ukb{}.csv", dataset_id)), lines)
    }

    /// Write `ukb<id>.csv.zst` with the given lines (header first).
    pub fn table_zst(&self, dataset_id: u64, lines: &[&str]) -> PathBuf {
        let path = self.data.join(format!("ukb{}.csv.zst", dataset_id));
        let f = File::create(&path).unwrap();
        let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
        for l in lines {
            writeln!(&mut enc, "{}", l).unwrap();
        }
        enc.finish().unwrap();
        path
    }

    /// Header-less exclusion list, one id per line.
    pub fn exclusions(&self, ids: &[&str]) -> PathBuf {
        write_lines(&self.tmp.path().join("exclude.csv"), ids)
    }

    /// A second, empty output directory (for comparing runs).
    pub fn fresh_out(&self, name: &str) -> PathBuf {
        let p = self.tmp.path().join(name);
        fs::create_dir_all(&p).unwrap();
        p
    }
}

pub fn write_lines(path: &Path, lines: &[&str]) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut f = File::create(path).unwrap();
    for l in lines {
        writeln!(&mut f, "{}", l).unwrap();
    }
    path.to_path_buf()
}

pub fn read_text(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {}", path.display(), e))
}

/// `<out>/<name>/<name><id>.pheno`
pub fn pheno(out: &Path, name: &str, dataset_id: u64) -> PathBuf {
    out.join(name).join(format!("{}{}.pheno", name, dataset_id))
}
