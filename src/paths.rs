use crate::config::PriorityKey;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

/// A candidate data release on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InputFile {
    pub path: PathBuf,
    pub dataset_id: u64,  // ukb<dataset_id>.csv
    /// Digits exactly as they appear in the file name; used for output naming.
    pub dataset_tag: String,
    pub size: u64,        // bytes on disk (compressed size for .zst)
    pub compressed: bool, // .csv.zst
}

impl InputFile {
    /// Build from a path whose file name is `ukb<digits>.csv` or `ukb<digits>.csv.zst`.
    /// Returns `Ok(None)` for any other file name, and an error when the digits
    /// do not fit a `u64`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { return Ok(None) };
        let Some((tag, compressed)) = parse_file_name(name) else { return Ok(None) };
        let dataset_id: u64 = tag
            .parse()
            .with_context(|| format!("dataset id '{}' of {} is out of range", tag, path.display()))?;
        let size = fs::metadata(path)
            .with_context(|| format!("stat {}", path.display()))?
            .len();
        Ok(Some(Self { path: path.to_path_buf(), dataset_id, dataset_tag: tag.to_string(), size, compressed }))
    }
}

fn parse_file_name(name: &str) -> Option<(&str, bool)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^ukb(\d+)\.csv(\.zst)?$").unwrap());
    let caps = re.captures(name)?;
    let tag = caps.get(1)?.as_str();
    Some((tag, caps.get(2).is_some()))
}

/// Dataset id parsed from a file name, if it follows the `ukb<digits>.csv[.zst]` scheme.
pub fn dataset_id_from_name(name: &str) -> Option<u64> {
    parse_file_name(name).and_then(|(tag, _)| tag.parse().ok())
}

/// Fail when two candidates would write the same `<name><tag>.pheno`
/// (e.g. `ukb7.csv` next to `ukb7.csv.zst`).
pub fn check_distinct_tags(files: &[InputFile]) -> Result<(), ConfigError> {
    let mut seen: BTreeMap<&str, &Path> = BTreeMap::new();
    for f in files {
        if let Some(first) = seen.insert(&f.dataset_tag, &f.path) {
            return Err(ConfigError::DuplicateDataset {
                tag: f.dataset_tag.clone(),
                first: first.to_path_buf(),
                second: f.path.clone(),
            });
        }
    }
    Ok(())
}

/// List candidate files directly inside `dir` (no recursion), unordered.
pub fn discover_input_files(dir: &Path) -> Result<Vec<InputFile>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let ent = entry.with_context(|| format!("listing {}", dir.display()))?;
        if !ent.file_type().is_file() {
            continue;
        }
        if let Some(f) = InputFile::from_path(ent.path())? {
            out.push(f);
        }
    }
    Ok(out)
}

/// Ordering strategy over candidate files. Must only look at file metadata.
pub trait FilePriority {
    /// `Less` means `a` is read before `b`.
    fn compare(&self, a: &InputFile, b: &InputFile) -> Ordering;
}

/// Larger dataset id first.
#[derive(Clone, Copy, Debug, Default)]
pub struct DatasetIdDesc;

impl FilePriority for DatasetIdDesc {
    fn compare(&self, a: &InputFile, b: &InputFile) -> Ordering {
        b.dataset_id.cmp(&a.dataset_id)
    }
}

/// Smaller file first.
#[derive(Clone, Copy, Debug, Default)]
pub struct SizeAsc;

impl FilePriority for SizeAsc {
    fn compare(&self, a: &InputFile, b: &InputFile) -> Ordering {
        a.size.cmp(&b.size)
    }
}

impl PriorityKey {
    pub fn strategy(self) -> Box<dyn FilePriority> {
        match self {
            PriorityKey::DatasetId => Box::new(DatasetIdDesc),
            PriorityKey::Size => Box::new(SizeAsc),
        }
    }
}

/// Sort files by `priority`. Ties fall back to dataset id (descending) then path,
/// so the order is stable across runs.
pub fn order_files(mut files: Vec<InputFile>, priority: &dyn FilePriority) -> Vec<InputFile> {
    files.sort_by(|a, b| {
        priority
            .compare(a, b)
            .then_with(|| b.dataset_id.cmp(&a.dataset_id))
            .then_with(|| a.path.cmp(&b.path))
    });
    files
}
