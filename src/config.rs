use crate::error::ConfigError;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// How requested identifiers are matched against header columns, and how
/// repeated measurements of one field are collapsed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineMode {
    /// Requests are full column ids (`50-0.0`); no collapsing.
    #[default]
    None,
    /// Requests are base ids (`50`); the rightmost non-missing value wins.
    Last,
    /// Requests are base ids (`50`); the leftmost non-missing value wins.
    First,
}

impl CombineMode {
    #[inline]
    pub fn is_combining(self) -> bool {
        !matches!(self, CombineMode::None)
    }
}

/// Which filename-derived attribute orders the candidate files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriorityKey {
    /// Larger dataset id first (newer releases supersede older ones).
    #[default]
    DatasetId,
    /// Smaller files first.
    Size,
}

/// What goes into the FID column of the output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FamilyId {
    /// FID repeats the subject id (FID == IID).
    #[default]
    SubjectId,
    /// FID is the constant `0`.
    Zero,
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct ExtractOptions {
    pub input_dir: Option<PathBuf>,   // falls back to PHENO_PATH
    pub output_dir: PathBuf,
    pub output_name: String,          // creates <output_dir>/<name>/<name><id>.pheno
    pub combine: CombineMode,
    pub chunk_size: usize,            // rows per chunk; the memory bound
    pub priority: PriorityKey,
    pub exclude_file: Option<PathBuf>, // falls back to EXCLUSION_FILE
    pub subject_column: String,
    pub family_id: FamilyId,
    pub progress: bool,

    // IO tuning
    pub read_buffer_bytes: usize,
    pub write_buffer_bytes: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            input_dir: None,
            output_dir: PathBuf::from("."),
            output_name: String::new(),
            combine: CombineMode::None,
            chunk_size: 10_000,
            priority: PriorityKey::DatasetId,
            exclude_file: None,
            subject_column: "eid".to_string(),
            family_id: FamilyId::SubjectId,
            progress: false,

            read_buffer_bytes: 256 * 1024,
            write_buffer_bytes: 64 * 1024,
        }
    }
}

impl ExtractOptions {
    pub fn with_input_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.input_dir = Some(dir.as_ref().to_path_buf());
        self
    }
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_output_name(mut self, name: impl AsRef<str>) -> Self {
        self.output_name = name.as_ref().trim().to_string();
        self
    }
    pub fn with_combine(mut self, mode: CombineMode) -> Self {
        self.combine = mode;
        self
    }
    /// Zero is kept as-is so that validation can reject it.
    pub fn with_chunk_size(mut self, rows: usize) -> Self {
        self.chunk_size = rows;
        self
    }
    pub fn with_priority(mut self, key: PriorityKey) -> Self {
        self.priority = key;
        self
    }
    pub fn with_exclude_file(mut self, path: impl AsRef<Path>) -> Self {
        self.exclude_file = Some(path.as_ref().to_path_buf());
        self
    }
    pub fn with_subject_column(mut self, name: impl AsRef<str>) -> Self {
        self.subject_column = name.as_ref().trim().to_string();
        self
    }
    pub fn with_family_id(mut self, fid: FamilyId) -> Self {
        self.family_id = fid;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }

    // IO buffers tuning
    pub fn with_io_read_buffer(mut self, bytes: usize) -> Self {
        self.read_buffer_bytes = bytes.max(8 * 1024);
        self
    }
    pub fn with_io_write_buffer(mut self, bytes: usize) -> Self {
        self.write_buffer_bytes = bytes.max(8 * 1024);
        self
    }

    /// Fill unset paths from the environment (`PHENO_PATH`, `EXCLUSION_FILE`).
    pub fn with_env_fallbacks(mut self) -> Self {
        if self.input_dir.is_none() {
            self.input_dir = env_path("PHENO_PATH");
        }
        if self.exclude_file.is_none() {
            self.exclude_file = env_path("EXCLUSION_FILE");
        }
        self
    }

    /// Reject configurations that cannot run. Checks the filesystem for the
    /// input dir, output dir and exclusion file; reads no data.
    pub fn validate(&self) -> Result<PathBuf, ConfigError> {
        if self.output_name.is_empty() {
            return Err(ConfigError::EmptyOutputName);
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        let input = self.input_dir.clone().ok_or(ConfigError::MissingInputDir)?;
        if !input.is_dir() {
            return Err(ConfigError::NotADirectory(input));
        }
        if !self.output_dir.is_dir() {
            return Err(ConfigError::NotADirectory(self.output_dir.clone()));
        }
        if let Some(ex) = &self.exclude_file {
            if !ex.is_file() {
                return Err(ConfigError::MissingExclusionFile(ex.clone()));
            }
        }
        Ok(input)
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    let raw = std::env::var(var).ok()?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    // expand a leading "~/" the way the shell would
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return Some(PathBuf::from(home).join(rest));
        }
    }
    Some(PathBuf::from(raw))
}
