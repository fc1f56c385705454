use crate::combine::is_missing;
use crate::config::FamilyId;
use crate::table::Chunk;
use anyhow::{anyhow, Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Written in place of a missing value.
pub const MISSING: &str = "-9";

/// `<out_dir>/<name>/<name><dataset_tag>.pheno`, the tag being the file name's digits verbatim.
pub fn pheno_path(out_dir: &Path, name: &str, dataset_tag: &str) -> PathBuf {
    out_dir.join(name).join(format!("{}{}.pheno", name, dataset_tag))
}

/// Space-separated `.pheno` output for one source file.
///
/// The file is created (truncated) lazily by the first chunk, which also writes
/// the `FID IID ...` header; every later chunk is appended. Each chunk is
/// flushed before `write_chunk` returns.
pub struct PhenoWriter {
    path: PathBuf,
    family_id: FamilyId,
    buf_bytes: usize,
    w: Option<BufWriter<File>>,
    header_written: bool,
    rows: u64,
    line: String,
}

impl PhenoWriter {
    pub fn new(path: impl Into<PathBuf>, family_id: FamilyId, buf_bytes: usize) -> Self {
        Self {
            path: path.into(),
            family_id,
            buf_bytes: buf_bytes.max(8 * 1024),
            w: None,
            header_written: false,
            rows: 0,
            line: String::with_capacity(256),
        }
    }

    pub fn path(&self) -> &Path { &self.path }
    pub fn rows_written(&self) -> u64 { self.rows }
    pub fn header_written(&self) -> bool { self.header_written }

    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        if self.w.is_none() {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
            }
            let mut opts = OpenOptions::new();
            if self.header_written {
                opts.append(true);
            } else {
                opts.write(true).create(true).truncate(true);
            }
            let f = opts.open(&self.path).with_context(|| format!("open {}", self.path.display()))?;
            self.w = Some(BufWriter::with_capacity(self.buf_bytes, f));
        }
        let path = &self.path;
        self.w.as_mut().ok_or_else(|| anyhow!("writer for {} is not open", path.display()))
    }

    /// Write the header (first call only) and every row of `chunk`.
    pub fn write_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        let path = self.path.clone();
        if !self.header_written {
            let mut header = String::from("FID IID");
            for c in &chunk.columns {
                header.push(' ');
                header.push_str(&sanitize(c));
            }
            header.push('\n');
            self.writer()?.write_all(header.as_bytes())?;
            self.header_written = true;
        }

        let mut line = std::mem::take(&mut self.line);
        for row in &chunk.rows {
            line.clear();
            let subject = sanitize(&row.subject);
            match self.family_id {
                FamilyId::SubjectId => line.push_str(&subject),
                FamilyId::Zero => line.push('0'),
            }
            line.push(' ');
            line.push_str(&subject);
            for v in &row.values {
                line.push(' ');
                if is_missing(v) {
                    line.push_str(MISSING);
                } else {
                    line.push_str(&sanitize(v));
                }
            }
            line.push('\n');
            self.writer()?
                .write_all(line.as_bytes())
                .with_context(|| format!("write {}", path.display()))?;
        }
        self.rows += chunk.rows.len() as u64;
        self.line = line;

        self.writer()?.flush().with_context(|| format!("flush {}", path.display()))?;
        Ok(())
    }

    /// Flush and close. Returns the number of data rows written.
    pub fn finish(mut self) -> Result<u64> {
        if let Some(mut w) = self.w.take() {
            w.flush().with_context(|| format!("flush {}", self.path.display()))?;
        }
        Ok(self.rows)
    }
}

/// Whitespace inside a value would break the space-separated layout.
fn sanitize(v: &str) -> std::borrow::Cow<'_, str> {
    let v = v.trim();
    if v.contains(char::is_whitespace) {
        std::borrow::Cow::Owned(v.split_whitespace().collect::<Vec<_>>().join("_"))
    } else {
        std::borrow::Cow::Borrowed(v)
    }
}
