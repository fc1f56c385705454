//! Two-pass access to one input table: a header-only read, then chunked streaming
//! of the selected columns. Plain `.csv` and zstd-compressed `.csv.zst` are both
//! handled; neither pass ever holds more than one chunk of rows.
//!
//! The header row must be UTF-8. Data rows are read as raw bytes and only the
//! subject and selected cells are decoded, so stray bytes in unrelated columns
//! do not affect extraction.

use crate::field::ColumnSelection;
use crate::paths::InputFile;
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use zstd::stream::read::Decoder;

type TableReader = csv::Reader<Box<dyn Read>>;

fn open_raw(file: &InputFile, read_buf_bytes: usize, pb: Option<&ProgressBar>) -> Result<Box<dyn Read>> {
    let f = File::open(&file.path).with_context(|| format!("open {}", file.path.display()))?;
    // progress counts bytes on disk, so wrap before decompression
    let raw: Box<dyn Read> = match pb {
        Some(pb) => Box::new(pb.wrap_read(f)),
        None => Box::new(f),
    };
    if file.compressed {
        let mut dec = Decoder::new(raw).with_context(|| format!("zstd init {}", file.path.display()))?;
        dec.window_log_max(31)?;
        Ok(Box::new(BufReader::with_capacity(read_buf_bytes, dec)))
    } else {
        Ok(Box::new(BufReader::with_capacity(read_buf_bytes, raw)))
    }
}

fn open_table(file: &InputFile, read_buf_bytes: usize, pb: Option<&ProgressBar>) -> Result<TableReader> {
    let raw = open_raw(file, read_buf_bytes, pb)?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(raw))
}

/// Pass 1: read only the header row.
pub fn read_header(file: &InputFile) -> Result<Vec<String>> {
    let mut rdr = open_table(file, 16 * 1024, None)?;
    let header = rdr
        .headers()
        .with_context(|| format!("read header of {}", file.path.display()))?;
    Ok(header.iter().map(str::to_string).collect())
}

/// One subject's selected values, aligned with `Chunk::columns`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub subject: String,
    pub values: Vec<String>,
}

/// A bounded batch of rows restricted to the selected columns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Chunk {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Chunk {
    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }
}

/// Pass 2: yields chunks of at most `chunk_size` rows, one at a time.
pub struct ChunkReader {
    rdr: TableReader,
    record: csv::ByteRecord,
    source: PathBuf,
    subject_index: usize,
    indices: Vec<usize>,
    columns: Vec<String>,
    chunk_size: usize,
    done: bool,
}

impl ChunkReader {
    pub fn open(
        file: &InputFile,
        selection: &ColumnSelection,
        chunk_size: usize,
        read_buf_bytes: usize,
        pb: Option<&ProgressBar>,
    ) -> Result<Self> {
        let mut rdr = open_table(file, read_buf_bytes, pb)?;
        // consume the header so that the first `read_record` is data
        rdr.headers().with_context(|| format!("read header of {}", file.path.display()))?;
        Ok(Self {
            rdr,
            record: csv::ByteRecord::new(),
            source: file.path.clone(),
            subject_index: selection.subject_index,
            indices: selection.columns.iter().map(|c| c.index).collect(),
            columns: selection.columns.iter().map(|c| c.name.clone()).collect(),
            chunk_size: chunk_size.max(1),
            done: false,
        })
    }

    fn cell(&self, i: usize) -> Result<String> {
        let raw = self.record.get(i).unwrap_or(b"");
        let text = std::str::from_utf8(raw).with_context(|| {
            let line = self.record.position().map_or(0, |p| p.line());
            format!("{} line {}: column {} is not valid UTF-8", self.source.display(), line, i + 1)
        })?;
        Ok(text.to_string())
    }

    fn read_chunk(&mut self) -> Result<Option<Chunk>> {
        let mut rows = Vec::with_capacity(self.chunk_size.min(64 * 1024));
        while rows.len() < self.chunk_size {
            if !self.rdr.read_byte_record(&mut self.record)? {
                self.done = true;
                break;
            }
            let subject = self.cell(self.subject_index)?;
            let values = self.indices.iter().map(|&i| self.cell(i)).collect::<Result<Vec<_>>>()?;
            rows.push(Row { subject, values });
        }
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(Chunk { columns: self.columns.clone(), rows }))
    }
}

impl Iterator for ChunkReader {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
