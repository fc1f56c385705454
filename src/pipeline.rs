use crate::combine::CombinePlan;
use crate::config::{CombineMode, ExtractOptions, FamilyId, PriorityKey};
use crate::error::ConfigError;
use crate::exclusion::ExclusionSet;
use crate::field::{select_columns, Worklist};
use crate::output::{pheno_path, PhenoWriter};
use crate::paths::{check_distinct_tags, discover_input_files, order_files, InputFile};
use crate::progress::{file_progress, total_size};
use crate::table::{read_header, Chunk, ChunkReader};
use crate::util::init_tracing_once;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Streaming extraction engine. Configure with the builder methods, then call
/// [`PhenoExtract::extract`].
#[derive(Clone, Debug, Default)]
pub struct PhenoExtract {
    pub(crate) opts: ExtractOptions,
}

/// What one source file contributed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub source: PathBuf,
    pub dataset_id: u64,
    pub dataset_tag: String,
    pub output: PathBuf,
    /// Requests this file satisfied.
    pub fields: Vec<String>,
    /// Columns written after `FID IID`.
    pub columns: Vec<String>,
    pub chunks: u64,
    pub rows_written: u64,
    pub rows_excluded: u64,
}

/// Outcome of a run. `completed` is true iff every request was found.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionReport {
    pub completed: bool,
    pub unmatched: BTreeSet<String>,
    pub combine: CombineMode,
    pub family_id: FamilyId,
    pub files: Vec<FileSummary>,
}

impl ExtractionReport {
    /// Serialize as pretty JSON to `path`.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let f = fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(f), self)
            .with_context(|| format!("write report {}", path.display()))
    }
}

impl PhenoExtract {
    pub fn new() -> Self {
        Self { opts: ExtractOptions::default() }
    }

    pub fn from_options(opts: ExtractOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &ExtractOptions { &self.opts }

    // -------- Builder methods --------
    pub fn input_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_input_dir(dir); self }
    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_output_dir(dir); self }
    pub fn output_name(mut self, name: impl AsRef<str>) -> Self { self.opts = self.opts.with_output_name(name); self }
    pub fn combine(mut self, mode: CombineMode) -> Self { self.opts = self.opts.with_combine(mode); self }
    pub fn chunk_size(mut self, rows: usize) -> Self { self.opts = self.opts.with_chunk_size(rows); self }
    pub fn priority(mut self, key: PriorityKey) -> Self { self.opts = self.opts.with_priority(key); self }
    pub fn exclude_file(mut self, path: impl AsRef<Path>) -> Self { self.opts = self.opts.with_exclude_file(path); self }
    pub fn subject_column(mut self, name: impl AsRef<str>) -> Self { self.opts = self.opts.with_subject_column(name); self }
    pub fn family_id(mut self, fid: FamilyId) -> Self { self.opts = self.opts.with_family_id(fid); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn io_read_buffer(mut self, bytes: usize) -> Self { self.opts = self.opts.with_io_read_buffer(bytes); self }
    pub fn io_write_buffer(mut self, bytes: usize) -> Self { self.opts = self.opts.with_io_write_buffer(bytes); self }
    pub fn env_fallbacks(mut self) -> Self { self.opts = self.opts.with_env_fallbacks(); self }

    /// Full run: validate the configuration, load exclusions, discover and order
    /// `ukb*.csv[.zst]` files in the input directory, then extract.
    pub fn extract<I, S>(&self, fields: I) -> Result<ExtractionReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        init_tracing_once(false);
        let worklist = Worklist::new(fields)?;
        let input_dir = self.opts.validate()?;

        let exclusions = match &self.opts.exclude_file {
            Some(p) => {
                let set = ExclusionSet::load(p)?;
                tracing::info!("Loaded {} excluded subjects from {}", set.len(), p.display());
                set
            }
            None => {
                tracing::warn!("No exclusion file given; no subjects will be excluded.");
                ExclusionSet::empty()
            }
        };

        let found = discover_input_files(&input_dir)?;
        let files = order_files(found, self.opts.priority.strategy().as_ref());
        if files.is_empty() {
            tracing::warn!("No ukb*.csv files found in {}", input_dir.display());
        } else {
            tracing::info!("Planned {} files ({} bytes) in {:?} order.", files.len(), total_size(&files), self.opts.priority);
        }
        tracing::debug!("File list: {:?}", files.iter().map(|f| f.path.display().to_string()).collect::<Vec<_>>());

        self.extract_files(worklist, &files, &exclusions)
    }

    /// Core loop over an already-ordered file list. Stops once the worklist is drained.
    pub fn extract_files(
        &self,
        mut worklist: Worklist,
        files: &[InputFile],
        exclusions: &ExclusionSet,
    ) -> Result<ExtractionReport> {
        if self.opts.output_name.is_empty() {
            return Err(ConfigError::EmptyOutputName.into());
        }
        if self.opts.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize.into());
        }
        check_distinct_tags(files)?;
        let target = self.opts.output_dir.join(&self.opts.output_name);
        fs::create_dir_all(&target).with_context(|| format!("create {}", target.display()))?;

        match self.opts.family_id {
            FamilyId::SubjectId => tracing::info!("FID column: subject id (FID == IID)"),
            FamilyId::Zero => tracing::info!("FID column: constant 0"),
        }

        let mut summaries = Vec::new();
        for file in files {
            if worklist.is_empty() {
                break;
            }
            if let Some(summary) = self.process_file(file, &worklist, exclusions)? {
                let n = worklist.satisfy(summary.fields.iter().map(String::as_str));
                tracing::debug!("{} requests satisfied by {}; {} remaining", n, file.path.display(), worklist.len());
                summaries.push(summary);
            }
        }

        let unmatched = worklist.into_remaining();
        if !unmatched.is_empty() {
            tracing::warn!("The following IDs were not found in the ukb csv files: {:?}", unmatched);
        }
        Ok(ExtractionReport {
            completed: unmatched.is_empty(),
            unmatched,
            combine: self.opts.combine,
            family_id: self.opts.family_id,
            files: summaries,
        })
    }

    /// Header pass, then (if anything matched) the chunked data pass for one file.
    fn process_file(
        &self,
        file: &InputFile,
        worklist: &Worklist,
        exclusions: &ExclusionSet,
    ) -> Result<Option<FileSummary>> {
        let header = read_header(file)?;
        tracing::debug!("File being read: {} ({} columns)", file.path.display(), header.len());

        let selection = select_columns(&header, &self.opts.subject_column, self.opts.combine, worklist)
            .with_context(|| format!("selecting columns in {}", file.path.display()))?;
        if selection.is_empty() {
            tracing::debug!("No requested fields in {}; skipping", file.path.display());
            return Ok(None);
        }
        let fields: Vec<String> = selection.fields().into_iter().map(str::to_string).collect();
        tracing::debug!("Included columns: {:?}", selection.columns.iter().map(|c| &c.name).collect::<Vec<_>>());

        let selected_names: Vec<String> = selection.columns.iter().map(|c| c.name.clone()).collect();
        let plan = self
            .opts
            .combine
            .is_combining()
            .then(|| CombinePlan::new(&selected_names, self.opts.combine));
        let columns = plan.as_ref().map_or_else(|| selected_names.clone(), CombinePlan::output_columns);

        let out_path = pheno_path(&self.opts.output_dir, &self.opts.output_name, &file.dataset_tag);
        let mut writer = PhenoWriter::new(&out_path, self.opts.family_id, self.opts.write_buffer_bytes);

        let pb = self.opts.progress.then(|| file_progress(file));
        let reader = ChunkReader::open(file, &selection, self.opts.chunk_size, self.opts.read_buffer_bytes, pb.as_ref())?;

        let mut chunks = 0u64;
        let mut excluded = 0u64;
        for chunk in reader {
            let chunk = chunk.with_context(|| format!("reading {}", file.path.display()))?;
            let mut chunk = match &plan {
                Some(plan) => plan.apply(chunk),
                None => chunk,
            };
            let before = chunk.len();
            chunk.rows.retain(|row| !exclusions.contains(&row.subject));
            excluded += (before - chunk.len()) as u64;

            writer.write_chunk(&chunk)?;
            chunks += 1;
            tracing::debug!("chunk {} of {}: {} rows written, {} excluded", chunks, file.path.display(), chunk.len(), before - chunk.len());
        }

        // header-only output for a matching file without data rows
        if !writer.header_written() {
            writer.write_chunk(&Chunk { columns: columns.clone(), rows: Vec::new() })?;
        }
        let rows_written = writer.finish()?;
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        tracing::info!("Wrote {} ({} rows, {} excluded)", out_path.display(), rows_written, excluded);

        Ok(Some(FileSummary {
            source: file.path.clone(),
            dataset_id: file.dataset_id,
            dataset_tag: file.dataset_tag.clone(),
            output: out_path,
            fields,
            columns,
            chunks,
            rows_written,
            rows_excluded: excluded,
        }))
    }
}
