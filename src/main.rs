use anyhow::Result;
use clap::{Parser, ValueEnum};
use pheno_extract::{init_tracing_once, load_dotenv, CombineMode, FamilyId, PhenoExtract, PriorityKey};
use std::path::PathBuf;
use std::process::ExitCode;

/// Extract phenotypes from a directory of ukb<datasetID>.csv files into
/// PLINK-friendly <name>/<name><datasetID>.pheno files.
///
/// The input directory and exclusion file default to PHENO_PATH and
/// EXCLUSION_FILE, which may also be set in a .env file.
#[derive(Parser, Debug)]
#[command(name = "pheno-extract", version, about, long_about = None)]
struct Cli {
    /// Field ids to extract. Full column ids ("50-0.0 50-1.0") keep instances
    /// separate; base ids ("50 31") require --combine.
    #[arg(required = true, value_name = "FIELDS")]
    fields: Vec<String>,

    /// Output name, e.g. "foo" creates foo/foo<datasetID>.pheno.
    #[arg(short = 'n', long)]
    name: String,

    /// Combine columns sharing a field id. Bare -c means "last" (most recent non-empty value).
    #[arg(short = 'c', long, value_enum, num_args = 0..=1, default_value = "none", default_missing_value = "last")]
    combine: CombineArg,

    /// Rows read per chunk.
    #[arg(short = 'r', long, default_value_t = 10_000)]
    rows: usize,

    /// Directory holding ukb*.csv files (default: $PHENO_PATH).
    #[arg(short = 'd', long)]
    dir: Option<PathBuf>,

    /// Directory in which the output folder is created.
    #[arg(short = 't', long, default_value = ".")]
    target: PathBuf,

    /// CSV whose first column lists subject ids to exclude (default: $EXCLUSION_FILE).
    #[arg(short = 'e', long)]
    exclude: Option<PathBuf>,

    /// Which files are searched first.
    #[arg(long, value_enum, default_value = "dataset-id")]
    priority: PriorityArg,

    /// Contents of the FID column.
    #[arg(long, value_enum, default_value = "subject")]
    fid: FidArg,

    /// Name of the subject id column.
    #[arg(long, default_value = "eid")]
    subject_column: String,

    /// Also write a JSON run report to this path.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Show a progress bar per file.
    #[arg(long)]
    progress: bool,

    /// Print intermediate outputs for debugging.
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CombineArg {
    None,
    Last,
    First,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PriorityArg {
    DatasetId,
    Size,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FidArg {
    Subject,
    Zero,
}

impl From<CombineArg> for CombineMode {
    fn from(a: CombineArg) -> Self {
        match a {
            CombineArg::None => CombineMode::None,
            CombineArg::Last => CombineMode::Last,
            CombineArg::First => CombineMode::First,
        }
    }
}

impl From<PriorityArg> for PriorityKey {
    fn from(a: PriorityArg) -> Self {
        match a {
            PriorityArg::DatasetId => PriorityKey::DatasetId,
            PriorityArg::Size => PriorityKey::Size,
        }
    }
}

impl From<FidArg> for FamilyId {
    fn from(a: FidArg) -> Self {
        match a {
            FidArg::Subject => FamilyId::SubjectId,
            FidArg::Zero => FamilyId::Zero,
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let mut etl = PhenoExtract::new()
        .output_dir(&cli.target)
        .output_name(&cli.name)
        .combine(cli.combine.into())
        .chunk_size(cli.rows)
        .priority(cli.priority.into())
        .family_id(cli.fid.into())
        .subject_column(&cli.subject_column)
        .progress(cli.progress);
    if let Some(dir) = &cli.dir {
        etl = etl.input_dir(dir);
    }
    if let Some(ex) = &cli.exclude {
        etl = etl.exclude_file(ex);
    }
    let etl = etl.env_fallbacks();

    tracing::info!("Extracting phenotypes...");
    tracing::debug!("Options: {:?}", etl.options());
    let report = etl.extract(&cli.fields)?;

    if let Some(path) = &cli.report {
        report.write_json(path)?;
        tracing::info!("Wrote run report {}", path.display());
    }
    for f in &report.files {
        println!("Wrote {} ({} rows)", f.output.display(), f.rows_written);
    }
    if !report.completed {
        eprintln!(
            "The following IDs were not found in the ukb csv files: {}",
            report.unmatched.iter().cloned().collect::<Vec<_>>().join(" ")
        );
    }
    Ok(report.completed)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    // before tracing init so RUST_LOG from .env applies
    let dotenv_found = load_dotenv();
    init_tracing_once(cli.verbose);
    if dotenv_found {
        tracing::debug!("loaded .env");
    }

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
