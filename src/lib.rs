mod config;
mod error;
mod paths;
mod progress;
mod util;

mod field;
mod exclusion;
mod table;
mod combine;
mod output;
mod pipeline;

pub use crate::config::{CombineMode, ExtractOptions, FamilyId, PriorityKey};
pub use crate::error::ConfigError;
pub use crate::pipeline::{ExtractionReport, FileSummary, PhenoExtract};

// Field parsing and header matching, for callers that plan their own runs.
pub use crate::field::{base_field_id, match_column, select_columns, split_field_id, ColumnSelection, SelectedColumn, Worklist};

// File discovery and the pluggable priority comparator.
pub use crate::paths::{check_distinct_tags, dataset_id_from_name, discover_input_files, order_files, DatasetIdDesc, FilePriority, InputFile, SizeAsc};

pub use crate::exclusion::ExclusionSet;

// Chunked table access and the per-chunk transforms.
pub use crate::table::{read_header, Chunk, ChunkReader, Row};
pub use crate::combine::{is_missing, CombinePlan};
pub use crate::output::{pheno_path, PhenoWriter, MISSING};

pub use crate::progress::make_progress_bar_labeled;
pub use crate::util::{init_tracing_once, load_dotenv};
