use std::path::PathBuf;
use thiserror::Error;

/// Problems with the run configuration. These are detected before any input
/// file is opened and always abort the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no field identifiers were requested")]
    NoFields,
    #[error("field identifier list contains an empty entry")]
    EmptyField,
    #[error("output name must not be empty")]
    EmptyOutputName,
    #[error("chunk size must be a positive number of rows")]
    ZeroChunkSize,
    #[error("no input directory given (set --dir or PHENO_PATH)")]
    MissingInputDir,
    #[error("directory: {0} is not a valid directory path")]
    NotADirectory(PathBuf),
    #[error("{first} and {second} share dataset id {tag} and would write the same output file")]
    DuplicateDataset { tag: String, first: PathBuf, second: PathBuf },
    #[error("exclusion file {0} does not exist")]
    MissingExclusionFile(PathBuf),
}
