//! Domain error taxonomy.
//!
//! These errors describe failures the pipeline isolates at a dataset, pair,
//! or upload boundary. The orchestrator logs them and moves on; only
//! configuration errors abort a run.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("input file '{0}' not found")]
    MissingInput(String),

    #[error("column '{column}' not found (available: {available})")]
    UnknownColumn { column: String, available: String },

    #[error("uploading '{file}' to table '{table}' failed: {source}")]
    UploadFailure {
        file: String,
        table: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("no table name mapping for '{0}'")]
    UnmappedArtifact(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EtlError>;
