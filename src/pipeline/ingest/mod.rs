pub mod extract;
pub mod mappers;
pub mod orchestrator;
pub mod writer;

pub use mappers::*;
pub use orchestrator::*;
pub use writer::*;

use std::path::PathBuf;

use thiserror::Error;

use crate::db::DatabaseError;

/// Ingestion channel tag stamped on every record this pipeline produces.
pub const SOURCE_FORMAT_EPIC_EHI: &str = "epic_ehi";

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export directory not found: {0}")]
    ExportDirMissing(PathBuf),

    #[error("Record is missing required field: {0}")]
    Validation(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
