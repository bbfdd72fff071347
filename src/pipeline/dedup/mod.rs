pub mod detector;
pub mod scorer;

pub use detector::*;
pub use scorer::*;

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum DedupError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
