//! Persistence layer
//!
//! - `codec`: framed, checksummed, compressed artifact files
//! - `snapshot`: whole-graph save/load on top of the codec

pub mod codec;
pub mod snapshot;

pub use codec::{decode, encode, load, save, write_atomic, FORMAT_VERSION, MAGIC};
pub use snapshot::{fingerprint, load_graph, save_graph, GraphSnapshot};

use std::io;
use thiserror::Error;

/// Persistence errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Artifact failed its integrity checks
    #[error("Corrupt artifact: {0}")]
    Corrupt(String),

    /// Artifact is intact but not what the caller asked for
    #[error("Artifact mismatch: {0}")]
    Mismatch(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
