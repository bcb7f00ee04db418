//! Error types for the engine.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Engine error type.
///
/// Only negotiation and the final write to the output stream can fail. Malformed input,
/// out-of-bounds cell writes and image encode failures are dropped and logged instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Writing to (or reading from) the terminal failed.
    #[error("terminal I/O error: {0}")]
    Io(#[from] io::Error),

    /// The terminal did not answer the primary device attributes query in time.
    #[error("capability negotiation timed out after {0:?}")]
    NegotiationTimeout(Duration),

    /// The input source reached end-of-stream before negotiation finished.
    #[error("input closed during capability negotiation")]
    InputClosed,

    /// The file logging subscriber could not be installed.
    #[error("failed to install logging: {0}")]
    Logging(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
