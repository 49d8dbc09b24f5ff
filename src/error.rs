use std::io;

use thiserror::Error;

/// Errors reported while building, parsing or extracting cabinet sets.
#[derive(Debug, Error)]
pub enum CabError {
    /// The input does not start with the `MSCF` signature.
    #[error("not a cabinet file (invalid file signature)")]
    InvalidMagic,

    /// A volume cannot accept the presented payload chunk.  The set builder
    /// catches this once and retries the same chunk on a fresh volume.
    #[error(
        "volume cannot accept {requested} payload bytes \
         ({remaining} of {capacity} remaining)"
    )]
    CapacityExceeded { requested: u64, remaining: u64, capacity: u64 },

    /// A value does not fit the width of its on-disk field.
    #[error("value {value} does not fit in field {field}")]
    Overflow { field: &'static str, value: u64 },

    /// A declared offset or count does not match the observed layout.
    #[error(
        "field {field} does not match layout \
         (declared {declared}, observed {observed})"
    )]
    InvalidLayout { field: &'static str, declared: u64, observed: u64 },

    /// The underlying byte source or sink failed.
    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CabError>;
