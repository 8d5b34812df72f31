//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum HrlError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// A classifier could not be fitted on the given data.
    #[error("Failed to fit classifier: {0}")]
    ClassifierFit(String),

    /// The parent option already has its maximum number of children.
    #[error("Option {name} already has {max} children")]
    TooManyChildren {
        /// Name of the parent option.
        name: String,
        /// Maximum number of children of the parent.
        max: usize,
    },

    /// No option with the given index exists.
    #[error("Unknown option index: {0}")]
    UnknownOption(usize),

    /// The operation needs a model-based solver.
    #[error("Option {0} does not use a model-based solver")]
    NotModelBased(String),
}
