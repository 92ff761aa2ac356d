use std::path::PathBuf;

use thiserror::Error;

use crate::{
    array_index::InvalidIndexError,
    storage::{StorageError, VariableId},
};

use super::{compression::CompressionCreateError, DataType};

/// Array errors.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// A malformed index expression.
    #[error(transparent)]
    InvalidIndex(#[from] InvalidIndexError),
    /// The file containing the array could not be opened.
    #[error("file {0} is unavailable: {1}")]
    IOUnavailable(PathBuf, #[source] StorageError),
    /// The variable is not present in the file.
    #[error("variable {0} not found in {1}")]
    VariableNotFound(VariableId, PathBuf),
    /// The compression is not supported.
    #[error(transparent)]
    UnsupportedCompression(#[from] CompressionCreateError),
    /// The shape of the data disagrees with the shape implied by the array or its compression.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    /// A storage error after the file was opened.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// Incompatible data type.
    #[error("got data type {0}, expected {1}")]
    IncompatibleDataType(DataType, DataType),
    /// Incompatible element type.
    #[error("the element type {1} is incompatible with data type {0}")]
    IncompatibleElementType(DataType, &'static str),
    /// The data contains an invalid value for the element type.
    #[error("invalid element value")]
    InvalidElementValue,
}
