//! Storage of array data in files.
//!
//! A [`Dataset`] is an open file holding named variables.
//! It is the only I/O boundary of this crate: open a path, then read a variable by name or numeric id.
//!
//! Open datasets are shared through a [`FileRegistry`], keyed by absolute path.
//! Any number of arrays can alias one open dataset, and the file is closed once the last of them releases it.
//!
//! The bundled file format is the `NumPy` `.npz` format ([`NpzDataset`]).

mod file_registry;
mod npz;

use std::path::Path;

use derive_more::Display;
use thiserror::Error;

use crate::array::{DataType, MaskedArray};

pub use self::{
    file_registry::{global_file_registry, DatasetHandle, DatasetOpener, FileRegistry},
    npz::NpzDataset,
};

/// The identifier of a variable in a [`Dataset`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum VariableId {
    /// A variable name.
    #[display("{_0}")]
    Name(String),
    /// A numeric id, the position of the variable in the dataset.
    #[display("#{_0}")]
    Id(usize),
}

impl From<&str> for VariableId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for VariableId {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for VariableId {
    fn from(id: usize) -> Self {
        Self::Id(id)
    }
}

/// Traits for an open, read-only file holding named variables.
pub trait Dataset: Send + Sync + core::fmt::Debug {
    /// The path the dataset was opened from.
    fn path(&self) -> &Path;

    /// The names of the variables in the dataset, ordered by numeric id.
    fn variable_names(&self) -> Vec<String>;

    /// Read all of a variable as `data_type`.
    ///
    /// Text variables ([`DataType::Char`] or [`DataType::FixedString`]) are returned as [`DataType::Char`] with their raw (character axis inclusive) shape.
    ///
    /// Returns [`None`] if the variable does not exist.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the variable exists but could not be read as `data_type`.
    fn read_variable(
        &self,
        variable: &VariableId,
        data_type: &DataType,
    ) -> Result<Option<MaskedArray>, StorageError>;
}

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An error reading an `.npz` file.
    #[error(transparent)]
    ReadNpz(#[from] ndarray_npy::ReadNpzError),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_id() {
        assert_eq!(VariableId::from("lat"), VariableId::Name("lat".to_string()));
        assert_eq!(VariableId::from(2), VariableId::Id(2));
        assert_eq!(VariableId::from("lat").to_string(), "lat");
        assert_eq!(VariableId::Id(2).to_string(), "#2");
    }
}
