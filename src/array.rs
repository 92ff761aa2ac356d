//! Lazily evaluated arrays.
//!
//! Every array implements [`LazyArray`]: a fixed shape and data type, and extraction of a subspace of the array (as a dense [`MaskedArray`]) given an [`IndexExpr`].
//!
//! The array implementations are:
//!  - [`InMemoryArray`]: backed by a resident [`MaskedArray`],
//!  - [`FileArray`]: backed by one variable of a file, with lazy open/close of the file, and
//!  - [`CompressedArray`]: a compressed payload (itself any [`LazyArray`]) plus a [`CompressionDescriptor`](compression::CompressionDescriptor) describing how to place it into the logical (uncompressed) shape.

mod array_errors;
mod compressed_array;
pub mod compression;
pub mod data_type;
mod element;
mod file_array;
mod fill_value;
mod in_memory_array;
mod masked_array;
mod read_options;

use std::path::Path;

pub use self::{
    array_errors::ArrayError,
    compressed_array::CompressedArray,
    data_type::DataType,
    element::Element,
    file_array::FileArray,
    fill_value::FillValue,
    in_memory_array::InMemoryArray,
    masked_array::MaskedArray,
    read_options::{ReadOptions, ReadOptionsBuilder},
};

pub use crate::storage::VariableId;

use crate::array_index::IndexExpr;

/// An ND index to an element in an array.
pub type ArrayIndices = Vec<u64>;

/// The shape of an array.
pub type ArrayShape = Vec<u64>;

/// The capability set of every array-like object.
///
/// The shape and data type of an array never change after construction.
pub trait LazyArray: Send + Sync + core::fmt::Debug {
    /// Return the shape of the array.
    fn shape(&self) -> &[u64];

    /// Return the data type of the array elements.
    fn data_type(&self) -> &DataType;

    /// Return the dimensionality (rank) of the array.
    fn dimensionality(&self) -> usize {
        self.shape().len()
    }

    /// Return the number of elements of the array.
    ///
    /// Equal to the product of the components of its shape.
    fn num_elements(&self) -> u64 {
        self.shape().iter().product()
    }

    /// Read the subspace of the array defined by `indices` with non-default options.
    ///
    /// The returned array is independent of any buffer held by the array.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the index expression is invalid for this array or the data cannot be read.
    fn read_opt(&self, indices: &IndexExpr, options: &ReadOptions)
        -> Result<MaskedArray, ArrayError>;

    /// Read the subspace of the array defined by `indices`.
    ///
    /// # Errors
    /// See [`read_opt`](LazyArray::read_opt).
    fn read(&self, indices: &IndexExpr) -> Result<MaskedArray, ArrayError> {
        self.read_opt(indices, &ReadOptions::default())
    }

    /// The file containing the array data, or [`None`] if the data is not in a file.
    fn file(&self) -> Option<&Path> {
        None
    }

    /// Release any file held open by this array.
    ///
    /// Closing an array that is not open is a no-op.
    fn close(&self) {}
}

/// Unravel a linearised index to ND indices.
///
/// The most significant (slowest varying) axis is first.
#[must_use]
pub fn unravel_index(mut index: u64, shape: &[u64]) -> ArrayIndices {
    let mut indices = vec![0; shape.len()];
    for (indices_i, &dim) in std::iter::zip(indices.iter_mut().rev(), shape.iter().rev()) {
        *indices_i = index % dim;
        index /= dim;
    }
    indices
}

/// Ravel ND indices to a linearised index.
#[must_use]
pub fn ravel_indices(indices: &[u64], shape: &[u64]) -> u64 {
    let mut index: u64 = 0;
    let mut count = 1;
    for (i, s) in std::iter::zip(indices, shape).rev() {
        index += i * count;
        count *= s;
    }
    index
}

fn iter_u64_to_usize<'a, I: Iterator<Item = &'a u64>>(iter: I) -> Vec<usize> {
    iter.map(|v| usize::try_from(*v).unwrap_or(usize::MAX))
        .collect::<Vec<_>>()
}
