use std::{path::Path, sync::Arc};

use crate::array_index::{extract, normalise, CanonicalIndex, IndexExpr};

use super::{
    compression::{CompressionDescriptor, CompressionTraits},
    ArrayError, ArrayShape, DataType, LazyArray, MaskedArray, ReadOptions,
};

/// An array stored as a compressed payload.
///
/// The payload is any [`LazyArray`], and a [`CompressionDescriptor`] describes how to place it into the logical (uncompressed) shape.
/// Reads decompress the payload and then extract the requested subspace, so the uncompressed array is never held beyond a read.
///
/// Clones share the payload.
#[derive(Clone, Debug)]
pub struct CompressedArray {
    array: Arc<dyn LazyArray>,
    shape: ArrayShape,
    compression: Arc<CompressionDescriptor>,
}

impl CompressedArray {
    /// Create a new compressed array from a compressed payload `array`, the logical `shape` and the `compression`.
    ///
    /// # Errors
    /// Returns [`ArrayError::ShapeMismatch`] if the compression is inconsistent with the shape of the payload or the logical shape.
    pub fn new(
        array: Arc<dyn LazyArray>,
        shape: ArrayShape,
        compression: CompressionDescriptor,
    ) -> Result<Self, ArrayError> {
        compression.validate(array.shape(), &shape)?;
        Ok(Self {
            array,
            shape,
            compression: Arc::new(compression),
        })
    }

    /// The compressed payload.
    #[must_use]
    pub fn array(&self) -> &Arc<dyn LazyArray> {
        &self.array
    }

    /// The compression descriptor.
    #[must_use]
    pub fn compression(&self) -> &CompressionDescriptor {
        &self.compression
    }

    /// A description of the compression type, e.g. `"ragged contiguous"`.
    #[must_use]
    pub fn compression_type(&self) -> &'static str {
        self.compression.compression_type()
    }

    /// The logical axes represented by the sample axis of the payload.
    #[must_use]
    pub fn compressed_axes(&self) -> Vec<usize> {
        self.compression
            .compressed_axes(self.shape.len(), self.array.dimensionality())
    }

    /// The axis of the payload holding the samples.
    #[must_use]
    pub fn sample_axis(&self) -> usize {
        self.compression.sample_axis()
    }

    /// Read the entire compressed payload.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the payload cannot be read.
    pub fn compressed_array(&self) -> Result<MaskedArray, ArrayError> {
        self.array.read(&IndexExpr::All)
    }

    /// Returns true if the payload is stored in a file.
    #[must_use]
    pub fn on_disk(&self) -> bool {
        self.array.file().is_some()
    }

    /// Returns true if no clone of this array shares its payload.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.array) == 1
    }
}

impl LazyArray for CompressedArray {
    fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The data type of the payload.
    fn data_type(&self) -> &DataType {
        self.array.data_type()
    }

    fn read_opt(
        &self,
        indices: &IndexExpr,
        options: &ReadOptions,
    ) -> Result<MaskedArray, ArrayError> {
        let index = normalise(&self.shape, indices)?;
        let instance = if options.single_instance_decompression() {
            self.compression
                .instance_axis()
                .and_then(|axis| index.single_position(axis))
        } else {
            None
        };

        let payload = self.array.read_opt(&IndexExpr::All, options)?;
        tracing::trace!(
            "decompress {} array of shape {:?} to {:?}, instance {:?}",
            self.compression_type(),
            payload.shape(),
            self.shape,
            instance
        );
        let array = self
            .compression
            .decompress(&payload, &self.shape, instance)?;
        if index == CanonicalIndex::All {
            Ok(array)
        } else {
            Ok(extract(&array, &index, false)?.into_owned())
        }
    }

    fn file(&self) -> Option<&Path> {
        self.array.file()
    }

    /// Close the payload, unless it is shared with another clone.
    fn close(&self) {
        if self.is_unique() {
            self.array.close();
        }
    }
}
