use serde::{Deserialize, Serialize};

use crate::array::{unravel_index, ArrayError, MaskedArray};

use super::{validate_uncompressed_axes, CompressionTraits, Placement};

/// The identifier for the gathered compression.
pub const IDENTIFIER: &str = "gathered";

/// Compression by gathering.
///
/// The sample axis of the payload stands in for the row-major flattening of one or more consecutive logical axes starting at the same axis.
/// `gather_indices[i]` is the flattened position of the `i`th sample.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Gathered {
    sample_axis: usize,
    gather_indices: Vec<u64>,
}

impl Gathered {
    /// Create a new gathered compression.
    #[must_use]
    pub fn new(sample_axis: usize, gather_indices: Vec<u64>) -> Self {
        Self {
            sample_axis,
            gather_indices,
        }
    }

    /// The flattened position of each sample.
    #[must_use]
    pub fn gather_indices(&self) -> &[u64] {
        &self.gather_indices
    }

    fn num_compressed(&self, dimensionality: usize, payload_dimensionality: usize) -> usize {
        (dimensionality + 1).saturating_sub(payload_dimensionality)
    }
}

impl CompressionTraits for Gathered {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn compression_type(&self) -> &'static str {
        "gathered"
    }

    fn sample_axis(&self) -> usize {
        self.sample_axis
    }

    fn instance_axis(&self) -> Option<usize> {
        None
    }

    fn compressed_axes(&self, dimensionality: usize, payload_dimensionality: usize) -> Vec<usize> {
        let num_compressed = self.num_compressed(dimensionality, payload_dimensionality);
        (self.sample_axis..self.sample_axis + num_compressed).collect()
    }

    fn validate(&self, payload_shape: &[u64], shape: &[u64]) -> Result<(), ArrayError> {
        let num_compressed = self.num_compressed(shape.len(), payload_shape.len());
        validate_uncompressed_axes(payload_shape, shape, self.sample_axis, num_compressed)?;
        if payload_shape[self.sample_axis] != self.gather_indices.len() as u64 {
            return Err(ArrayError::ShapeMismatch(format!(
                "{} gather indices for a sample axis of size {}",
                self.gather_indices.len(),
                payload_shape[self.sample_axis]
            )));
        }
        let num_positions: u64 = shape[self.sample_axis..self.sample_axis + num_compressed]
            .iter()
            .product();
        match self
            .gather_indices
            .iter()
            .find(|&&index| index >= num_positions)
        {
            Some(index) => Err(ArrayError::ShapeMismatch(format!(
                "gather index {index} is out of bounds for {num_positions} gathered positions"
            ))),
            None => Ok(()),
        }
    }

    fn decompress(
        &self,
        payload: &MaskedArray,
        shape: &[u64],
        _instance: Option<u64>,
    ) -> Result<MaskedArray, ArrayError> {
        self.validate(payload.shape(), shape)?;
        let compressed_axes = self.compressed_axes(shape.len(), payload.dimensionality());
        let compressed_shape: Vec<u64> = compressed_axes.iter().map(|&axis| shape[axis]).collect();

        let mut placement = Placement::new(payload, self.sample_axis, shape)?;
        for (sample, &index) in (0u64..).zip(&self.gather_indices) {
            placement.set_samples([sample]);
            let indices = unravel_index(index, &compressed_shape);
            for (&axis, position) in std::iter::zip(&compressed_axes, indices) {
                placement.set_destination(axis, [position])?;
            }
            placement.place()?;
        }
        Ok(placement.finish())
    }
}
