use serde::{Deserialize, Serialize};

use crate::array::{ArrayError, MaskedArray};

use super::{as_index, instances, validate_uncompressed_axes, CompressionTraits, Placement};

/// The identifier for the indexed ragged array compression.
pub const IDENTIFIER: &str = "ragged_indexed";

/// An indexed ragged array.
///
/// The elements of each instance are listed explicitly as positions along the sample axis of the payload, in element order.
/// The element axis must immediately follow the instance axis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RaggedIndexed {
    instance_axis: usize,
    element_axis: usize,
    indices: Vec<Vec<u64>>,
}

impl RaggedIndexed {
    /// Create a new indexed ragged array compression with the sample positions of each instance.
    #[must_use]
    pub fn new(instance_axis: usize, element_axis: usize, indices: Vec<Vec<u64>>) -> Self {
        Self {
            instance_axis,
            element_axis,
            indices,
        }
    }

    /// Create a new indexed ragged array compression from the instance of each sample.
    ///
    /// This is the CF index variable.
    ///
    /// # Errors
    /// Returns [`ArrayError::ShapeMismatch`] if an instance is not less than `num_instances`.
    pub fn from_instance_index(
        instance_axis: usize,
        element_axis: usize,
        instance_index: &[u64],
        num_instances: u64,
    ) -> Result<Self, ArrayError> {
        let mut indices = vec![vec![]; usize::try_from(num_instances).unwrap_or_default()];
        for (sample, &instance) in instance_index.iter().enumerate() {
            indices
                .get_mut(usize::try_from(instance).unwrap_or(usize::MAX))
                .ok_or_else(|| {
                    ArrayError::ShapeMismatch(format!(
                        "instance {instance} of sample {sample} is out of bounds for {num_instances} instances"
                    ))
                })?
                .push(sample as u64);
        }
        Ok(Self::new(instance_axis, element_axis, indices))
    }

    /// The sample positions of each instance.
    #[must_use]
    pub fn indices(&self) -> &[Vec<u64>] {
        &self.indices
    }

    /// The element axis.
    #[must_use]
    pub const fn element_axis(&self) -> usize {
        self.element_axis
    }
}

impl CompressionTraits for RaggedIndexed {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn compression_type(&self) -> &'static str {
        "ragged indexed"
    }

    fn sample_axis(&self) -> usize {
        self.instance_axis
    }

    fn instance_axis(&self) -> Option<usize> {
        Some(self.instance_axis)
    }

    fn compressed_axes(
        &self,
        _dimensionality: usize,
        _payload_dimensionality: usize,
    ) -> Vec<usize> {
        vec![self.instance_axis, self.element_axis]
    }

    fn validate(&self, payload_shape: &[u64], shape: &[u64]) -> Result<(), ArrayError> {
        if self.element_axis != self.instance_axis + 1 {
            return Err(ArrayError::ShapeMismatch(format!(
                "element axis {} does not follow instance axis {}",
                self.element_axis, self.instance_axis
            )));
        }
        validate_uncompressed_axes(payload_shape, shape, self.instance_axis, 2)?;
        if shape[self.instance_axis] != self.indices.len() as u64 {
            return Err(ArrayError::ShapeMismatch(format!(
                "{} instances for an instance axis of size {}",
                self.indices.len(),
                shape[self.instance_axis]
            )));
        }
        let num_samples = payload_shape[self.instance_axis];
        let num_elements = shape[self.element_axis];
        for (instance, indices) in self.indices.iter().enumerate() {
            if indices.len() as u64 > num_elements {
                return Err(ArrayError::ShapeMismatch(format!(
                    "instance {instance} has {} elements, exceeding the element axis size {num_elements}",
                    indices.len()
                )));
            }
            if let Some(index) = indices.iter().find(|&&index| index >= num_samples) {
                return Err(ArrayError::ShapeMismatch(format!(
                    "sample {index} of instance {instance} is out of bounds for {num_samples} samples"
                )));
            }
        }
        Ok(())
    }

    fn decompress(
        &self,
        payload: &MaskedArray,
        shape: &[u64],
        instance: Option<u64>,
    ) -> Result<MaskedArray, ArrayError> {
        self.validate(payload.shape(), shape)?;
        let mut placement = Placement::new(payload, self.instance_axis, shape)?;
        for instance in instances(instance, self.indices.len())? {
            let indices = &self.indices[as_index(instance)];
            placement.set_destination(self.instance_axis, [instance])?;
            placement.set_destination(self.element_axis, 0..indices.len() as u64)?;
            placement.set_samples(indices.iter().copied());
            placement.place()?;
        }
        Ok(placement.finish())
    }
}
