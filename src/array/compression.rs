//! Compression by gathering and the ragged array encodings of the CF conventions.
//!
//! A [`CompressionDescriptor`] describes how the samples of a compressed payload are placed into the logical (uncompressed) shape of an array:
//!  - [`Gathered`]: one payload axis (the sample axis) stands in for the row-major flattening of one or more logical axes,
//!  - [`RaggedContiguous`]: the elements of each instance occupy a contiguous span of the sample axis,
//!  - [`RaggedIndexed`]: the elements of each instance are listed explicitly, and
//!  - [`RaggedIndexedContiguous`]: each instance owns a contiguous span of profiles, and each profile owns a contiguous span of elements.
//!
//! For the ragged encodings, the sample axis of the payload is at the instance axis of the logical array.
//! The logical instance (and profile) axes are followed by the element axis, which is as long as the longest instance (or profile).
//! All other axes are the same in the payload and logical array.
//!
//! Decompression places the samples into a fully masked array of the logical shape.
//! Positions not covered by any sample stay masked.
//!
//! A descriptor is serialised as [`CompressionMetadata`] with the following names:
//!  - `gathered`,
//!  - `ragged_contiguous`,
//!  - `ragged_indexed`, and
//!  - `ragged_indexed_contiguous`.

mod gathered;
mod ragged_contiguous;
mod ragged_indexed;
mod ragged_indexed_contiguous;

use derive_more::From;
use thiserror::Error;

pub use self::{
    gathered::Gathered, ragged_contiguous::RaggedContiguous, ragged_indexed::RaggedIndexed,
    ragged_indexed_contiguous::RaggedIndexedContiguous,
};

use crate::metadata::{CompressionMetadata, ConfigurationInvalidError};

use super::{ArrayError, MaskedArray};

/// Traits common to all compression encodings.
pub trait CompressionTraits: Send + Sync + core::fmt::Debug {
    /// The name of the compression in [`CompressionMetadata`].
    fn identifier(&self) -> &'static str;

    /// A human readable description of the compression type.
    fn compression_type(&self) -> &'static str;

    /// The axis of the payload holding the samples.
    fn sample_axis(&self) -> usize;

    /// The instance axis of a ragged encoding, or [`None`] if the encoding has no instances.
    fn instance_axis(&self) -> Option<usize>;

    /// The logical axes represented by the sample axis, given the `dimensionality` of the logical array and the `payload_dimensionality`.
    fn compressed_axes(&self, dimensionality: usize, payload_dimensionality: usize) -> Vec<usize>;

    /// Validate the compression against the shape of the payload and the logical `shape`.
    ///
    /// # Errors
    /// Returns [`ArrayError::ShapeMismatch`] if the compression is inconsistent with either shape.
    fn validate(&self, payload_shape: &[u64], shape: &[u64]) -> Result<(), ArrayError>;

    /// Place the samples of `payload` into a fully masked array of the logical `shape`.
    ///
    /// If `instance` is set, only the samples of that instance are placed.
    ///
    /// # Errors
    /// Returns [`ArrayError::ShapeMismatch`] if the compression is inconsistent with `payload` or `shape`.
    fn decompress(
        &self,
        payload: &MaskedArray,
        shape: &[u64],
        instance: Option<u64>,
    ) -> Result<MaskedArray, ArrayError>;
}

/// A compression descriptor.
#[derive(Clone, Debug, PartialEq, Eq, From)]
pub enum CompressionDescriptor {
    /// Compression by gathering.
    Gathered(Gathered),
    /// A contiguous ragged array.
    RaggedContiguous(RaggedContiguous),
    /// An indexed ragged array.
    RaggedIndexed(RaggedIndexed),
    /// An indexed contiguous ragged array.
    RaggedIndexedContiguous(RaggedIndexedContiguous),
}

/// A compression creation error.
#[derive(Debug, Error)]
pub enum CompressionCreateError {
    /// An unsupported compression.
    #[error("compression {_0} is not supported")]
    Unsupported(String),
    /// An invalid compression configuration.
    #[error(transparent)]
    InvalidConfiguration(#[from] ConfigurationInvalidError),
}

impl CompressionDescriptor {
    /// Create a compression descriptor from metadata.
    ///
    /// # Errors
    /// Returns [`CompressionCreateError::Unsupported`] if the compression name is not recognised, or [`CompressionCreateError::InvalidConfiguration`] if its configuration is invalid.
    pub fn from_metadata(metadata: &CompressionMetadata) -> Result<Self, CompressionCreateError> {
        match metadata.name() {
            gathered::IDENTIFIER => Ok(Self::Gathered(metadata.to_configuration()?)),
            ragged_contiguous::IDENTIFIER => {
                Ok(Self::RaggedContiguous(metadata.to_configuration()?))
            }
            ragged_indexed::IDENTIFIER => Ok(Self::RaggedIndexed(metadata.to_configuration()?)),
            ragged_indexed_contiguous::IDENTIFIER => {
                Ok(Self::RaggedIndexedContiguous(metadata.to_configuration()?))
            }
            name => Err(CompressionCreateError::Unsupported(name.to_string())),
        }
    }

    /// Create the metadata of the compression descriptor.
    #[must_use]
    pub fn metadata(&self) -> CompressionMetadata {
        let configuration = match self {
            Self::Gathered(gathered) => serde_json::to_value(gathered),
            Self::RaggedContiguous(ragged) => serde_json::to_value(ragged),
            Self::RaggedIndexed(ragged) => serde_json::to_value(ragged),
            Self::RaggedIndexedContiguous(ragged) => serde_json::to_value(ragged),
        };
        let configuration = match configuration {
            Ok(serde_json::Value::Object(configuration)) => configuration,
            _ => serde_json::Map::default(),
        };
        CompressionMetadata::new_with_configuration(self.identifier(), configuration)
    }

    fn as_traits(&self) -> &dyn CompressionTraits {
        match self {
            Self::Gathered(gathered) => gathered,
            Self::RaggedContiguous(ragged) => ragged,
            Self::RaggedIndexed(ragged) => ragged,
            Self::RaggedIndexedContiguous(ragged) => ragged,
        }
    }
}

impl CompressionTraits for CompressionDescriptor {
    fn identifier(&self) -> &'static str {
        self.as_traits().identifier()
    }

    fn compression_type(&self) -> &'static str {
        self.as_traits().compression_type()
    }

    fn sample_axis(&self) -> usize {
        self.as_traits().sample_axis()
    }

    fn instance_axis(&self) -> Option<usize> {
        self.as_traits().instance_axis()
    }

    fn compressed_axes(&self, dimensionality: usize, payload_dimensionality: usize) -> Vec<usize> {
        self.as_traits()
            .compressed_axes(dimensionality, payload_dimensionality)
    }

    fn validate(&self, payload_shape: &[u64], shape: &[u64]) -> Result<(), ArrayError> {
        self.as_traits().validate(payload_shape, shape)
    }

    fn decompress(
        &self,
        payload: &MaskedArray,
        shape: &[u64],
        instance: Option<u64>,
    ) -> Result<MaskedArray, ArrayError> {
        self.as_traits().decompress(payload, shape, instance)
    }
}

/// Check that the axes of `shape` outside of the `num_compressed` axes from `first` match the payload axes outside of its sample axis (at `first`).
fn validate_uncompressed_axes(
    payload_shape: &[u64],
    shape: &[u64],
    first: usize,
    num_compressed: usize,
) -> Result<(), ArrayError> {
    let mismatch = || {
        ArrayError::ShapeMismatch(format!(
            "payload shape {payload_shape:?} is incompatible with shape {shape:?} compressed along {} axes from axis {first}",
            num_compressed
        ))
    };
    if num_compressed == 0
        || first + num_compressed > shape.len()
        || payload_shape.len() + num_compressed != shape.len() + 1
    {
        return Err(mismatch());
    }
    let leading = shape[..first] == payload_shape[..first];
    let trailing = shape[first + num_compressed..] == payload_shape[first + 1..];
    if leading && trailing {
        Ok(())
    } else {
        Err(mismatch())
    }
}

/// Convert an instance, profile or sample position to an index of a descriptor list.
fn as_index(position: u64) -> usize {
    usize::try_from(position).unwrap_or(usize::MAX)
}

/// The positions along the instance axis to decompress: `instance` alone or all `num_instances`.
fn instances(instance: Option<u64>, num_instances: usize) -> Result<Vec<u64>, ArrayError> {
    match instance {
        Some(instance) if instance < num_instances as u64 => Ok(vec![instance]),
        Some(instance) => Err(ArrayError::ShapeMismatch(format!(
            "instance {instance} is out of bounds for {num_instances} instances"
        ))),
        None => Ok((0..num_instances as u64).collect()),
    }
}

/// A decompressed buffer under construction.
///
/// Samples are copied from the payload into an initially fully masked buffer.
/// The per-axis position lists are allocated once and reused by every placement, so each placement costs the size of its block.
struct Placement<'a> {
    payload: &'a MaskedArray,
    sample_axis: usize,
    buffer: MaskedArray,
    source: Vec<Vec<u64>>,
    destination: Vec<Vec<u64>>,
}

impl<'a> Placement<'a> {
    /// Start decompressing the samples along `sample_axis` of `payload` into an array of `shape`.
    fn new(
        payload: &'a MaskedArray,
        sample_axis: usize,
        shape: &[u64],
    ) -> Result<Self, ArrayError> {
        if sample_axis >= payload.dimensionality() {
            return Err(ArrayError::ShapeMismatch(format!(
                "sample axis {sample_axis} is out of bounds for a payload of shape {:?}",
                payload.shape()
            )));
        }
        let source = payload
            .shape()
            .iter()
            .enumerate()
            .map(|(axis, &size)| {
                if axis == sample_axis {
                    Vec::new()
                } else {
                    (0..size).collect()
                }
            })
            .collect();
        Ok(Self {
            payload,
            sample_axis,
            buffer: MaskedArray::new_masked(payload.data_type().clone(), shape.to_vec()),
            source,
            destination: MaskedArray::full_positions(shape),
        })
    }

    /// Set the samples to copy.
    fn set_samples(&mut self, samples: impl IntoIterator<Item = u64>) {
        let source = &mut self.source[self.sample_axis];
        source.clear();
        source.extend(samples);
    }

    /// Set the destination positions along `axis` of the buffer.
    ///
    /// Axes that are never set are copied in full.
    fn set_destination(
        &mut self,
        axis: usize,
        positions: impl IntoIterator<Item = u64>,
    ) -> Result<(), ArrayError> {
        let Some(destination) = self.destination.get_mut(axis) else {
            return Err(ArrayError::ShapeMismatch(format!(
                "axis {axis} is out of bounds for shape {:?}",
                self.buffer.shape()
            )));
        };
        destination.clear();
        destination.extend(positions);
        Ok(())
    }

    /// Copy the samples to the destination.
    fn place(&mut self) -> Result<(), ArrayError> {
        if self.source[self.sample_axis].is_empty() {
            return Ok(());
        }
        self.buffer
            .assign_selection(&self.destination, self.payload, &self.source)
    }

    fn finish(self) -> MaskedArray {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_descriptor_metadata() {
        let descriptor: CompressionDescriptor =
            RaggedContiguous::new(0, 1, vec![0..2, 2..5]).into();
        let metadata = descriptor.metadata();
        assert_eq!(metadata.name(), "ragged_contiguous");
        assert_eq!(
            CompressionDescriptor::from_metadata(&metadata).unwrap(),
            descriptor
        );
        assert_eq!(descriptor.compression_type(), "ragged contiguous");
        assert_eq!(descriptor.compressed_axes(2, 1), vec![0, 1]);
    }

    #[test]
    fn compression_descriptor_unsupported() {
        let metadata =
            CompressionMetadata::try_from(r#"{"name":"subsampled","configuration":{}}"#).unwrap();
        assert!(matches!(
            CompressionDescriptor::from_metadata(&metadata),
            Err(CompressionCreateError::Unsupported(name)) if name == "subsampled"
        ));

        let metadata =
            CompressionMetadata::try_from(r#"{"name":"gathered","configuration":{"axis":0}}"#)
                .unwrap();
        assert!(matches!(
            CompressionDescriptor::from_metadata(&metadata),
            Err(CompressionCreateError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn placement_reuse() {
        // sample x level
        let payload = MaskedArray::from_elements(vec![4, 2], &[1u8, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let mut placement = Placement::new(&payload, 0, &[2, 3, 2]).unwrap();
        placement.set_destination(0, [1]).unwrap();
        placement.set_destination(1, 0..2).unwrap();
        placement.set_samples(1..3);
        placement.place().unwrap();
        placement.set_destination(0, [0]).unwrap();
        placement.set_destination(1, [2]).unwrap();
        placement.set_samples([3]);
        placement.place().unwrap();
        placement.set_samples(std::iter::empty());
        placement.place().unwrap();
        assert!(placement.set_destination(3, [0]).is_err());
        assert_eq!(
            placement.finish().elements::<u8>().unwrap(),
            vec![
                None,
                None,
                None,
                None,
                Some(7),
                Some(8),
                Some(3),
                Some(4),
                Some(5),
                Some(6),
                None,
                None
            ]
        );
        assert!(Placement::new(&payload, 2, &[2, 3, 2]).is_err());
    }

    #[test]
    fn validate_uncompressed() {
        assert!(validate_uncompressed_axes(&[4, 7, 2], &[4, 3, 5, 2], 1, 2).is_ok());
        assert!(validate_uncompressed_axes(&[4, 7, 3], &[4, 3, 5, 2], 1, 2).is_err());
        assert!(validate_uncompressed_axes(&[5, 7, 2], &[4, 3, 5, 2], 1, 2).is_err());
        assert!(validate_uncompressed_axes(&[7, 2], &[4, 3, 5, 2], 1, 2).is_err());
        assert!(validate_uncompressed_axes(&[7], &[3, 5], 1, 2).is_err());
    }
}
