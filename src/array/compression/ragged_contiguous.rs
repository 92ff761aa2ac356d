use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::array::{ArrayError, MaskedArray};

use super::{as_index, instances, validate_uncompressed_axes, CompressionTraits, Placement};

/// The identifier for the contiguous ragged array compression.
pub const IDENTIFIER: &str = "ragged_contiguous";

/// A contiguous ragged array.
///
/// The elements of each instance occupy a contiguous span of the sample axis of the payload.
/// The element axis must immediately follow the instance axis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RaggedContiguous {
    instance_axis: usize,
    element_axis: usize,
    spans: Vec<Range<u64>>,
}

impl RaggedContiguous {
    /// Create a new contiguous ragged array compression with the span of the sample axis of each instance.
    #[must_use]
    pub fn new(instance_axis: usize, element_axis: usize, spans: Vec<Range<u64>>) -> Self {
        Self {
            instance_axis,
            element_axis,
            spans,
        }
    }

    /// Create a new contiguous ragged array compression from the number of elements of each instance.
    ///
    /// This is the CF count variable.
    #[must_use]
    pub fn from_counts(instance_axis: usize, element_axis: usize, counts: &[u64]) -> Self {
        let mut start = 0;
        let spans = counts
            .iter()
            .map(|count| {
                let span = start..start + count;
                start = span.end;
                span
            })
            .collect();
        Self::new(instance_axis, element_axis, spans)
    }

    /// The span of the sample axis of each instance.
    #[must_use]
    pub fn spans(&self) -> &[Range<u64>] {
        &self.spans
    }

    /// The element axis.
    #[must_use]
    pub const fn element_axis(&self) -> usize {
        self.element_axis
    }
}

impl CompressionTraits for RaggedContiguous {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn compression_type(&self) -> &'static str {
        "ragged contiguous"
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
        if shape[self.instance_axis] != self.spans.len() as u64 {
            return Err(ArrayError::ShapeMismatch(format!(
                "{} instance spans for an instance axis of size {}",
                self.spans.len(),
                shape[self.instance_axis]
            )));
        }
        let num_samples = payload_shape[self.instance_axis];
        let num_elements = shape[self.element_axis];
        for span in &self.spans {
            if span.start > span.end || span.end > num_samples {
                return Err(ArrayError::ShapeMismatch(format!(
                    "instance span {span:?} is out of bounds for {num_samples} samples"
                )));
            }
            if span.end - span.start > num_elements {
                return Err(ArrayError::ShapeMismatch(format!(
                    "instance span {span:?} exceeds the element axis size {num_elements}"
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
        for instance in instances(instance, self.spans.len())? {
            let span = self.spans[as_index(instance)].clone();
            placement.set_destination(self.instance_axis, [instance])?;
            placement.set_destination(self.element_axis, 0..span.end - span.start)?;
            placement.set_samples(span);
            placement.place()?;
        }
        Ok(placement.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_contiguous_decompress() {
        let payload = MaskedArray::from_elements(vec![5], &[10i32, 20, 30, 40, 50]).unwrap();
        let ragged = RaggedContiguous::new(0, 1, vec![0..2, 2..5]);
        let array = ragged.decompress(&payload, &[2, 3], None).unwrap();
        assert_eq!(
            array.elements::<i32>().unwrap(),
            vec![Some(10), Some(20), None, Some(30), Some(40), Some(50)]
        );
        assert_eq!(RaggedContiguous::from_counts(0, 1, &[2, 3]), ragged);
    }

    #[test]
    fn ragged_contiguous_decompress_instance() {
        let payload = MaskedArray::from_elements(vec![5], &[10i32, 20, 30, 40, 50]).unwrap();
        let ragged = RaggedContiguous::from_counts(0, 1, &[2, 3]);
        let array = ragged.decompress(&payload, &[2, 3], Some(1)).unwrap();
        assert_eq!(
            array.elements::<i32>().unwrap(),
            vec![None, None, None, Some(30), Some(40), Some(50)]
        );
        assert!(ragged.decompress(&payload, &[2, 3], Some(2)).is_err());
    }

    #[test]
    fn ragged_contiguous_decompress_trailing_axis() {
        // sample x level
        let payload = MaskedArray::from_elements(vec![3, 2], &[1u8, 2, 3, 4, 5, 6]).unwrap();
        let ragged = RaggedContiguous::from_counts(0, 1, &[1, 0, 2]);
        let array = ragged.decompress(&payload, &[3, 2, 2], None).unwrap();
        assert_eq!(
            array.elements::<u8>().unwrap(),
            vec![
                Some(1),
                Some(2),
                None,
                None,
                None,
                None,
                None,
                None,
                Some(3),
                Some(4),
                Some(5),
                Some(6)
            ]
        );
    }

    #[test]
    fn ragged_contiguous_decompress_many_instances() {
        let counts: Vec<u64> = (0..5000).map(|i| 1 + i % 4).collect();
        let num_samples: u64 = counts.iter().sum();
        let elements: Vec<u32> = (0..num_samples).map(|i| i as u32).collect();
        let payload = MaskedArray::from_elements(vec![num_samples], &elements).unwrap();
        let ragged = RaggedContiguous::from_counts(0, 1, &counts);
        let array = ragged.decompress(&payload, &[5000, 4], None).unwrap();

        let mut sample = 0;
        let mut expected = Vec::new();
        for count in counts {
            for element in 0..4 {
                if element < count {
                    expected.push(Some(sample));
                    sample += 1;
                } else {
                    expected.push(None);
                }
            }
        }
        assert_eq!(array.elements::<u32>().unwrap(), expected);
        assert_eq!(array.count_masked(), 5000 * 4 - elements.len());
    }

    #[test]
    fn ragged_contiguous_validate() {
        let ragged = RaggedContiguous::from_counts(0, 1, &[2, 3]);
        assert!(ragged.validate(&[5], &[2, 3]).is_ok());
        assert!(ragged.validate(&[4], &[2, 3]).is_err());
        assert!(ragged.validate(&[5], &[2, 2]).is_err());
        assert!(ragged.validate(&[5], &[3, 3]).is_err());
        assert!(RaggedContiguous::from_counts(0, 2, &[2, 3])
            .validate(&[5], &[2, 3])
            .is_err());
    }
}
