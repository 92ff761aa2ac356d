use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::array::{ArrayError, MaskedArray};

use super::{as_index, instances, validate_uncompressed_axes, CompressionTraits, Placement};

/// The identifier for the indexed contiguous ragged array compression.
pub const IDENTIFIER: &str = "ragged_indexed_contiguous";

/// An indexed contiguous ragged array.
///
/// Each instance owns a contiguous span of profiles, and each profile owns a contiguous span of the sample axis of the payload.
/// The profile and element axes must immediately follow the instance axis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RaggedIndexedContiguous {
    instance_axis: usize,
    profile_axis: usize,
    element_axis: usize,
    profile_spans: Vec<Range<u64>>,
    element_spans: Vec<Range<u64>>,
}

impl RaggedIndexedContiguous {
    /// Create a new indexed contiguous ragged array compression.
    ///
    /// `profile_spans` are the profiles of each instance, and `element_spans` are the samples of each profile.
    #[must_use]
    pub fn new(
        instance_axis: usize,
        profile_axis: usize,
        element_axis: usize,
        profile_spans: Vec<Range<u64>>,
        element_spans: Vec<Range<u64>>,
    ) -> Self {
        Self {
            instance_axis,
            profile_axis,
            element_axis,
            profile_spans,
            element_spans,
        }
    }

    /// Create a new indexed contiguous ragged array compression from the number of elements of each profile (the CF count variable) and the instance of each profile (the CF index variable).
    ///
    /// # Errors
    /// Returns [`ArrayError::ShapeMismatch`] if
    ///  - `counts` and `profile_index` have different lengths,
    ///  - an instance is not less than `num_instances`, or
    ///  - the profiles of an instance are not contiguous.
    pub fn from_counts_and_index(
        instance_axis: usize,
        counts: &[u64],
        profile_index: &[u64],
        num_instances: u64,
    ) -> Result<Self, ArrayError> {
        if counts.len() != profile_index.len() {
            return Err(ArrayError::ShapeMismatch(format!(
                "{} profile counts and {} profile indices",
                counts.len(),
                profile_index.len()
            )));
        }
        let mut start = 0;
        let element_spans = counts
            .iter()
            .map(|count| {
                let span = start..start + count;
                start = span.end;
                span
            })
            .collect();

        let mut profile_spans: Vec<Option<Range<u64>>> =
            vec![None; usize::try_from(num_instances).unwrap_or_default()];
        for (profile, &instance) in (0u64..).zip(profile_index) {
            let span = profile_spans
                .get_mut(usize::try_from(instance).unwrap_or(usize::MAX))
                .ok_or_else(|| {
                    ArrayError::ShapeMismatch(format!(
                        "instance {instance} of profile {profile} is out of bounds for {num_instances} instances"
                    ))
                })?;
            if let Some(span) = span {
                if span.end != profile {
                    return Err(ArrayError::ShapeMismatch(format!(
                        "the profiles of instance {instance} are not contiguous"
                    )));
                }
                span.end += 1;
            } else {
                *span = Some(profile..profile + 1);
            }
        }
        let profile_spans = profile_spans
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();

        Ok(Self::new(
            instance_axis,
            instance_axis + 1,
            instance_axis + 2,
            profile_spans,
            element_spans,
        ))
    }

    /// The span of profiles of each instance.
    #[must_use]
    pub fn profile_spans(&self) -> &[Range<u64>] {
        &self.profile_spans
    }

    /// The span of the sample axis of each profile.
    #[must_use]
    pub fn element_spans(&self) -> &[Range<u64>] {
        &self.element_spans
    }

    /// The profile axis.
    #[must_use]
    pub const fn profile_axis(&self) -> usize {
        self.profile_axis
    }

    /// The element axis.
    #[must_use]
    pub const fn element_axis(&self) -> usize {
        self.element_axis
    }
}

impl CompressionTraits for RaggedIndexedContiguous {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn compression_type(&self) -> &'static str {
        "ragged indexed contiguous"
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
        vec![self.instance_axis, self.profile_axis, self.element_axis]
    }

    fn validate(&self, payload_shape: &[u64], shape: &[u64]) -> Result<(), ArrayError> {
        if self.profile_axis != self.instance_axis + 1
            || self.element_axis != self.instance_axis + 2
        {
            return Err(ArrayError::ShapeMismatch(format!(
                "profile axis {} and element axis {} do not follow instance axis {}",
                self.profile_axis, self.element_axis, self.instance_axis
            )));
        }
        validate_uncompressed_axes(payload_shape, shape, self.instance_axis, 3)?;
        if shape[self.instance_axis] != self.profile_spans.len() as u64 {
            return Err(ArrayError::ShapeMismatch(format!(
                "{} instance profile spans for an instance axis of size {}",
                self.profile_spans.len(),
                shape[self.instance_axis]
            )));
        }
        let num_profiles = self.element_spans.len() as u64;
        let profile_size = shape[self.profile_axis];
        for span in &self.profile_spans {
            if span.start > span.end || span.end > num_profiles {
                return Err(ArrayError::ShapeMismatch(format!(
                    "profile span {span:?} is out of bounds for {num_profiles} profiles"
                )));
            }
            if span.end - span.start > profile_size {
                return Err(ArrayError::ShapeMismatch(format!(
                    "profile span {span:?} exceeds the profile axis size {profile_size}"
                )));
            }
        }
        let num_samples = payload_shape[self.instance_axis];
        let element_size = shape[self.element_axis];
        for span in &self.element_spans {
            if span.start > span.end || span.end > num_samples {
                return Err(ArrayError::ShapeMismatch(format!(
                    "element span {span:?} is out of bounds for {num_samples} samples"
                )));
            }
            if span.end - span.start > element_size {
                return Err(ArrayError::ShapeMismatch(format!(
                    "element span {span:?} exceeds the element axis size {element_size}"
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
        for instance in instances(instance, self.profile_spans.len())? {
            let profiles = self.profile_spans[as_index(instance)].clone();
            placement.set_destination(self.instance_axis, [instance])?;
            for (offset, profile) in (0u64..).zip(profiles) {
                let span = self.element_spans[as_index(profile)].clone();
                placement.set_destination(self.profile_axis, [offset])?;
                placement.set_destination(self.element_axis, 0..span.end - span.start)?;
                placement.set_samples(span);
                placement.place()?;
            }
        }
        Ok(placement.finish())
    }
}
