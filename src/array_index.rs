//! Index expressions and subspace extraction.
//!
//! An [`IndexExpr`] describes a subspace of an array. It is either the [all-axes wildcard](IndexExpr::All) or one [`AxisExpr`] per axis, where each entry is a slice or a sequence of integer positions.
//!
//! [`normalise`] resolves an index expression against an array shape into a [`CanonicalIndex`], and [`extract`] applies a canonical index to a [`MaskedArray`].
//!
//! ## Independent per-axis selection
//! Position sequences select *independently* along each axis (like Fortran vector subscripts), rather than being broadcast together.
//! Selecting positions `[1, 0]` along axis 0 and `[2, 0]` along axis 1 of
//! ```text
//! [[1, 2, 3],
//!  [4, 5, 6]]
//! ```
//! yields the 2x2 block `[[6, 4], [3, 1]]`, not the diagonal `[6, 1]`.
//!
//! A bare scalar entry (which would drop an axis) is not supported, use a one element position sequence instead.

use std::{
    borrow::Cow,
    ops::{Range, RangeFull},
};

use itertools::Itertools;
use thiserror::Error;

use crate::array::{ArrayError, ArrayShape, MaskedArray};

/// A slice of one axis with optional `start`, `stop` and `step`.
///
/// Negative `start`/`stop` count from the end of the axis and out-of-range bounds are clamped.
/// A negative `step` walks the axis backwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct SliceExpr {
    /// The first position, or [`None`] for the start of the axis (its end if `step` is negative).
    pub start: Option<i64>,
    /// The end position (exclusive), or [`None`] for the end of the axis (its start if `step` is negative).
    pub stop: Option<i64>,
    /// The step, or [`None`] for 1.
    pub step: Option<i64>,
}

impl SliceExpr {
    /// Create a new slice.
    #[must_use]
    pub const fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Self { start, stop, step }
    }

    /// A slice selecting an entire axis.
    #[must_use]
    pub const fn full() -> Self {
        Self::new(None, None, None)
    }

    /// Resolve the slice against an axis of length `size`.
    ///
    /// # Errors
    /// Returns [`InvalidIndexError::ZeroStep`] if the step is zero.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn resolve(&self, axis: usize, size: u64) -> Result<ResolvedSlice, InvalidIndexError> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(InvalidIndexError::ZeroStep(axis));
        }
        let size = i64::try_from(size).unwrap_or(i64::MAX);
        let (lower, upper) = if step > 0 { (0, size) } else { (-1, size - 1) };
        let clamp = |bound: i64| {
            let bound = if bound < 0 { bound + size } else { bound };
            bound.clamp(lower, upper)
        };
        let start = self
            .start
            .map_or(if step > 0 { lower } else { upper }, clamp);
        let stop = self.stop.map_or(if step > 0 { upper } else { lower }, clamp);

        let (start_wide, stop_wide, step_wide) =
            (i128::from(start), i128::from(stop), i128::from(step));
        let length = if step > 0 && stop > start {
            (stop_wide - start_wide + step_wide - 1) / step_wide
        } else if step < 0 && start > stop {
            (start_wide - stop_wide - step_wide - 1) / -step_wide
        } else {
            0
        };
        Ok(ResolvedSlice {
            start: if length > 0 { start as u64 } else { 0 },
            step,
            length: length as u64,
        })
    }
}

impl From<Range<i64>> for SliceExpr {
    fn from(range: Range<i64>) -> Self {
        Self::new(Some(range.start), Some(range.end), None)
    }
}

impl From<RangeFull> for SliceExpr {
    fn from(_: RangeFull) -> Self {
        Self::full()
    }
}

/// A slice resolved against an axis: `length` positions from `start` in increments of `step`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResolvedSlice {
    start: u64,
    step: i64,
    length: u64,
}

impl ResolvedSlice {
    /// The first selected position.
    #[must_use]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// The step between selected positions.
    #[must_use]
    pub const fn step(&self) -> i64 {
        self.step
    }

    /// The number of selected positions.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.length
    }

    /// Returns true if the slice selects nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Return an iterator over the selected positions.
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn positions(&self) -> impl Iterator<Item = u64> {
        let Self {
            start,
            step,
            length,
        } = *self;
        (0..length).map(move |i| (start as i64 + i as i64 * step) as u64)
    }
}

/// The index expression for one axis.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AxisExpr {
    /// A slice.
    Slice(SliceExpr),
    /// A sequence of positions, negative positions count from the end of the axis.
    Positions(Vec<i64>),
    /// A scalar position. Never valid, as it would drop the axis.
    Position(i64),
}

impl AxisExpr {
    /// Select an entire axis.
    #[must_use]
    pub const fn full() -> Self {
        Self::Slice(SliceExpr::full())
    }
}

impl From<SliceExpr> for AxisExpr {
    fn from(slice: SliceExpr) -> Self {
        Self::Slice(slice)
    }
}

impl From<Range<i64>> for AxisExpr {
    fn from(range: Range<i64>) -> Self {
        Self::Slice(range.into())
    }
}

impl From<RangeFull> for AxisExpr {
    fn from(_: RangeFull) -> Self {
        Self::full()
    }
}

impl From<Vec<i64>> for AxisExpr {
    fn from(positions: Vec<i64>) -> Self {
        Self::Positions(positions)
    }
}

impl From<i64> for AxisExpr {
    fn from(position: i64) -> Self {
        Self::Position(position)
    }
}

/// An index expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum IndexExpr {
    /// Select everything.
    #[default]
    All,
    /// One entry per axis.
    Axes(Vec<AxisExpr>),
}

impl IndexExpr {
    /// Create an index expression with one entry per axis.
    pub fn axes(axes: impl IntoIterator<Item = AxisExpr>) -> Self {
        Self::Axes(axes.into_iter().collect())
    }
}

impl From<Vec<AxisExpr>> for IndexExpr {
    fn from(axes: Vec<AxisExpr>) -> Self {
        Self::Axes(axes)
    }
}

/// A canonical (resolved) index for one axis.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AxisIndex {
    /// A resolved slice.
    Slice(ResolvedSlice),
    /// A non-empty sequence of in-bounds positions.
    Positions(Vec<u64>),
}

impl AxisIndex {
    /// Select an entire axis of length `size`.
    #[must_use]
    pub const fn full(size: u64) -> Self {
        Self::Slice(ResolvedSlice {
            start: 0,
            step: 1,
            length: size,
        })
    }

    /// The number of selected positions.
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::Slice(slice) => slice.len(),
            Self::Positions(positions) => positions.len() as u64,
        }
    }

    /// Returns true if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the selected positions.
    #[must_use]
    pub fn positions(&self) -> Vec<u64> {
        match self {
            Self::Slice(slice) => slice.positions().collect(),
            Self::Positions(positions) => positions.clone(),
        }
    }

    fn max_position(&self) -> Option<u64> {
        match self {
            Self::Slice(slice) => slice.positions().max(),
            Self::Positions(positions) => positions.iter().max().copied(),
        }
    }
}

/// A canonical index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum CanonicalIndex {
    /// Select everything.
    #[default]
    All,
    /// Exactly one entry per axis.
    Axes(Vec<AxisIndex>),
}

impl CanonicalIndex {
    /// Return the shape of the subspace selected from an array of `shape`.
    #[must_use]
    pub fn shape(&self, shape: &[u64]) -> ArrayShape {
        match self {
            Self::All => shape.to_vec(),
            Self::Axes(axes) => axes.iter().map(AxisIndex::len).collect(),
        }
    }

    /// If `axis` selects exactly one position, return it.
    #[must_use]
    pub fn single_position(&self, axis: usize) -> Option<u64> {
        match self {
            Self::All => None,
            Self::Axes(axes) => match axes.get(axis)? {
                AxisIndex::Positions(positions) if positions.len() == 1 => Some(positions[0]),
                AxisIndex::Slice(slice) if slice.len() == 1 => Some(slice.start()),
                _ => None,
            },
        }
    }

    /// Extend the index to an array with one more trailing axis of length `size`, selecting all of it.
    ///
    /// The wildcard is unchanged.
    #[must_use]
    pub fn with_trailing_axis(self, size: u64) -> Self {
        match self {
            Self::All => Self::All,
            Self::Axes(mut axes) => {
                axes.push(AxisIndex::full(size));
                Self::Axes(axes)
            }
        }
    }
}

/// An invalid index expression.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvalidIndexError {
    /// The number of axis entries does not match the dimensionality of the array.
    #[error("index has {_0} axes, expected {_1}")]
    IncompatibleDimensionality(usize, usize),
    /// A scalar axis entry.
    #[error("axis {_0}: a scalar index is neither a slice nor a sequence of positions")]
    ScalarEntry(usize),
    /// An empty position sequence.
    #[error("axis {_0}: the sequence of positions is empty")]
    EmptyPositions(usize),
    /// A position outside the axis.
    #[error("axis {_0}: position {_1} is out of bounds for size {_2}")]
    OutOfBounds(usize, i64, u64),
    /// A slice with a zero step.
    #[error("axis {_0}: slice step cannot be zero")]
    ZeroStep(usize),
}

/// Normalise `index` against an array of `shape` into a [`CanonicalIndex`].
///
/// # Errors
/// Returns an [`InvalidIndexError`] if
///  - the number of entries does not match the dimensionality of `shape`,
///  - an entry is a scalar,
///  - a position sequence is empty or contains an out-of-bounds position, or
///  - a slice has a zero step.
pub fn normalise(shape: &[u64], index: &IndexExpr) -> Result<CanonicalIndex, InvalidIndexError> {
    let IndexExpr::Axes(axes) = index else {
        return Ok(CanonicalIndex::All);
    };
    if axes.len() != shape.len() {
        return Err(InvalidIndexError::IncompatibleDimensionality(
            axes.len(),
            shape.len(),
        ));
    }
    std::iter::zip(axes, shape)
        .enumerate()
        .map(|(axis, (expr, &size))| match expr {
            AxisExpr::Slice(slice) => slice.resolve(axis, size).map(AxisIndex::Slice),
            AxisExpr::Position(_) => Err(InvalidIndexError::ScalarEntry(axis)),
            AxisExpr::Positions(positions) if positions.is_empty() => {
                Err(InvalidIndexError::EmptyPositions(axis))
            }
            AxisExpr::Positions(positions) => positions
                .iter()
                .map(|&position| {
                    let resolved = if position < 0 {
                        i128::from(position) + i128::from(size)
                    } else {
                        i128::from(position)
                    };
                    u64::try_from(resolved)
                        .ok()
                        .filter(|&resolved| resolved < size)
                        .ok_or(InvalidIndexError::OutOfBounds(axis, position, size))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(AxisIndex::Positions),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(CanonicalIndex::Axes)
}

/// Extract the subspace of `array` selected by `index`.
///
/// Position sequences select independently along each axis.
/// With more than one position sequence, each is applied in turn (in ascending axis order) as a single axis selection, and then the remaining slices are applied together.
///
/// If `copy` is false and `index` is the wildcard then `array` is borrowed, otherwise the result is an independent buffer.
///
/// # Errors
/// Returns [`ArrayError::InvalidIndex`] if `index` is incompatible with the shape of `array`.
pub fn extract<'a>(
    array: &'a MaskedArray,
    index: &CanonicalIndex,
    copy: bool,
) -> Result<Cow<'a, MaskedArray>, ArrayError> {
    let axes = match index {
        CanonicalIndex::All if copy => return Ok(Cow::Owned(array.clone())),
        CanonicalIndex::All => return Ok(Cow::Borrowed(array)),
        CanonicalIndex::Axes(axes) => axes,
    };
    if axes.len() != array.dimensionality() {
        return Err(InvalidIndexError::IncompatibleDimensionality(
            axes.len(),
            array.dimensionality(),
        )
        .into());
    }
    for (axis, (axis_index, &size)) in std::iter::zip(axes, array.shape()).enumerate() {
        if let Some(position) = axis_index.max_position().filter(|&p| p >= size) {
            return Err(InvalidIndexError::OutOfBounds(
                axis,
                i64::try_from(position).unwrap_or(i64::MAX),
                size,
            )
            .into());
        }
    }

    let position_axes: Vec<usize> = axes
        .iter()
        .positions(|axis_index| matches!(axis_index, AxisIndex::Positions(_)))
        .collect();
    if position_axes.len() <= 1 {
        let positions: Vec<Vec<u64>> = axes.iter().map(AxisIndex::positions).collect();
        return Ok(Cow::Owned(array.select(&positions)?));
    }

    let mut taken: Option<MaskedArray> = None;
    for &axis in &position_axes {
        let source = taken.as_ref().unwrap_or(array);
        taken = Some(source.take(axis, &axes[axis].positions())?);
    }
    let taken = taken.unwrap_or_else(|| array.clone());
    let positions: Vec<Vec<u64>> = std::iter::zip(axes, taken.shape())
        .map(|(axis_index, &size)| match axis_index {
            AxisIndex::Slice(slice) => slice.positions().collect(),
            AxisIndex::Positions(_) => (0..size).collect(),
        })
        .collect();
    Ok(Cow::Owned(taken.select(&positions)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> MaskedArray {
        MaskedArray::from_elements(vec![2, 3], &[1i32, 2, 3, 4, 5, 6]).unwrap()
    }

    fn slice(start: Option<i64>, stop: Option<i64>, step: Option<i64>, size: u64) -> Vec<u64> {
        SliceExpr::new(start, stop, step)
            .resolve(0, size)
            .unwrap()
            .positions()
            .collect()
    }

    #[test]
    fn slice_resolve() {
        assert_eq!(slice(None, None, None, 5), vec![0, 1, 2, 3, 4]);
        assert_eq!(slice(Some(1), Some(4), Some(2), 5), vec![1, 3]);
        assert_eq!(slice(Some(-2), None, None, 5), vec![3, 4]);
        assert_eq!(slice(None, None, Some(-1), 5), vec![4, 3, 2, 1, 0]);
        assert_eq!(slice(Some(3), Some(0), Some(-2), 5), vec![3, 1]);
        assert_eq!(slice(Some(-10), Some(10), None, 3), vec![0, 1, 2]);
        assert_eq!(slice(Some(4), Some(1), None, 5), Vec::<u64>::new());
        assert_eq!(slice(None, None, None, 0), Vec::<u64>::new());
        assert_eq!(
            SliceExpr::new(None, None, Some(0)).resolve(1, 5),
            Err(InvalidIndexError::ZeroStep(1))
        );
    }

    #[test]
    fn slice_resolve_extreme_step() {
        assert_eq!(slice(None, None, Some(i64::MAX), 5), vec![0]);
        assert_eq!(slice(None, None, Some(i64::MIN), 5), vec![4]);
        assert_eq!(slice(Some(1), None, Some(i64::MAX), 5), vec![1]);
        assert_eq!(slice(Some(3), Some(i64::MIN), Some(i64::MIN), 5), vec![3]);
        assert_eq!(
            slice(Some(i64::MIN), Some(i64::MAX), Some(i64::MAX - 1), 5),
            vec![0]
        );
        let resolved = SliceExpr::new(None, None, Some(i64::MIN))
            .resolve(0, 5)
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.start(), 4);
    }

    #[test]
    fn normalise_valid() {
        let index = normalise(
            &[2, 3],
            &IndexExpr::axes([AxisExpr::from(vec![-1, 0]), AxisExpr::from(0..2)]),
        )
        .unwrap();
        assert_eq!(index.shape(&[2, 3]), vec![2, 2]);
        let CanonicalIndex::Axes(axes) = &index else {
            panic!()
        };
        assert_eq!(axes[0], AxisIndex::Positions(vec![1, 0]));
        assert_eq!(axes[1].positions(), vec![0, 1]);
        assert_eq!(normalise(&[2, 3], &IndexExpr::All), Ok(CanonicalIndex::All));
    }

    #[test]
    fn normalise_invalid() {
        assert_eq!(
            normalise(&[2, 3], &IndexExpr::axes([AxisExpr::full()])),
            Err(InvalidIndexError::IncompatibleDimensionality(1, 2))
        );
        assert_eq!(
            normalise(&[2, 3], &IndexExpr::axes([AxisExpr::from(1), AxisExpr::full()])),
            Err(InvalidIndexError::ScalarEntry(0))
        );
        assert_eq!(
            normalise(
                &[2, 3],
                &IndexExpr::axes([AxisExpr::full(), AxisExpr::from(Vec::<i64>::new())])
            ),
            Err(InvalidIndexError::EmptyPositions(1))
        );
        assert_eq!(
            normalise(&[2, 3], &IndexExpr::axes([AxisExpr::from(vec![2]), AxisExpr::full()])),
            Err(InvalidIndexError::OutOfBounds(0, 2, 2))
        );
        assert_eq!(
            normalise(&[2, 3], &IndexExpr::axes([AxisExpr::full(), AxisExpr::from(vec![-4])])),
            Err(InvalidIndexError::OutOfBounds(1, -4, 3))
        );
    }

    #[test]
    fn single_position() {
        let index = normalise(
            &[4, 3],
            &IndexExpr::axes([AxisExpr::from(vec![2]), AxisExpr::from(1..2)]),
        )
        .unwrap();
        assert_eq!(index.single_position(0), Some(2));
        assert_eq!(index.single_position(1), Some(1));
        assert_eq!(index.single_position(2), None);
        assert_eq!(CanonicalIndex::All.single_position(0), None);
        let index = normalise(&[4], &IndexExpr::axes([AxisExpr::from(vec![1, 1])])).unwrap();
        assert_eq!(index.single_position(0), None);
    }

    #[test]
    fn extract_all() {
        let array = source();
        let borrowed = extract(&array, &CanonicalIndex::All, false).unwrap();
        assert!(matches!(borrowed, Cow::Borrowed(_)));
        assert_eq!(*borrowed, array);
        let copied = extract(&array, &CanonicalIndex::All, true).unwrap();
        assert!(matches!(copied, Cow::Owned(_)));
        assert_eq!(*copied, array);
    }

    #[test]
    fn extract_independent_axes() {
        let array = source();
        let index = normalise(
            array.shape(),
            &IndexExpr::axes([AxisExpr::from(vec![1, 0]), AxisExpr::from(vec![2, 0])]),
        )
        .unwrap();
        let subspace = extract(&array, &index, false).unwrap();
        assert_eq!(subspace.shape(), &[2, 2]);
        assert_eq!(
            subspace.elements::<i32>().unwrap(),
            vec![Some(6), Some(4), Some(3), Some(1)]
        );
    }

    #[test]
    fn extract_positions_and_slices() {
        let elements = (0..24).collect::<Vec<u8>>();
        let array = MaskedArray::from_elements(vec![2, 3, 4], &elements).unwrap();
        let index = normalise(
            array.shape(),
            &IndexExpr::axes([
                AxisExpr::from(vec![1]),
                AxisExpr::Slice(SliceExpr::new(None, None, Some(-2))),
                AxisExpr::from(vec![3, 0, 3]),
            ]),
        )
        .unwrap();
        let subspace = extract(&array, &index, false).unwrap();
        assert_eq!(subspace.shape(), &[1, 2, 3]);
        assert_eq!(
            subspace.elements::<u8>().unwrap(),
            vec![Some(23), Some(20), Some(23), Some(15), Some(12), Some(15)]
        );

        let index = normalise(
            array.shape(),
            &IndexExpr::axes([AxisExpr::full(), AxisExpr::from(1..3), AxisExpr::from(vec![-1])]),
        )
        .unwrap();
        let subspace = extract(&array, &index, false).unwrap();
        assert_eq!(subspace.shape(), &[2, 2, 1]);
        assert_eq!(
            subspace.elements::<u8>().unwrap(),
            vec![Some(7), Some(11), Some(19), Some(23)]
        );
    }

    #[test]
    fn extract_preserves_mask() {
        let array =
            MaskedArray::from_optional_elements(vec![2, 2], &[Some(1.0f64), None, None, Some(4.0)])
                .unwrap();
        let index = normalise(
            array.shape(),
            &IndexExpr::axes([AxisExpr::from(vec![1, 0]), AxisExpr::from(vec![1, 0])]),
        )
        .unwrap();
        let subspace = extract(&array, &index, true).unwrap();
        assert_eq!(
            subspace.elements::<f64>().unwrap(),
            vec![Some(4.0), None, None, Some(1.0)]
        );
    }

    #[test]
    fn extract_copy_rank_0() {
        let array = MaskedArray::from_optional_elements(vec![], &[None::<i16>]).unwrap();
        let copied = extract(&array, &CanonicalIndex::Axes(vec![]), true).unwrap();
        assert!(matches!(copied, Cow::Owned(_)));
        assert_eq!(copied.shape(), &[] as &[u64]);
        assert_eq!(copied.count_masked(), 1);
    }

    #[test]
    fn extract_invalid() {
        let array = source();
        assert!(matches!(
            extract(&array, &CanonicalIndex::Axes(vec![AxisIndex::full(2)]), false),
            Err(ArrayError::InvalidIndex(_))
        ));
        assert!(matches!(
            extract(
                &array,
                &CanonicalIndex::Axes(vec![AxisIndex::Positions(vec![5]), AxisIndex::full(3)]),
                false
            ),
            Err(ArrayError::InvalidIndex(InvalidIndexError::OutOfBounds(0, 5, 2)))
        ));
    }
}
