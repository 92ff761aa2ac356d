use itertools::izip;

use super::{
    iter_u64_to_usize, ravel_indices, ArrayError, ArrayShape, DataType, Element, FillValue,
};

/// A dense, row-major array with a per-element mask.
///
/// A masked element holds no value (it is missing).
/// The bytes of a masked element are unspecified and are ignored by comparisons.
#[derive(Clone, Debug)]
pub struct MaskedArray {
    data_type: DataType,
    shape: ArrayShape,
    bytes: Vec<u8>,
    mask: Vec<bool>,
}

#[allow(clippy::cast_possible_truncation)]
const fn to_usize(value: u64) -> usize {
    value as usize
}

fn num_elements_usize(shape: &[u64]) -> usize {
    to_usize(shape.iter().product())
}

/// Call `f` with the linearised index (in an array of `shape`) of every element of the outer product of the per-axis `positions`.
///
/// Elements are visited in row-major order of the selection.
fn for_each_linearised(positions: &[Vec<u64>], shape: &[u64], mut f: impl FnMut(usize)) {
    if positions.iter().any(Vec::is_empty) {
        return;
    }
    let mut strides = vec![1; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * to_usize(shape[axis + 1]);
    }
    let mut counter = vec![0usize; positions.len()];
    loop {
        let index = izip!(positions, &counter, &strides)
            .map(|(positions, &i, &stride)| to_usize(positions[i]) * stride)
            .sum();
        f(index);

        let mut axis = positions.len();
        loop {
            if axis == 0 {
                return;
            }
            axis -= 1;
            counter[axis] += 1;
            if counter[axis] < positions[axis].len() {
                break;
            }
            counter[axis] = 0;
        }
    }
}

impl MaskedArray {
    /// Create a fully masked array.
    #[must_use]
    pub fn new_masked(data_type: DataType, shape: ArrayShape) -> Self {
        let num_elements = num_elements_usize(&shape);
        Self {
            bytes: vec![0; num_elements * data_type.size()],
            mask: vec![true; num_elements],
            data_type,
            shape,
        }
    }

    /// Create an array from element `bytes` and a `mask`.
    ///
    /// # Errors
    /// Returns [`ArrayError::ShapeMismatch`] if the length of `bytes` or `mask` is incompatible with `shape` and `data_type`.
    pub fn new(
        data_type: DataType,
        shape: ArrayShape,
        bytes: Vec<u8>,
        mask: Vec<bool>,
    ) -> Result<Self, ArrayError> {
        let num_elements = num_elements_usize(&shape);
        if mask.len() != num_elements {
            return Err(ArrayError::ShapeMismatch(format!(
                "mask has {} elements, expected {num_elements} for shape {shape:?}",
                mask.len()
            )));
        }
        if bytes.len() != num_elements * data_type.size() {
            return Err(ArrayError::ShapeMismatch(format!(
                "got {} bytes, expected {} for shape {shape:?} and data type {data_type}",
                bytes.len(),
                num_elements * data_type.size()
            )));
        }
        Ok(Self {
            data_type,
            shape,
            bytes,
            mask,
        })
    }

    /// Create an unmasked array of `data_type` from `elements`.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `T` is incompatible with `data_type` or the number of elements is incompatible with `shape`.
    pub fn new_with_elements<T: Element>(
        data_type: DataType,
        shape: ArrayShape,
        elements: &[T],
    ) -> Result<Self, ArrayError> {
        T::validate_data_type(&data_type)?;
        let mask = vec![false; elements.len()];
        Self::new(data_type, shape, T::to_ne_bytes_vec(elements), mask)
    }

    /// Create an unmasked array from `elements`.
    ///
    /// # Errors
    /// Returns [`ArrayError::ShapeMismatch`] if the number of elements is incompatible with `shape`.
    pub fn from_elements<T: Element>(
        shape: ArrayShape,
        elements: &[T],
    ) -> Result<Self, ArrayError> {
        Self::new_with_elements(T::DATA_TYPE, shape, elements)
    }

    /// Create an array from optional `elements`, where [`None`] is masked.
    ///
    /// # Errors
    /// Returns [`ArrayError::ShapeMismatch`] if the number of elements is incompatible with `shape`.
    pub fn from_optional_elements<T: Element + Default>(
        shape: ArrayShape,
        elements: &[Option<T>],
    ) -> Result<Self, ArrayError> {
        let values: Vec<T> = elements.iter().map(|e| e.unwrap_or_default()).collect();
        let mask = elements.iter().map(Option::is_none).collect();
        Self::new(T::DATA_TYPE, shape, T::to_ne_bytes_vec(&values), mask)
    }

    /// Create a fixed width text array from optional `strings`, where [`None`] is masked.
    ///
    /// The width is the length in bytes of the longest string (at least 1).
    ///
    /// # Errors
    /// Returns [`ArrayError::ShapeMismatch`] if the number of strings is incompatible with `shape`.
    pub fn from_strings<S: AsRef<str>>(
        shape: ArrayShape,
        strings: &[Option<S>],
    ) -> Result<Self, ArrayError> {
        let width = strings
            .iter()
            .flatten()
            .map(|s| s.as_ref().len())
            .max()
            .unwrap_or_default()
            .max(1);
        let mut bytes = vec![0; strings.len() * width];
        for (element, string) in std::iter::zip(bytes.chunks_exact_mut(width), strings) {
            if let Some(string) = string {
                let string = string.as_ref().as_bytes();
                element[..string.len()].copy_from_slice(string);
            }
        }
        let mask = strings.iter().map(Option::is_none).collect();
        Self::new(DataType::FixedString(width), shape, bytes, mask)
    }

    /// Return the data type of the array.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Return the shape of the array.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the dimensionality of the array.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.shape.len()
    }

    /// Return the number of elements of the array.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Return the native-endian bytes of all elements.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Return the mask, `true` where an element is masked.
    #[must_use]
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Return the number of masked elements.
    #[must_use]
    pub fn count_masked(&self) -> usize {
        self.mask.iter().filter(|&&masked| masked).count()
    }

    fn linearised_index(&self, indices: &[u64]) -> Option<usize> {
        (indices.len() == self.shape.len()
            && std::iter::zip(indices, &self.shape).all(|(i, s)| i < s))
        .then(|| to_usize(ravel_indices(indices, &self.shape)))
    }

    /// Returns true if the element at `indices` is masked, or [`None`] if `indices` are out of bounds.
    #[must_use]
    pub fn is_masked(&self, indices: &[u64]) -> Option<bool> {
        self.linearised_index(indices).map(|index| self.mask[index])
    }

    /// Return the bytes of the element at `indices`, or [`None`] if it is masked or `indices` are out of bounds.
    #[must_use]
    pub fn element_bytes(&self, indices: &[u64]) -> Option<&[u8]> {
        let index = self.linearised_index(indices)?;
        let size = self.data_type.size();
        (!self.mask[index]).then(|| &self.bytes[index * size..(index + 1) * size])
    }

    /// Return the elements of the array in row-major order, with [`None`] where masked.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `T` is incompatible with the data type of the array.
    pub fn elements<T: Element>(&self) -> Result<Vec<Option<T>>, ArrayError> {
        T::validate_data_type(&self.data_type)?;
        let size = self.data_type.size();
        self.mask
            .iter()
            .enumerate()
            .map(|(index, &masked)| {
                if masked {
                    Ok(None)
                } else {
                    T::from_ne_bytes_slice(&self.bytes[index * size..(index + 1) * size]).map(Some)
                }
            })
            .collect()
    }

    /// Return the elements of a text array as strings in row-major order, with [`None`] where masked.
    ///
    /// Trailing NUL padding is removed.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementType`] if the array does not hold text.
    pub fn strings(&self) -> Result<Vec<Option<String>>, ArrayError> {
        if !self.data_type.is_text() {
            return Err(ArrayError::IncompatibleElementType(
                self.data_type.clone(),
                "String",
            ));
        }
        let size = self.data_type.size();
        Ok(self
            .mask
            .iter()
            .enumerate()
            .map(|(index, &masked)| {
                (!masked).then(|| {
                    let element = &self.bytes[index * size..(index + 1) * size];
                    let end = element.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
                    String::from_utf8_lossy(&element[..end]).into_owned()
                })
            })
            .collect())
    }

    /// Convert the array to an [`ndarray::ArrayD`], with [`None`] where masked.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `T` is incompatible with the data type of the array.
    pub fn to_ndarray<T: Element>(&self) -> Result<ndarray::ArrayD<Option<T>>, ArrayError> {
        let elements = self.elements::<T>()?;
        ndarray::ArrayD::from_shape_vec(iter_u64_to_usize(self.shape.iter()), elements)
            .map_err(|err| ArrayError::ShapeMismatch(err.to_string()))
    }

    /// Reshape the array, preserving the row-major order of its elements.
    ///
    /// # Errors
    /// Returns [`ArrayError::ShapeMismatch`] if `shape` has a different number of elements.
    pub fn reshape(self, shape: ArrayShape) -> Result<Self, ArrayError> {
        if shape.iter().product::<u64>() == self.num_elements() {
            Ok(Self { shape, ..self })
        } else {
            Err(ArrayError::ShapeMismatch(format!(
                "cannot reshape an array of shape {:?} to {shape:?}",
                self.shape
            )))
        }
    }

    /// Mask every element equal to `fill_value`.
    pub fn mask_fill_value(&mut self, fill_value: &FillValue) {
        let size = self.data_type.size();
        if fill_value.size() != size {
            return;
        }
        for (index, masked) in self.mask.iter_mut().enumerate() {
            if !*masked && fill_value.equals(&self.bytes[index * size..(index + 1) * size]) {
                *masked = true;
            }
        }
    }

    /// The positions of every element along each axis of an array of `shape`.
    pub(crate) fn full_positions(shape: &[u64]) -> Vec<Vec<u64>> {
        shape.iter().map(|&size| (0..size).collect()).collect()
    }

    fn validate_positions(&self, positions: &[Vec<u64>]) -> Result<(), ArrayError> {
        if positions.len() != self.shape.len() {
            return Err(ArrayError::ShapeMismatch(format!(
                "selection of dimensionality {} is incompatible with an array of shape {:?}",
                positions.len(),
                self.shape
            )));
        }
        for (axis, (positions, &size)) in std::iter::zip(positions, &self.shape).enumerate() {
            if let Some(position) = positions.iter().find(|&&p| p >= size) {
                return Err(ArrayError::ShapeMismatch(format!(
                    "position {position} is out of bounds for axis {axis} with size {size}"
                )));
            }
        }
        Ok(())
    }

    /// Select the outer product of the per-axis `positions`.
    ///
    /// Each axis of the result has the length of the corresponding position list, independently of all other axes.
    pub(crate) fn select(&self, positions: &[Vec<u64>]) -> Result<Self, ArrayError> {
        self.validate_positions(positions)?;
        let shape: ArrayShape = positions.iter().map(|p| p.len() as u64).collect();
        let num_elements = num_elements_usize(&shape);
        let size = self.data_type.size();
        let mut bytes = Vec::with_capacity(num_elements * size);
        let mut mask = Vec::with_capacity(num_elements);
        for_each_linearised(positions, &self.shape, |index| {
            bytes.extend_from_slice(&self.bytes[index * size..(index + 1) * size]);
            mask.push(self.mask[index]);
        });
        Ok(Self {
            data_type: self.data_type.clone(),
            shape,
            bytes,
            mask,
        })
    }

    /// Select `positions` along `axis` only.
    pub(crate) fn take(&self, axis: usize, positions: &[u64]) -> Result<Self, ArrayError> {
        let mut selection = Self::full_positions(&self.shape);
        match selection.get_mut(axis) {
            Some(selection_axis) => *selection_axis = positions.to_vec(),
            None => {
                return Err(ArrayError::ShapeMismatch(format!(
                    "axis {axis} is out of bounds for an array of shape {:?}",
                    self.shape
                )))
            }
        }
        self.select(&selection)
    }

    /// Assign `source` to the outer product of the per-axis `positions`.
    ///
    /// The elements of `source` are assigned in row-major order, so only its number of elements must match the selection.
    pub(crate) fn assign(
        &mut self,
        positions: &[Vec<u64>],
        source: &MaskedArray,
    ) -> Result<(), ArrayError> {
        self.assign_selection(positions, source, &Self::full_positions(&source.shape))
    }

    /// Assign the outer product of the per-axis `source_positions` of `source` to the outer product of the per-axis `positions`.
    ///
    /// Elements are copied in row-major order of both selections, so only their numbers of elements must match.
    pub(crate) fn assign_selection(
        &mut self,
        positions: &[Vec<u64>],
        source: &MaskedArray,
        source_positions: &[Vec<u64>],
    ) -> Result<(), ArrayError> {
        self.validate_positions(positions)?;
        source.validate_positions(source_positions)?;
        if source.data_type != self.data_type {
            return Err(ArrayError::IncompatibleDataType(
                source.data_type.clone(),
                self.data_type.clone(),
            ));
        }
        let num_selected: u64 = positions.iter().map(|p| p.len() as u64).product();
        let num_source: u64 = source_positions.iter().map(|p| p.len() as u64).product();
        if num_selected != num_source {
            return Err(ArrayError::ShapeMismatch(format!(
                "cannot assign {num_source} elements of an array of shape {:?} to a selection of {num_selected} elements",
                source.shape
            )));
        }

        let mut source_indices = Vec::with_capacity(to_usize(num_source));
        for_each_linearised(source_positions, &source.shape, |index| {
            source_indices.push(index);
        });
        let size = self.data_type.size();
        let Self {
            shape, bytes, mask, ..
        } = self;
        let mut source_indices = source_indices.into_iter();
        for_each_linearised(positions, shape, |index| {
            if let Some(source_index) = source_indices.next() {
                bytes[index * size..(index + 1) * size].copy_from_slice(
                    &source.bytes[source_index * size..(source_index + 1) * size],
                );
                mask[index] = source.mask[source_index];
            }
        });
        Ok(())
    }
}

impl PartialEq for MaskedArray {
    fn eq(&self, other: &Self) -> bool {
        if self.data_type != other.data_type || self.shape != other.shape || self.mask != other.mask
        {
            return false;
        }
        let size = self.data_type.size();
        self.mask.iter().enumerate().all(|(index, &masked)| {
            masked
                || self.bytes[index * size..(index + 1) * size]
                    == other.bytes[index * size..(index + 1) * size]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_array_new() {
        let array = MaskedArray::new_masked(DataType::Float32, vec![2, 3]);
        assert_eq!(array.num_elements(), 6);
        assert_eq!(array.bytes().len(), 24);
        assert_eq!(array.count_masked(), 6);
        assert!(MaskedArray::new(DataType::UInt8, vec![2], vec![0; 3], vec![false; 2]).is_err());
        assert!(MaskedArray::new(DataType::UInt8, vec![2], vec![0; 2], vec![false; 3]).is_err());
        assert!(MaskedArray::from_elements(vec![2, 2], &[1u8, 2, 3]).is_err());
        assert!(MaskedArray::new_with_elements(DataType::Int32, vec![1], &[1u8]).is_err());
    }

    #[test]
    fn masked_array_elements() -> Result<(), ArrayError> {
        let elements = [Some(1i32), None, Some(3), Some(4)];
        let array = MaskedArray::from_optional_elements(vec![2, 2], &elements)?;
        assert_eq!(array.elements::<i32>()?, vec![Some(1), None, Some(3), Some(4)]);
        assert!(array.elements::<f32>().is_err());
        assert_eq!(array.is_masked(&[0, 1]), Some(true));
        assert_eq!(array.is_masked(&[1, 1]), Some(false));
        assert_eq!(array.is_masked(&[2, 0]), None);
        assert_eq!(array.element_bytes(&[1, 0]), Some(3i32.to_ne_bytes().as_slice()));
        assert_eq!(array.element_bytes(&[0, 1]), None);
        assert_eq!(
            array.to_ndarray::<i32>()?,
            ndarray::array![[Some(1), None], [Some(3), Some(4)]].into_dyn()
        );
        Ok(())
    }

    #[test]
    fn masked_array_strings() -> Result<(), ArrayError> {
        let array = MaskedArray::from_strings(vec![3], &[Some("abc"), None, Some("de")])?;
        assert_eq!(array.data_type(), &DataType::FixedString(3));
        assert_eq!(
            array.strings()?,
            vec![Some("abc".to_string()), None, Some("de".to_string())]
        );
        assert!(MaskedArray::from_elements(vec![1], &[1u16])?.strings().is_err());
        Ok(())
    }

    #[test]
    fn masked_array_eq_ignores_masked_bytes() -> Result<(), ArrayError> {
        let a = MaskedArray::new(DataType::UInt8, vec![2], vec![1, 7], vec![false, true])?;
        let b = MaskedArray::new(DataType::UInt8, vec![2], vec![1, 9], vec![false, true])?;
        let c = MaskedArray::new(DataType::UInt8, vec![2], vec![1, 9], vec![false, false])?;
        assert_eq!(a, b);
        assert_ne!(a, c);
        Ok(())
    }

    #[test]
    fn masked_array_select_outer() -> Result<(), ArrayError> {
        let array = MaskedArray::from_elements(vec![2, 3], &[1u8, 2, 3, 4, 5, 6])?;
        let selected = array.select(&[vec![1, 0], vec![2, 0]])?;
        assert_eq!(selected.shape(), &[2, 2]);
        assert_eq!(selected.elements::<u8>()?, vec![Some(6), Some(4), Some(3), Some(1)]);
        assert!(array.select(&[vec![2], vec![0]]).is_err());
        assert!(array.select(&[vec![0]]).is_err());

        let taken = array.take(1, &[2, 2, 1])?;
        assert_eq!(taken.shape(), &[2, 3]);
        assert_eq!(
            taken.elements::<u8>()?,
            vec![Some(3), Some(3), Some(2), Some(6), Some(6), Some(5)]
        );
        assert!(array.take(2, &[0]).is_err());
        Ok(())
    }

    #[test]
    fn masked_array_assign() -> Result<(), ArrayError> {
        let mut array = MaskedArray::new_masked(DataType::UInt8, vec![2, 3]);
        let source = MaskedArray::from_elements(vec![2], &[10u8, 20])?;
        array.assign(&[vec![1], vec![0, 1]], &source)?;
        assert_eq!(
            array.elements::<u8>()?,
            vec![None, None, None, Some(10), Some(20), None]
        );
        assert!(array.assign(&[vec![1], vec![0]], &source).is_err());
        let other = MaskedArray::from_elements(vec![2], &[10u16, 20])?;
        assert!(array.assign(&[vec![1], vec![0, 1]], &other).is_err());
        Ok(())
    }

    #[test]
    fn masked_array_assign_selection() -> Result<(), ArrayError> {
        let mut array = MaskedArray::new_masked(DataType::Int16, vec![2, 3]);
        let elements = [Some(1i16), Some(2), None, Some(4), Some(5), Some(6)];
        let source = MaskedArray::from_optional_elements(vec![3, 2], &elements)?;
        array.assign_selection(&[vec![0], vec![2, 0]], &source, &[vec![2, 1], vec![1]])?;
        assert_eq!(
            array.elements::<i16>()?,
            vec![Some(4), None, Some(6), None, None, None]
        );
        array.assign_selection(&[vec![1], vec![1]], &source, &[vec![1], vec![0]])?;
        assert_eq!(array.is_masked(&[1, 1]), Some(true));
        assert!(array
            .assign_selection(&[vec![1], vec![1, 2]], &source, &[vec![0], vec![0]])
            .is_err());
        assert!(array
            .assign_selection(&[vec![1], vec![1]], &source, &[vec![3], vec![0]])
            .is_err());
        Ok(())
    }

    #[test]
    fn masked_array_rank_0() -> Result<(), ArrayError> {
        let array = MaskedArray::from_elements(vec![], &[42u64])?;
        assert_eq!(array.num_elements(), 1);
        let selected = array.select(&[])?;
        assert_eq!(selected.elements::<u64>()?, vec![Some(42)]);
        Ok(())
    }

    #[test]
    fn masked_array_mask_fill_value() -> Result<(), ArrayError> {
        let mut array = MaskedArray::from_elements(vec![3], &[1.0f32, -999.0, 3.0])?;
        array.mask_fill_value(&FillValue::from(-999.0f32));
        assert_eq!(array.elements::<f32>()?, vec![Some(1.0), None, Some(3.0)]);
        let reshaped = array.reshape(vec![1, 3])?;
        assert_eq!(reshaped.shape(), &[1, 3]);
        assert!(reshaped.reshape(vec![2, 2]).is_err());
        Ok(())
    }
}
