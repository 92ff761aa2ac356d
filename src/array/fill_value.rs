//! Fill values.
//!
//! A [`FillValue`] is the native-endian byte representation of a single element.
//! It identifies stored elements that represent missing data.

use super::DataType;

/// The byte representation of a single element value.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FillValue(Vec<u8>);

impl core::fmt::Display for FillValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<Vec<u8>> for FillValue {
    fn from(value: Vec<u8>) -> Self {
        FillValue(value)
    }
}

impl From<bool> for FillValue {
    fn from(value: bool) -> Self {
        FillValue(vec![u8::from(value)])
    }
}

macro_rules! impl_fill_value_from_ne_bytes {
    ($($t:ty),*) => {
        $(
            impl From<$t> for FillValue {
                fn from(value: $t) -> Self {
                    FillValue(value.to_ne_bytes().to_vec())
                }
            }
        )*
    };
}

impl_fill_value_from_ne_bytes!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl FillValue {
    /// Create a new fill value composed of `bytes`.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> FillValue {
        FillValue(bytes)
    }

    /// Returns the size in bytes of the fill value.
    #[must_use]
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Return the byte representation of the fill value.
    #[must_use]
    pub fn as_ne_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns true if the fill value can represent an element of `data_type`.
    #[must_use]
    pub fn is_compatible(&self, data_type: &DataType) -> bool {
        self.size() == data_type.size()
    }

    /// Check if the bytes of a single element are equal to the fill value.
    #[must_use]
    pub fn equals(&self, element_bytes: &[u8]) -> bool {
        self.0 == element_bytes
    }
}
