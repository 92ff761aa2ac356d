use super::{ArrayError, DataType};

/// A trait representing an array element type.
pub trait Element: Sized + Copy + Send + Sync + 'static {
    /// The data type of an array created from elements of this type.
    const DATA_TYPE: DataType;

    /// Validate the data type.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementType`] if the data type is incompatible with [`Element`].
    fn validate_data_type(data_type: &DataType) -> Result<(), ArrayError>;

    /// Convert a slice of elements into their native-endian bytes.
    fn to_ne_bytes_vec(elements: &[Self]) -> Vec<u8>;

    /// Convert the native-endian bytes of one element into an element.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidElementValue`] if the bytes are not a valid element.
    fn from_ne_bytes_slice(bytes: &[u8]) -> Result<Self, ArrayError>;
}

fn incompatible<T>(data_type: &DataType) -> ArrayError {
    ArrayError::IncompatibleElementType(data_type.clone(), core::any::type_name::<T>())
}

impl Element for bool {
    const DATA_TYPE: DataType = DataType::Bool;

    fn validate_data_type(data_type: &DataType) -> Result<(), ArrayError> {
        (data_type == &DataType::Bool)
            .then_some(())
            .ok_or_else(|| incompatible::<Self>(data_type))
    }

    fn to_ne_bytes_vec(elements: &[Self]) -> Vec<u8> {
        elements.iter().map(|&element| u8::from(element)).collect()
    }

    fn from_ne_bytes_slice(bytes: &[u8]) -> Result<Self, ArrayError> {
        match bytes {
            [0] => Ok(false),
            [1] => Ok(true),
            _ => Err(ArrayError::InvalidElementValue),
        }
    }
}

macro_rules! impl_element_pod {
    ($raw_type:ty, $data_type:expr, $pattern:pat $(,)?) => {
        impl Element for $raw_type {
            const DATA_TYPE: DataType = $data_type;

            fn validate_data_type(data_type: &DataType) -> Result<(), ArrayError> {
                if matches!(data_type, $pattern) {
                    Ok(())
                } else {
                    Err(incompatible::<Self>(data_type))
                }
            }

            fn to_ne_bytes_vec(elements: &[Self]) -> Vec<u8> {
                bytemuck::cast_slice(elements).to_vec()
            }

            fn from_ne_bytes_slice(bytes: &[u8]) -> Result<Self, ArrayError> {
                if bytes.len() == core::mem::size_of::<Self>() {
                    Ok(bytemuck::pod_read_unaligned(bytes))
                } else {
                    Err(ArrayError::InvalidElementValue)
                }
            }
        }
    };
}

impl_element_pod!(i8, DataType::Int8, DataType::Int8);
impl_element_pod!(i16, DataType::Int16, DataType::Int16);
impl_element_pod!(i32, DataType::Int32, DataType::Int32);
impl_element_pod!(i64, DataType::Int64, DataType::Int64);
impl_element_pod!(u8, DataType::UInt8, DataType::UInt8 | DataType::Char);
impl_element_pod!(u16, DataType::UInt16, DataType::UInt16);
impl_element_pod!(u32, DataType::UInt32, DataType::UInt32);
impl_element_pod!(u64, DataType::UInt64, DataType::UInt64);
impl_element_pod!(f32, DataType::Float32, DataType::Float32);
impl_element_pod!(f64, DataType::Float64, DataType::Float64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_validate() {
        assert!(f32::validate_data_type(&DataType::Float32).is_ok());
        assert!(f32::validate_data_type(&DataType::Float64).is_err());
        assert!(u8::validate_data_type(&DataType::Char).is_ok());
        assert!(bool::validate_data_type(&DataType::UInt8).is_err());
    }

    #[test]
    fn element_bytes() {
        let bytes = i16::to_ne_bytes_vec(&[1, -2]);
        assert_eq!(bytes.len(), 4);
        assert_eq!(i16::from_ne_bytes_slice(&bytes[2..4]).unwrap(), -2);
        assert!(i16::from_ne_bytes_slice(&bytes[0..1]).is_err());
        assert_eq!(bool::to_ne_bytes_vec(&[true, false]), vec![1, 0]);
        assert!(bool::from_ne_bytes_slice(&[2]).is_err());
    }
}
