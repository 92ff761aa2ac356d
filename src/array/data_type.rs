//! Array data types.
//!
//! The data types of stored variables: booleans, fixed size integers and floating point numbers, and text.
//!
//! Text is stored one character per element ([`DataType::Char`]) along a trailing axis.
//! A [`FileArray`](crate::array::FileArray) collapses that axis into fixed width strings ([`DataType::FixedString`]) on read.

use derive_more::From;
use thiserror::Error;

/// A data type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
#[rustfmt::skip]
pub enum DataType {
    /// `bool` Boolean.
    Bool,
    /// `int8` Integer in `[-2^7, 2^7-1]`.
    Int8,
    /// `int16` Integer in `[-2^15, 2^15-1]`.
    Int16,
    /// `int32` Integer in `[-2^31, 2^31-1]`.
    Int32,
    /// `int64` Integer in `[-2^63, 2^63-1]`.
    Int64,
    /// `uint8` Integer in `[0, 2^8-1]`.
    UInt8,
    /// `uint16` Integer in `[0, 2^16-1]`.
    UInt16,
    /// `uint32` Integer in `[0, 2^32-1]`.
    UInt32,
    /// `uint64` Integer in `[0, 2^64-1]`.
    UInt64,
    /// `float32` IEEE 754 single-precision floating point: sign bit, 8 bits exponent, 23 bits mantissa.
    Float32,
    /// `float64` IEEE 754 double-precision floating point: sign bit, 11 bits exponent, 52 bits mantissa.
    Float64,
    /// `char` A single byte of text.
    Char,
    /// `S*` Fixed width text, NUL padded, of the given size in bytes.
    FixedString(usize),
}

/// An unsupported data type error.
#[derive(Debug, Error, From)]
#[error("unsupported data type {_0}")]
pub struct UnsupportedDataTypeError(String);

impl DataType {
    /// Returns the identifier.
    #[must_use]
    pub const fn identifier(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Char => "char",
            Self::FixedString(_) => "S*",
        }
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::FixedString(size) => format!("S{size}"),
            _ => self.identifier().to_string(),
        }
    }

    /// Returns the size in bytes of an element of this data type.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 | Self::Char => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
            Self::FixedString(size) => *size,
        }
    }

    /// Returns true if the data type holds text.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Char | Self::FixedString(_))
    }

    /// Create a data type from its name.
    ///
    /// # Errors
    /// Returns [`UnsupportedDataTypeError`] if the name is not a known data type.
    pub fn from_name(name: &str) -> Result<Self, UnsupportedDataTypeError> {
        match name {
            "bool" => Ok(Self::Bool),
            "int8" => Ok(Self::Int8),
            "int16" => Ok(Self::Int16),
            "int32" => Ok(Self::Int32),
            "int64" => Ok(Self::Int64),
            "uint8" => Ok(Self::UInt8),
            "uint16" => Ok(Self::UInt16),
            "uint32" => Ok(Self::UInt32),
            "uint64" => Ok(Self::UInt64),
            "float32" => Ok(Self::Float32),
            "float64" => Ok(Self::Float64),
            "char" => Ok(Self::Char),
            _ => name
                .strip_prefix('S')
                .and_then(|size| size.parse::<usize>().ok())
                .filter(|size| *size > 0)
                .map(Self::FixedString)
                .ok_or_else(|| UnsupportedDataTypeError(name.to_string())),
        }
    }
}

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}
