//! A rust library for lazily evaluated, randomly indexable arrays over scientific array data.
//!
//! Array data may be held in memory, stored in a variable of a file, or stored in one of the ragged/compressed encodings of the [CF conventions](https://cfconventions.org):
//!  - gathered arrays (compression by gathering),
//!  - contiguous ragged arrays,
//!  - indexed ragged arrays, and
//!  - indexed contiguous ragged arrays.
//!
//! Consumers request an arbitrary multidimensional subspace of the *logical* (uncompressed) array and only that subspace is returned.
//! Compressed data is decompressed on demand.
//!
//! ## Getting Started
//! - [`array::LazyArray`] is the capability set every array implements.
//! - [`array::InMemoryArray`], [`array::FileArray`] and [`array::CompressedArray`] are the implementations.
//! - [`array_index`] describes the supported index expressions and their (non-default) independent per-axis semantics.
//!
//! ## Example
//! ```rust,ignore
//! # use std::sync::Arc;
//! use cfarray::array::{
//!     compression::{CompressionDescriptor, RaggedContiguous},
//!     CompressedArray, DataType, FileArray, LazyArray, VariableId,
//! };
//! use cfarray::array_index::{AxisExpr, IndexExpr};
//!
//! // A flat sample dimension of 5 values holding 2 instances
//! let payload = FileArray::new("/path/to/file.npz", VariableId::from("temperature"), DataType::Float64, vec![5])?;
//! let compression = RaggedContiguous::new(0, 1, vec![0..2, 2..5]);
//! let array = CompressedArray::new(Arc::new(payload), vec![2, 3], compression.into())?;
//!
//! let instance_1 = array.read(&IndexExpr::axes([AxisExpr::from(vec![1]), AxisExpr::full()]))?;
//! println!("{:?}", instance_1.elements::<f64>()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Licence
//! `cfarray` is licensed under either of
//!  - the Apache License, Version 2.0 [LICENSE-APACHE](./LICENCE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license [LICENSE-MIT](./LICENCE-MIT) or <http://opensource.org/licenses/MIT>, at your option.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]

pub mod array;
pub mod array_index;
pub mod config;
pub mod metadata;
pub mod storage;
