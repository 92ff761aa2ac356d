use std::sync::Arc;

use crate::array_index::{extract, normalise, IndexExpr};

use super::{ArrayError, DataType, LazyArray, MaskedArray, ReadOptions};

/// An array backed by a resident [`MaskedArray`].
///
/// Clones share the backing buffer.
#[derive(Clone, Debug)]
pub struct InMemoryArray {
    array: Arc<MaskedArray>,
}

impl InMemoryArray {
    /// Create a new in-memory array.
    #[must_use]
    pub fn new(array: MaskedArray) -> Self {
        Self {
            array: Arc::new(array),
        }
    }

    /// The backing buffer.
    #[must_use]
    pub fn array(&self) -> &MaskedArray {
        &self.array
    }

    /// Returns true if no clone of this array shares its backing buffer.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.array) == 1
    }
}

impl From<MaskedArray> for InMemoryArray {
    fn from(array: MaskedArray) -> Self {
        Self::new(array)
    }
}

impl LazyArray for InMemoryArray {
    fn shape(&self) -> &[u64] {
        self.array.shape()
    }

    fn data_type(&self) -> &DataType {
        self.array.data_type()
    }

    fn read_opt(
        &self,
        indices: &IndexExpr,
        _options: &ReadOptions,
    ) -> Result<MaskedArray, ArrayError> {
        let index = normalise(self.shape(), indices)?;
        Ok(extract(&self.array, &index, true)?.into_owned())
    }
}
