use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;

use crate::{
    array_index::{extract, normalise, IndexExpr},
    storage::{global_file_registry, DatasetHandle, FileRegistry, VariableId},
};

use super::{ArrayError, ArrayShape, DataType, FillValue, LazyArray, MaskedArray, ReadOptions};

/// An array stored in one variable of a file.
///
/// The file is opened on the first read and shared, through a [`FileRegistry`], with every other array in the same file.
/// It stays open until the array is [closed](FileArray::close) or dropped, and the file itself is closed once no array refers to it.
///
/// Fixed-width text stored with a trailing character axis ([`DataType::Char`] data with one more axis than the array) is collapsed on read to [`DataType::FixedString`] data of the array shape.
/// The width of collapsed text is only known once read, so [`LazyArray::data_type`] reports the declared data type and not the data type of the collapsed text.
#[derive(Debug)]
pub struct FileArray {
    path: PathBuf,
    variable: VariableId,
    data_type: DataType,
    shape: ArrayShape,
    missing_value: Option<FillValue>,
    registry: Arc<FileRegistry>,
    handle: Mutex<Option<DatasetHandle>>,
}

impl Clone for FileArray {
    /// Clone the array, sharing its open file handle (if any).
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            variable: self.variable.clone(),
            data_type: self.data_type.clone(),
            shape: self.shape.clone(),
            missing_value: self.missing_value.clone(),
            registry: self.registry.clone(),
            handle: Mutex::new(self.handle.lock().clone()),
        }
    }
}

impl Drop for FileArray {
    fn drop(&mut self) {
        self.close();
    }
}

impl core::fmt::Display for FileArray {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}{:?} in {}",
            self.variable,
            self.shape,
            self.path.display()
        )
    }
}

impl FileArray {
    /// Create a new file array for `variable` of the file at `path`.
    ///
    /// The file is not opened.
    ///
    /// # Errors
    /// Returns [`ArrayError::IOUnavailable`] if `path` cannot be made absolute.
    pub fn new<P: AsRef<Path>>(
        path: P,
        variable: VariableId,
        data_type: DataType,
        shape: ArrayShape,
    ) -> Result<Self, ArrayError> {
        let path = path.as_ref();
        let path = std::path::absolute(path)
            .map_err(|err| ArrayError::IOUnavailable(path.to_path_buf(), err.into()))?;
        Ok(Self {
            path,
            variable,
            data_type,
            shape,
            missing_value: None,
            registry: global_file_registry(),
            handle: Mutex::new(None),
        })
    }

    /// Mask elements equal to `missing_value` on read.
    #[must_use]
    pub fn with_missing_value(mut self, missing_value: FillValue) -> Self {
        self.missing_value = Some(missing_value);
        self
    }

    /// Use `registry` rather than the [global file registry](global_file_registry).
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<FileRegistry>) -> Self {
        self.close();
        self.registry = registry;
        self
    }

    /// The absolute path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The variable identifier.
    #[must_use]
    pub const fn variable(&self) -> &VariableId {
        &self.variable
    }

    /// The missing value.
    #[must_use]
    pub const fn missing_value(&self) -> Option<&FillValue> {
        self.missing_value.as_ref()
    }

    /// The path of the file and the variable identifier.
    #[must_use]
    pub fn file_pointer(&self) -> (&Path, &VariableId) {
        (&self.path, &self.variable)
    }

    /// Open the file, returning its handle.
    ///
    /// An already open handle of the file is reused.
    ///
    /// # Errors
    /// Returns [`ArrayError::IOUnavailable`] if the file cannot be opened.
    pub fn open(&self) -> Result<DatasetHandle, ArrayError> {
        let mut handle = self.handle.lock();
        if let Some(handle) = handle.as_ref() {
            return Ok(handle.clone());
        }
        let dataset = self
            .registry
            .acquire(&self.path)
            .map_err(|err| ArrayError::IOUnavailable(self.path.clone(), err))?;
        *handle = Some(dataset.clone());
        Ok(dataset)
    }

    /// Release the interest of this array in its file.
    ///
    /// The file stays open while another array refers to it.
    /// Closing an array that is not open is a no-op.
    pub fn close(&self) {
        if let Some(handle) = self.handle.lock().take() {
            self.registry.release(handle);
        }
    }

    /// Returns true if the file handle of this array is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Returns true if no other array refers to the file handle of this array.
    ///
    /// An array that is not open is unique.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map_or(true, |handle| Arc::strong_count(handle) == 1)
    }
}

/// Collapse the trailing character axis of `chars`.
///
/// Each row of characters is concatenated, ignoring masked characters, and stripped of trailing NUL and ASCII whitespace.
fn collapse_text(chars: &MaskedArray, mask_empty_text: bool) -> Result<MaskedArray, ArrayError> {
    let Some((&num_chars, shape)) = chars.shape().split_last() else {
        return Err(ArrayError::ShapeMismatch(
            "text has no character axis".to_string(),
        ));
    };
    let num_chars = usize::try_from(num_chars).unwrap_or(usize::MAX);
    let num_rows: u64 = shape.iter().product();
    let num_rows = usize::try_from(num_rows).unwrap_or(usize::MAX);

    let rows: Vec<Option<Vec<u8>>> = (0..num_rows)
        .map(|row| {
            let range = row * num_chars..(row + 1) * num_chars;
            let bytes = &chars.bytes()[range.clone()];
            let mask = &chars.mask()[range];
            let mut text: Vec<u8> = std::iter::zip(bytes, mask)
                .filter_map(|(&byte, &masked)| (!masked).then_some(byte))
                .collect();
            while text
                .last()
                .is_some_and(|&byte| byte == 0 || byte.is_ascii_whitespace())
            {
                text.pop();
            }
            (!(text.is_empty() && mask_empty_text)).then_some(text)
        })
        .collect();

    let width = rows
        .iter()
        .flatten()
        .map(Vec::len)
        .max()
        .unwrap_or_default()
        .max(1);
    let mut bytes = vec![0; num_rows * width];
    for (element, text) in std::iter::zip(bytes.chunks_exact_mut(width), &rows) {
        if let Some(text) = text {
            element[..text.len()].copy_from_slice(text);
        }
    }
    let mask = rows.iter().map(Option::is_none).collect();
    MaskedArray::new(DataType::FixedString(width), shape.to_vec(), bytes, mask)
}

impl LazyArray for FileArray {
    fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The declared data type.
    ///
    /// Reads of text with a trailing character axis return [`DataType::FixedString`] data rather than this data type.
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn read_opt(
        &self,
        indices: &IndexExpr,
        options: &ReadOptions,
    ) -> Result<MaskedArray, ArrayError> {
        let index = normalise(&self.shape, indices)?;
        let dataset = self.open()?;
        let mut raw = dataset
            .read_variable(&self.variable, &self.data_type)?
            .ok_or_else(|| {
                ArrayError::VariableNotFound(self.variable.clone(), self.path.clone())
            })?;
        tracing::trace!("read {} with raw shape {:?}", self, raw.shape());
        if let Some(missing_value) = &self.missing_value {
            raw.mask_fill_value(missing_value);
        }

        if self.data_type.is_text() && raw.dimensionality() == self.shape.len() + 1 {
            let num_chars = raw.shape()[self.shape.len()];
            if raw.shape()[..self.shape.len()] != self.shape[..] {
                return Err(ArrayError::ShapeMismatch(format!(
                    "text of shape {:?} is incompatible with {}",
                    raw.shape(),
                    self
                )));
            }
            let chars = extract(&raw, &index.with_trailing_axis(num_chars), false)?;
            return collapse_text(&chars, options.mask_empty_text());
        }

        if raw.shape() != self.shape.as_slice() {
            // Scalars may be stored as a one element array
            if !self.shape.is_empty() || raw.num_elements() != 1 {
                return Err(ArrayError::ShapeMismatch(format!(
                    "stored shape {:?} is incompatible with {}",
                    raw.shape(),
                    self
                )));
            }
            raw = raw.reshape(self.shape.clone())?;
        }
        Ok(extract(&raw, &index, false)?.into_owned())
    }

    fn file(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn close(&self) {
        FileArray::close(self);
    }
}
