use std::{
    fs::File,
    path::{Path, PathBuf},
};

use ndarray_npy::NpzReader;
use parking_lot::Mutex;

use crate::array::{DataType, MaskedArray};

use super::{Dataset, StorageError, VariableId};

/// A `NumPy` `.npz` file.
///
/// Each `.npy` array of the archive is a variable, named without its `.npy` suffix.
/// The numeric id of a variable is its position in the archive.
///
/// Text is stored as `u8` with a trailing character axis.
/// Reads are serialised, as the underlying zip archive is not safe for concurrent reads.
pub struct NpzDataset {
    path: PathBuf,
    variables: Vec<(String, String)>,
    reader: Mutex<NpzReader<File>>,
}

impl core::fmt::Debug for NpzDataset {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NpzDataset")
            .field("path", &self.path)
            .field("variables", &self.variable_names())
            .finish_non_exhaustive()
    }
}

impl NpzDataset {
    /// Open the `.npz` file at `path`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the file does not exist or is not a valid `.npz` file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let mut reader = NpzReader::new(File::open(&path)?)?;
        let variables = reader
            .names()?
            .into_iter()
            .map(|name| {
                let variable = name.strip_suffix(".npy").unwrap_or(&name).to_string();
                (variable, name)
            })
            .collect();
        Ok(Self {
            path,
            variables,
            reader: Mutex::new(reader),
        })
    }
}

macro_rules! read_npz_variable {
    ($reader:expr, $name:expr, $index:expr, $t:ty, $data_type:expr) => {{
        let array: ndarray::ArrayD<$t> = match $name {
            Some(name) => $reader.by_name(name)?,
            None => $reader.by_index($index)?,
        };
        let shape = array.shape().iter().map(|&size| size as u64).collect();
        let elements: Vec<$t> = array.iter().copied().collect();
        MaskedArray::new_with_elements($data_type, shape, &elements)
            .map_err(|err| StorageError::Other(err.to_string()))?
    }};
}

impl Dataset for NpzDataset {
    fn path(&self) -> &Path {
        &self.path
    }

    fn variable_names(&self) -> Vec<String> {
        self.variables
            .iter()
            .map(|(variable, _)| variable.clone())
            .collect()
    }

    fn read_variable(
        &self,
        variable: &VariableId,
        data_type: &DataType,
    ) -> Result<Option<MaskedArray>, StorageError> {
        let (name, index) = match variable {
            VariableId::Name(name) => {
                match self.variables.iter().position(|(variable, _)| variable == name) {
                    Some(index) => (Some(self.variables[index].1.as_str()), index),
                    None => return Ok(None),
                }
            }
            VariableId::Id(id) if *id < self.variables.len() => (None, *id),
            VariableId::Id(_) => return Ok(None),
        };
        tracing::trace!("read {variable} ({data_type}) from {}", self.path.display());

        let mut reader = self.reader.lock();
        let array = match data_type {
            DataType::Bool => read_npz_variable!(reader, name, index, bool, DataType::Bool),
            DataType::Int8 => read_npz_variable!(reader, name, index, i8, DataType::Int8),
            DataType::Int16 => read_npz_variable!(reader, name, index, i16, DataType::Int16),
            DataType::Int32 => read_npz_variable!(reader, name, index, i32, DataType::Int32),
            DataType::Int64 => read_npz_variable!(reader, name, index, i64, DataType::Int64),
            DataType::UInt8 => read_npz_variable!(reader, name, index, u8, DataType::UInt8),
            DataType::UInt16 => read_npz_variable!(reader, name, index, u16, DataType::UInt16),
            DataType::UInt32 => read_npz_variable!(reader, name, index, u32, DataType::UInt32),
            DataType::UInt64 => read_npz_variable!(reader, name, index, u64, DataType::UInt64),
            DataType::Float32 => read_npz_variable!(reader, name, index, f32, DataType::Float32),
            DataType::Float64 => read_npz_variable!(reader, name, index, f64, DataType::Float64),
            DataType::Char | DataType::FixedString(_) => {
                read_npz_variable!(reader, name, index, u8, DataType::Char)
            }
        };
        Ok(Some(array))
    }
}

#[cfg(test)]
mod tests {
    use ndarray_npy::NpzWriter;

    use super::*;

    #[test]
    fn npz_dataset() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("dataset.npz");
        let mut npz = NpzWriter::new(File::create(&path)?);
        npz.add_array("lat", &ndarray::array![-10.0f64, 0.0, 10.0])?;
        npz.add_array("count", &ndarray::array![[1i32, 2], [3, 4]])?;
        npz.finish()?;

        let dataset = NpzDataset::open(&path)?;
        assert_eq!(dataset.path(), path);
        assert_eq!(dataset.variable_names(), vec!["lat", "count"]);

        let lat = dataset
            .read_variable(&VariableId::from("lat"), &DataType::Float64)?
            .unwrap();
        assert_eq!(lat.shape(), &[3]);
        assert_eq!(lat.elements::<f64>()?, vec![Some(-10.0), Some(0.0), Some(10.0)]);

        let count = dataset
            .read_variable(&VariableId::Id(1), &DataType::Int32)?
            .unwrap();
        assert_eq!(count.shape(), &[2, 2]);
        assert_eq!(count.elements::<i32>()?, vec![Some(1), Some(2), Some(3), Some(4)]);

        assert!(dataset
            .read_variable(&VariableId::from("lon"), &DataType::Float64)?
            .is_none());
        assert!(dataset
            .read_variable(&VariableId::Id(2), &DataType::Float64)?
            .is_none());
        assert!(dataset
            .read_variable(&VariableId::from("lat"), &DataType::Int32)
            .is_err());
        Ok(())
    }

    #[test]
    fn npz_dataset_unavailable() {
        assert!(NpzDataset::open("/nonexistent/dataset.npz").is_err());
    }
}
