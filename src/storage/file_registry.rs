use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock, Weak},
};

use parking_lot::Mutex;

use super::{Dataset, NpzDataset, StorageError};

/// A shared handle to an open [`Dataset`].
///
/// Every clone of a handle is a referrer of the open file.
pub type DatasetHandle = Arc<dyn Dataset>;

/// A function opening the dataset at a path.
///
/// The [`Dataset::path`] of the opened dataset must be the path it was opened from.
pub type DatasetOpener =
    Box<dyn Fn(&Path) -> Result<DatasetHandle, StorageError> + Send + Sync + 'static>;

/// A registry of open datasets keyed by path.
///
/// Acquiring a dataset that is already open returns the open handle rather than reopening the file.
/// Acquisition and release are mutually exclusive per path, while reads through an acquired handle do not hold the lock of its path.
///
/// The registry only holds weak references, so a file is closed once it has no referrers.
pub struct FileRegistry {
    opener: DatasetOpener,
    datasets: Mutex<HashMap<PathBuf, Weak<dyn Dataset>>>,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl core::fmt::Debug for FileRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FileRegistry")
            .field("open", &self.open_paths())
            .finish_non_exhaustive()
    }
}

impl Default for FileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FileRegistry {
    /// Create a new file registry opening [`NpzDataset`]s.
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_opener(Box::new(|path| {
            Ok(Arc::new(NpzDataset::open(path)?) as DatasetHandle)
        }))
    }

    /// Create a new file registry with a custom dataset `opener`.
    #[must_use]
    pub fn new_with_opener(opener: DatasetOpener) -> Self {
        Self {
            opener,
            datasets: Mutex::default(),
            locks: Mutex::default(),
        }
    }

    fn path_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .clone()
    }

    /// Remove the lock of `path` if only the map and `lock` refer to it.
    fn drop_path_lock(&self, path: &Path, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock();
        if Arc::strong_count(lock) == 2
            && locks.get(path).is_some_and(|entry| Arc::ptr_eq(entry, lock))
        {
            locks.remove(path);
        }
    }

    /// Acquire a handle to the dataset at `path`, opening it if it is not already open.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the dataset is not open and cannot be opened.
    pub fn acquire(&self, path: &Path) -> Result<DatasetHandle, StorageError> {
        let lock = self.path_lock(path);
        let dataset = {
            let _guard = lock.lock();
            self.acquire_locked(path)
        };
        self.drop_path_lock(path, &lock);
        dataset
    }

    fn acquire_locked(&self, path: &Path) -> Result<DatasetHandle, StorageError> {
        let open = self.datasets.lock().get(path).and_then(Weak::upgrade);
        if let Some(dataset) = open {
            tracing::debug!("reusing open dataset {}", path.display());
            return Ok(dataset);
        }

        let dataset = (self.opener)(path)?;
        let mut datasets = self.datasets.lock();
        // Handles dropped without a release leave dead entries behind
        datasets.retain(|_, entry| entry.strong_count() > 0);
        datasets.insert(path.to_path_buf(), Arc::downgrade(&dataset));
        tracing::debug!("opened dataset {}", path.display());
        Ok(dataset)
    }

    /// Release a handle to a dataset.
    ///
    /// The dataset is closed if `handle` was its last referrer.
    pub fn release(&self, handle: DatasetHandle) {
        let path = handle.path().to_path_buf();
        let lock = self.path_lock(&path);
        {
            let _guard = lock.lock();
            let last = Arc::strong_count(&handle) == 1;
            drop(handle);
            if last {
                let mut datasets = self.datasets.lock();
                if datasets
                    .get(&path)
                    .is_some_and(|dataset| dataset.strong_count() == 0)
                {
                    datasets.remove(&path);
                    tracing::debug!("closed dataset {}", path.display());
                }
            }
        }
        self.drop_path_lock(&path, &lock);
    }

    /// Returns true if the dataset at `path` is open.
    #[must_use]
    pub fn is_open(&self, path: &Path) -> bool {
        self.datasets
            .lock()
            .get(path)
            .is_some_and(|dataset| dataset.strong_count() > 0)
    }

    /// Return the number of open datasets.
    #[must_use]
    pub fn num_open(&self) -> usize {
        self.datasets
            .lock()
            .values()
            .filter(|dataset| dataset.strong_count() > 0)
            .count()
    }

    fn open_paths(&self) -> Vec<PathBuf> {
        self.datasets
            .lock()
            .iter()
            .filter(|(_, dataset)| dataset.strong_count() > 0)
            .map(|(path, _)| path.clone())
            .collect()
    }
}

static FILE_REGISTRY: OnceLock<Arc<FileRegistry>> = OnceLock::new();

/// Returns the process-wide file registry.
pub fn global_file_registry() -> Arc<FileRegistry> {
    FILE_REGISTRY
        .get_or_init(|| Arc::new(FileRegistry::new()))
        .clone()
}
