//! Cfarray global configuration options.

use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Global configuration options for the cfarray crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// ## Mask Empty Text
///  > default: [`true`]
///
/// If enabled, fixed-width text read from a file whose characters reduce to the empty string (after trailing padding is stripped) is masked.
/// Otherwise it is kept as an empty string.
///
/// ## Single Instance Decompression
///  > default: [`true`]
///
/// If enabled, reading a ragged array with an index that selects exactly one instance only places the data of that instance before the subspace is extracted.
/// The result is identical to decompressing all instances.
#[derive(Debug)]
pub struct Config {
    mask_empty_text: bool,
    single_instance_decompression: bool,
}

#[allow(clippy::derivable_impls)]
impl Default for Config {
    fn default() -> Self {
        Config {
            mask_empty_text: true,
            single_instance_decompression: true,
        }
    }
}

impl Config {
    /// Get the [mask empty text](#mask-empty-text) configuration.
    #[must_use]
    pub fn mask_empty_text(&self) -> bool {
        self.mask_empty_text
    }

    /// Set the [mask empty text](#mask-empty-text) configuration.
    pub fn set_mask_empty_text(&mut self, mask_empty_text: bool) {
        self.mask_empty_text = mask_empty_text;
    }

    /// Get the [single instance decompression](#single-instance-decompression) configuration.
    #[must_use]
    pub fn single_instance_decompression(&self) -> bool {
        self.single_instance_decompression
    }

    /// Set the [single instance decompression](#single-instance-decompression) configuration.
    pub fn set_single_instance_decompression(&mut self, single_instance_decompression: bool) {
        self.single_instance_decompression = single_instance_decompression;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global cfarray configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global cfarray configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}
