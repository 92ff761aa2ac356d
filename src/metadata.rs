//! Compression metadata.
//!
//! A [`CompressionDescriptor`](crate::array::compression::CompressionDescriptor) is serialised as JSON with a name and a configuration.
//! For example:
//! ```json
//! {
//!     "name": "ragged_contiguous",
//!     "configuration": {
//!         "instance_axis": 0,
//!         "element_axis": 1,
//!         "spans": [{"start": 0, "end": 2}, {"start": 2, "end": 5}]
//!     }
//! }
//! ```

use derive_more::From;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Compression metadata, a name and a configuration.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompressionMetadata {
    name: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    configuration: MetadataConfiguration,
}

/// Configuration metadata.
pub type MetadataConfiguration = serde_json::Map<String, serde_json::Value>;

impl TryFrom<&str> for CompressionMetadata {
    type Error = serde_json::Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        serde_json::from_str(s)
    }
}

impl core::fmt::Display for CompressionMetadata {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} {}",
            self.name,
            serde_json::to_string(&self.configuration).unwrap_or_default()
        )
    }
}

impl CompressionMetadata {
    /// Create metadata from `name` and `configuration`.
    #[must_use]
    pub fn new_with_configuration(name: &str, configuration: MetadataConfiguration) -> Self {
        Self {
            name: name.into(),
            configuration,
        }
    }

    /// Convert a serializable configuration to [`CompressionMetadata`].
    ///
    /// # Errors
    /// Returns [`serde_json::Error`] if `configuration` cannot be serialised to a JSON object.
    pub fn new_with_serializable_configuration<TConfiguration: Serialize>(
        name: &str,
        configuration: &TConfiguration,
    ) -> Result<Self, serde_json::Error> {
        if let serde_json::Value::Object(configuration) = serde_json::to_value(configuration)? {
            Ok(Self::new_with_configuration(name, configuration))
        } else {
            Err(serde::ser::Error::custom(
                "the configuration cannot be serialized to a JSON struct",
            ))
        }
    }

    /// Try and convert the configuration to a deserializable type.
    ///
    /// # Errors
    /// Returns a [`ConfigurationInvalidError`] if the configuration cannot be converted.
    pub fn to_configuration<TConfiguration: DeserializeOwned>(
        &self,
    ) -> Result<TConfiguration, ConfigurationInvalidError> {
        let configuration = serde_json::Value::Object(self.configuration.clone());
        serde_json::from_value(configuration).map_err(|err| {
            ConfigurationInvalidError::new(self.name.clone(), self.configuration.clone(), err)
        })
    }

    /// Returns the metadata name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the metadata configuration.
    #[must_use]
    pub const fn configuration(&self) -> &MetadataConfiguration {
        &self.configuration
    }
}

/// An invalid configuration error.
#[derive(Debug, Error, From)]
#[error("invalid configuration for {name}: {source}, configuration: {configuration:?}")]
pub struct ConfigurationInvalidError {
    name: String,
    configuration: MetadataConfiguration,
    source: serde_json::Error,
}

impl ConfigurationInvalidError {
    /// Create a new invalid configuration error.
    #[must_use]
    pub fn new(
        name: String,
        configuration: MetadataConfiguration,
        source: serde_json::Error,
    ) -> Self {
        Self {
            name,
            configuration,
            source,
        }
    }

    /// Returns the name of the metadata with the invalid configuration.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
