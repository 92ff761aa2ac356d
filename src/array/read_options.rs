use crate::config::global_config;

/// Options for reading an array.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    mask_empty_text: bool,
    single_instance_decompression: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        let config = global_config();
        Self {
            mask_empty_text: config.mask_empty_text(),
            single_instance_decompression: config.single_instance_decompression(),
        }
    }
}

impl ReadOptions {
    /// Create a new read options builder.
    #[must_use]
    pub fn builder() -> ReadOptionsBuilder {
        ReadOptionsBuilder::new()
    }

    /// Return true if empty collapsed text is masked.
    #[must_use]
    pub fn mask_empty_text(&self) -> bool {
        self.mask_empty_text
    }

    /// Set whether empty collapsed text is masked.
    pub fn set_mask_empty_text(&mut self, mask_empty_text: bool) {
        self.mask_empty_text = mask_empty_text;
    }

    /// Return true if single instance decompression of ragged arrays is enabled.
    #[must_use]
    pub fn single_instance_decompression(&self) -> bool {
        self.single_instance_decompression
    }

    /// Set whether single instance decompression of ragged arrays is enabled.
    pub fn set_single_instance_decompression(&mut self, single_instance_decompression: bool) {
        self.single_instance_decompression = single_instance_decompression;
    }
}

/// Builder for [`ReadOptions`].
#[derive(Debug, Clone)]
pub struct ReadOptionsBuilder {
    mask_empty_text: bool,
    single_instance_decompression: bool,
}

impl Default for ReadOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadOptionsBuilder {
    /// Create a new read options builder initialised from the [global configuration](crate::config::Config).
    #[must_use]
    pub fn new() -> Self {
        let config = global_config();
        Self {
            mask_empty_text: config.mask_empty_text(),
            single_instance_decompression: config.single_instance_decompression(),
        }
    }

    /// Build into read options.
    #[must_use]
    pub fn build(&self) -> ReadOptions {
        ReadOptions {
            mask_empty_text: self.mask_empty_text,
            single_instance_decompression: self.single_instance_decompression,
        }
    }

    /// Set whether empty collapsed text is masked.
    #[must_use]
    pub fn mask_empty_text(mut self, mask_empty_text: bool) -> Self {
        self.mask_empty_text = mask_empty_text;
        self
    }

    /// Set whether single instance decompression of ragged arrays is enabled.
    #[must_use]
    pub fn single_instance_decompression(mut self, single_instance_decompression: bool) -> Self {
        self.single_instance_decompression = single_instance_decompression;
        self
    }
}
