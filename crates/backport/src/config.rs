//! Backport configuration
//!
//! Controls how the output package is produced: compression, verification of
//! the re-encoded bytecode, and durability of file destinations.

use modelport_archive::DEFAULT_COMPRESSION_LEVEL;

/// Lowest accepted zstd level
pub const MIN_COMPRESSION_LEVEL: i32 = 1;
/// Highest accepted zstd level
pub const MAX_COMPRESSION_LEVEL: i32 = 22;

/// Backport configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackportConfig {
    /// zstd level for the output package
    pub compression_level: i32,
    /// Decode the encoded bytecode records again before sealing
    pub verify_output: bool,
    /// fsync a file destination and its directory on commit
    pub sync_on_commit: bool,
}

impl Default for BackportConfig {
    fn default() -> Self {
        BackportConfig {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            verify_output: true,
            sync_on_commit: true,
        }
    }
}

impl BackportConfig {
    /// Create config for testing
    ///
    /// Skips fsync; keeps output verification on.
    pub fn for_testing() -> Self {
        BackportConfig {
            sync_on_commit: false,
            ..Default::default()
        }
    }

    /// Create config favoring output size over speed
    pub fn compact() -> Self {
        BackportConfig {
            compression_level: 19,
            ..Default::default()
        }
    }

    /// Set compression level
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Enable or disable output verification
    pub fn with_verify_output(mut self, verify: bool) -> Self {
        self.verify_output = verify;
        self
    }

    /// Enable or disable fsync on commit
    pub fn with_sync_on_commit(mut self, sync: bool) -> Self {
        self.sync_on_commit = sync;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_COMPRESSION_LEVEL..=MAX_COMPRESSION_LEVEL).contains(&self.compression_level) {
            return Err(ConfigError::InvalidCompressionLevel(self.compression_level));
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Compression level outside the accepted range
    #[error(
        "Invalid compression level {0}: must be between {} and {}",
        MIN_COMPRESSION_LEVEL,
        MAX_COMPRESSION_LEVEL
    )]
    InvalidCompressionLevel(i32),
}
