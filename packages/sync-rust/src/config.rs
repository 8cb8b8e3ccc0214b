//! Controller configuration.

use std::time::Duration;

/// Settings shared by the controllers of one view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet period the list query must hold still before it is fetched.
    pub debounce: Duration,
    /// Rows per page when a list view mounts.
    pub default_page_size: u32,
    /// Request timeout of the HTTP remote.
    pub http_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            default_page_size: 12,
            http_timeout: Duration::from_secs(30),
        }
    }
}

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("default page size must be at least 1")]
    ZeroPageSize,
    #[error("debounce of {0:?} exceeds the 10s ceiling")]
    DebounceTooLong(Duration),
    #[error("http timeout must be non-zero")]
    ZeroHttpTimeout,
}

impl SyncConfig {
    /// Longest accepted debounce; anything above feels like a hung view.
    pub const MAX_DEBOUNCE: Duration = Duration::from_secs(10);

    /// Checks the values a user can set from the command line.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.debounce > Self::MAX_DEBOUNCE {
            return Err(ConfigError::DebounceTooLong(self.debounce));
        }
        if self.http_timeout.is_zero() {
            return Err(ConfigError::ZeroHttpTimeout);
        }
        Ok(())
    }
}
