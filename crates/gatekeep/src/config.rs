//! Controller configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AccessError, Result};
use crate::event::validate_location;

/// Location tag used when none is configured.
pub const DEFAULT_LOCATION: &str = "Main Entrance";

/// Persistent controller settings. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Location tag written into every access event.
    pub location: String,
    /// Default page size when listing identities.
    pub list_limit: usize,
    /// Default page size when listing recent events.
    pub event_limit: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            location: DEFAULT_LOCATION.to_string(),
            list_limit: 50,
            event_limit: 100,
        }
    }
}

impl ControllerConfig {
    /// Load from a JSON file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::StoreFault` if the file cannot be read or
    /// parsed, or `AccessError::InvalidArgument` if a value is out of range.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Write as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check every value is usable.
    pub fn validate(&self) -> Result<()> {
        validate_location(&self.location)?;
        if self.list_limit == 0 || self.event_limit == 0 {
            return Err(AccessError::InvalidArgument(
                "list limits must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
