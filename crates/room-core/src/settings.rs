//! Caller-side settings
//!
//! `RoomSettings` holds the defaults an application applies to every
//! connection: whether insights are on, which ICE servers to use and how to
//! log. It is usually loaded from a TOML file:
//!
//! ```toml
//! insights_enabled = false
//!
//! [logging]
//! level = "debug"
//! json = true
//!
//! [ice]
//! transport_policy = "all"
//!
//! [[ice.servers]]
//! urls = ["stun:stun.example.com:3478"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RoomError, RoomResult};
use crate::ice::IceOptions;
use crate::logging::{parse_log_level, setup_logging};

/// Logging section of [`RoomSettings`]
///
/// `level` is a `tracing` level name; `log_spans` adds span open/close
/// events to the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
    pub file_info: bool,
    pub log_spans: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_info: false,
            log_spans: false,
        }
    }
}

impl LoggingSettings {
    /// Install these settings as the process-wide subscriber
    pub fn install(&self) -> RoomResult<()> {
        setup_logging(self)
    }
}

/// Application defaults applied to connections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomSettings {
    /// Default for `ConnectOptionsBuilder::enable_insights`
    pub insights_enabled: bool,
    /// Default ICE options, if any
    pub ice: Option<IceOptions>,
    pub logging: LoggingSettings,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            insights_enabled: true,
            ice: None,
            logging: LoggingSettings::default(),
        }
    }
}

impl RoomSettings {
    /// Parse settings from TOML text
    pub fn from_toml_str(text: &str) -> RoomResult<Self> {
        let settings: RoomSettings = toml::from_str(text)?;
        parse_log_level(&settings.logging.level)?;
        Ok(settings)
    }

    /// Read settings from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> RoomResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RoomError::configuration(format!("failed to read {}: {}", path.display(), e)))?;
        let settings = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), "Loaded room settings");
        Ok(settings)
    }

    pub fn with_insights(mut self, enabled: bool) -> Self {
        self.insights_enabled = enabled;
        self
    }

    pub fn with_ice(mut self, ice: IceOptions) -> Self {
        self.ice = Some(ice);
        self
    }

    pub fn with_logging(mut self, logging: LoggingSettings) -> Self {
        self.logging = logging;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ice::IceTransportPolicy;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_document_gives_defaults() {
        let settings = RoomSettings::from_toml_str("").unwrap();
        assert_eq!(settings, RoomSettings::default());
        assert!(settings.insights_enabled);
    }

    #[test]
    fn test_full_document() {
        let settings = RoomSettings::from_toml_str(
            r#"
            insights_enabled = false

            [logging]
            level = "debug"
            json = true

            [ice]
            transport_policy = "all"

            [[ice.servers]]
            urls = ["stun:stun.example.com:3478"]
            "#,
        )
        .unwrap();

        assert!(!settings.insights_enabled);
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.json);
        let ice = settings.ice.unwrap();
        assert_eq!(ice.transport_policy(), IceTransportPolicy::All);
        assert_eq!(ice.servers()[0].urls, vec!["stun:stun.example.com:3478".to_string()]);
    }

    #[test]
    fn test_invalid_ice_is_configuration_error() {
        let result = RoomSettings::from_toml_str(
            r#"
            [[ice.servers]]
            urls = ["turn:turn.example.com"]
            "#,
        );
        assert!(matches!(result, Err(RoomError::Configuration { .. })));
    }

    #[test]
    fn test_invalid_log_level() {
        let result = RoomSettings::from_toml_str("[logging]\nlevel = \"chatty\"\n");
        assert!(matches!(result, Err(RoomError::Configuration { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = RoomSettings::from_file("/nonexistent/confab/settings.toml");
        assert!(matches!(result, Err(RoomError::Configuration { .. })));
    }
}
