//! Platform capabilities reported to the server
//!
//! `PlatformInfo` is created once by whoever performs platform introspection
//! and registered in the [`HandleRegistry`](crate::HandleRegistry).
//! Connection options only keep a weak reference to it.

use serde::{Deserialize, Serialize};

/// Description of the platform the client runs on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub platform_name: String,
    pub platform_version: Option<String>,
    pub hw_device_manufacturer: Option<String>,
    pub hw_device_model: Option<String>,
    pub hw_device_arch: String,
    pub sdk_version: String,
}

impl PlatformInfo {
    pub fn new(platform_name: impl Into<String>, hw_device_arch: impl Into<String>) -> Self {
        Self {
            platform_name: platform_name.into(),
            platform_version: None,
            hw_device_manufacturer: None,
            hw_device_model: None,
            hw_device_arch: hw_device_arch.into(),
            sdk_version: crate::VERSION.to_string(),
        }
    }

    /// Describe the current process from compile-time target information
    pub fn detect() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn with_platform_version(mut self, version: impl Into<String>) -> Self {
        self.platform_version = Some(version.into());
        self
    }

    pub fn with_device(mut self, manufacturer: impl Into<String>, model: impl Into<String>) -> Self {
        self.hw_device_manufacturer = Some(manufacturer.into());
        self.hw_device_model = Some(model.into());
        self
    }
}
