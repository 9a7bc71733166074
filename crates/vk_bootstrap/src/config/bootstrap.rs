//! # Bootstrap Configuration
//!
//! Settings for the window, the Vulkan instance and the logger. Every
//! section falls back to defaults, so a config file only needs the keys it
//! overrides.

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};

/// Name of the Khronos validation layer
pub const KHRONOS_VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// # Window Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Width in screen coordinates
    pub width: u32,
    /// Height in screen coordinates
    pub height: u32,
    /// Whether the user may resize the window
    pub resizable: bool,
}

impl WindowConfig {
    /// Create a window configuration with the given title and size
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            resizable: false,
        }
    }

    /// Allow or forbid resizing
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// Validate the window settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.title.is_empty() {
            return Err(ConfigError::Invalid("Window title cannot be empty".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "Window size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new("Vulkan", 800, 600)
    }
}

/// # Vulkan Configuration
///
/// Application metadata and debug features used when creating the instance
/// and the logical device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VulkanConfig {
    /// Application name reported to the driver
    pub application_name: String,
    /// Application version (major, minor, patch)
    pub application_version: (u32, u32, u32),
    /// Whether to enable validation layers; `None` follows the build type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_validation: Option<bool>,
    /// Layers requested when validation is enabled
    pub validation_layers: Vec<String>,
    /// Whether to log available instance extensions and layers at startup;
    /// `None` follows the build type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_banner: Option<bool>,
}

impl VulkanConfig {
    /// Create a Vulkan configuration for the named application
    pub fn new(application_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            application_version: (1, 0, 0),
            enable_validation: None,
            validation_layers: vec![KHRONOS_VALIDATION_LAYER.to_string()],
            print_banner: None,
        }
    }

    /// Set application version
    pub fn with_version(mut self, major: u32, minor: u32, patch: u32) -> Self {
        self.application_version = (major, minor, patch);
        self
    }

    /// Enable or disable validation layers
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Replace the requested validation layers
    pub fn with_validation_layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validation_layers = layers.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable the startup banner
    pub fn with_banner(mut self, enabled: bool) -> Self {
        self.print_banner = Some(enabled);
        self
    }

    /// Whether validation layers and the debug messenger are used
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Whether the startup banner is logged
    pub fn banner_enabled(&self) -> bool {
        self.print_banner.unwrap_or(cfg!(debug_assertions))
    }

    /// Validation layers to enable, empty when validation is off
    pub fn active_validation_layers(&self) -> &[String] {
        if self.validation_enabled() {
            &self.validation_layers
        } else {
            &[]
        }
    }

    /// Validate the Vulkan settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.is_empty() {
            return Err(ConfigError::Invalid("Application name cannot be empty".to_string()));
        }
        if self.validation_enabled() && self.validation_layers.is_empty() {
            return Err(ConfigError::Invalid(
                "Validation is enabled but no validation layers are listed".to_string(),
            ));
        }
        if let Some(layer) = self.validation_layers.iter().find(|layer| layer.contains('\0')) {
            return Err(ConfigError::Invalid(format!("Layer name {:?} contains a NUL byte", layer)));
        }
        Ok(())
    }
}

impl Default for VulkanConfig {
    fn default() -> Self {
        Self::new("Hello Triangle")
    }
}

/// # Complete Bootstrap Configuration
///
/// Top-level configuration loaded by the application binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
    /// Window settings
    pub window: WindowConfig,
    /// Vulkan settings
    pub vulkan: VulkanConfig,
}

impl BootstrapConfig {
    /// Set the default log filter
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Replace the window settings
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    /// Replace the Vulkan settings
    pub fn with_vulkan(mut self, vulkan: VulkanConfig) -> Self {
        self.vulkan = vulkan;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid("Log level cannot be empty".to_string()));
        }
        self.window.validate()?;
        self.vulkan.validate()
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            window: WindowConfig::default(),
            vulkan: VulkanConfig::default(),
        }
    }
}

impl Config for BootstrapConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BootstrapConfig::default();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert!(!config.window.resizable);
        assert_eq!(config.vulkan.application_name, "Hello Triangle");
        assert_eq!(config.vulkan.validation_layers, vec![KHRONOS_VALIDATION_LAYER.to_string()]);
        assert_eq!(config.vulkan.validation_enabled(), cfg!(debug_assertions));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_validation_flag_wins_over_build_type() {
        assert!(VulkanConfig::default().with_validation(true).validation_enabled());
        assert!(!VulkanConfig::default().with_validation(false).validation_enabled());
    }

    #[test]
    fn test_active_layers_follow_validation_flag() {
        let on = VulkanConfig::default().with_validation(true);
        assert_eq!(on.active_validation_layers().len(), 1);

        let off = VulkanConfig::default().with_validation(false);
        assert!(off.active_validation_layers().is_empty());
    }

    #[test]
    fn test_zero_sized_window_is_invalid() {
        let config = BootstrapConfig::default().with_window(WindowConfig::new("Vulkan", 0, 600));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validation_without_layers_is_invalid() {
        let vulkan = VulkanConfig::default()
            .with_validation(true)
            .with_validation_layers(Vec::<String>::new());
        assert!(vulkan.validate().is_err());

        let vulkan = vulkan.with_validation(false);
        assert!(vulkan.validate().is_ok());
    }

    #[test]
    fn test_layer_name_with_nul_is_invalid() {
        let vulkan = VulkanConfig::default().with_validation_layers(["VK_LAYER\0bad"]);
        assert!(vulkan.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: BootstrapConfig = toml::from_str(
            r#"
            [window]
            title = "Custom"

            [vulkan]
            enable_validation = true
            "#,
        )
        .unwrap();

        assert_eq!(config.window.title, "Custom");
        assert_eq!(config.window.width, 800);
        assert_eq!(config.log_level, "info");
        assert!(config.vulkan.validation_enabled());
        assert_eq!(config.vulkan.application_version, (1, 0, 0));
    }
}
