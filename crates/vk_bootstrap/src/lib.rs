//! # vk_bootstrap
//!
//! The setup every Vulkan program starts with: a GLFW window, an instance
//! with optional validation, a presentation surface, the best physical
//! device for that surface, and a logical device with graphics and present
//! queues.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vk_bootstrap::prelude::*;
//!
//! fn main() -> Result<(), AppError> {
//!     let config = BootstrapConfig::default();
//!     logging::init(&config.log_level);
//!     let mut app = HelloTriangleApp::new(&config)?;
//!     app.run()
//! }
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod foundation;
pub mod render;

mod application;

pub use application::{AppError, HelloTriangleApp};

/// Common imports for bootstrap users
pub mod prelude {
    pub use crate::{
        config::{BootstrapConfig, Config, ConfigError, VulkanConfig, WindowConfig},
        foundation::logging,
        render::vulkan::{
            PhysicalDeviceCandidate, QueueCapability, SelectionError, VulkanContext, VulkanError, Window,
            WindowError,
        },
        AppError, HelloTriangleApp,
    };
}
