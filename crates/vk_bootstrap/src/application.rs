//! Application lifecycle
//!
//! Creates the window and the Vulkan context, then idles in the event loop
//! until the window is closed.

use thiserror::Error;

use crate::config::{BootstrapConfig, ConfigError};
use crate::render::vulkan::{VulkanContext, VulkanError, Window, WindowError};

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Window system error
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Vulkan setup error
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] VulkanError),
}

/// The hello triangle application
///
/// The Vulkan context is declared first so it is destroyed before the window.
pub struct HelloTriangleApp {
    context: VulkanContext,
    window: Window,
}

impl HelloTriangleApp {
    /// Validate the configuration and run every setup step
    pub fn new(config: &BootstrapConfig) -> Result<Self, AppError> {
        config.validate()?;

        log::info!("Creating window...");
        let mut window = Window::new(&config.window)?;

        log::info!("Initializing Vulkan...");
        let context = VulkanContext::new(&mut window, &config.vulkan)?;
        log::info!("Vulkan initialized on {}", context.physical_device.name());

        Ok(Self { context, window })
    }

    /// Poll window events until the window is closed
    pub fn run(&mut self) -> Result<(), AppError> {
        while !self.window.should_close() {
            self.window.poll_events();
        }

        log::info!("Window closed, shutting down");
        self.context.wait_idle()?;
        Ok(())
    }

    /// The Vulkan objects created during setup
    pub fn context(&self) -> &VulkanContext {
        &self.context
    }
}
