//! Vulkan context management
//!
//! Owns every Vulkan object the bootstrap creates, from the instance down
//! to the logical device and its queues.

use ash::{vk, Device, Entry, Instance};
use thiserror::Error;

use super::banner::log_vulkan_banner;
use super::device_selection::{PhysicalDeviceCandidate, SelectionError};
use super::instance::{load_entry, VulkanInstance};
use super::logical_device::LogicalDevice;
use super::physical_device::select_physical_device;
use super::surface::Surface;
use super::window::{Window, WindowError};
use crate::config::VulkanConfig;

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// The Vulkan library could not be loaded
    #[error("Failed to load Vulkan: {0}")]
    Loading(String),

    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Validation was requested but some layers are not installed
    #[error("validation layers requested, but not available: {missing:?}")]
    ValidationLayersUnavailable {
        /// Layers that could not be found
        missing: Vec<String>,
    },

    /// `vkCreateInstance` failed
    #[error("failed to create instance: {0:?}")]
    InstanceCreation(vk::Result),

    /// The debug messenger could not be registered
    #[error("failed to attach debug messenger: {0:?}")]
    DebugMessenger(vk::Result),

    /// The window surface could not be created
    #[error("failed to create window surface: {0}")]
    SurfaceCreation(String),

    /// No usable physical device
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// `vkCreateDevice` failed
    #[error("failed to create logical device: {0:?}")]
    DeviceCreation(vk::Result),

    /// A name passed to Vulkan contains an interior NUL byte
    #[error("Invalid name {0:?}: contains a NUL byte")]
    InvalidName(String),

    /// Windowing failure while talking to Vulkan
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Vulkan context initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

/// Main Vulkan context that owns all core Vulkan resources
///
/// Fields drop in declaration order: device, surface, then instance.
pub struct VulkanContext {
    /// Logical device and its queues
    pub device: LogicalDevice,
    /// Selected physical device
    pub physical_device: PhysicalDeviceCandidate,
    /// Vulkan surface for presentation
    pub surface: Surface,
    /// Vulkan instance and debug messenger
    pub instance: VulkanInstance,
}

impl VulkanContext {
    /// Create a new Vulkan context for the window
    pub fn new(window: &mut Window, config: &VulkanConfig) -> VulkanResult<Self> {
        let entry = load_entry()?;
        if config.banner_enabled() {
            log_vulkan_banner(&entry)?;
        }

        let instance = VulkanInstance::new(entry, window, config)?;
        if instance.has_debug_messenger() {
            log::debug!("Validation messages are routed to the logger");
        }
        let surface = Surface::new(&instance, window)?;
        let physical_device = select_physical_device(&instance.instance, &surface)?;
        let device = LogicalDevice::new(&instance.instance, &physical_device, instance.enabled_layers())?;

        Ok(Self {
            device,
            physical_device,
            surface,
            instance,
        })
    }

    /// Get a reference to the Vulkan entry
    pub fn entry(&self) -> &Entry {
        &self.instance.entry
    }

    /// Get a reference to the Vulkan instance
    pub fn instance(&self) -> &Instance {
        &self.instance.instance
    }

    /// Get the raw Device handle
    pub fn device(&self) -> &Device {
        &self.device.device
    }

    /// Get the graphics queue
    pub fn graphics_queue(&self) -> vk::Queue {
        self.device.graphics_queue
    }

    /// Get the present queue
    pub fn present_queue(&self) -> vk::Queue {
        self.device.present_queue
    }

    /// Wait for the device to finish all work
    pub fn wait_idle(&self) -> VulkanResult<()> {
        self.device.wait_idle()
    }
}
