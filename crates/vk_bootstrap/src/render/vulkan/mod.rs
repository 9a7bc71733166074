//! Vulkan backend
//!
//! Window, instance, surface, device selection and logical device, created
//! in that order by [`VulkanContext::new`].

pub mod banner;
pub mod context;
pub mod device_selection;
pub mod instance;
pub mod logical_device;
pub mod physical_device;
pub mod surface;
pub mod window;

pub use context::{VulkanContext, VulkanError, VulkanResult};
pub use device_selection::{
    select_device, CandidateBuilder, Ineligibility, PhysicalDeviceCandidate, QueueCapability, SelectionError,
};
pub use instance::VulkanInstance;
pub use logical_device::LogicalDevice;
pub use surface::Surface;
pub use window::{Window, WindowError, WindowResult};
