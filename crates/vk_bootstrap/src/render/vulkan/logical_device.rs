//! Logical device creation
//!
//! One queue is requested per distinct family among graphics and present.

use ash::{vk, Device, Instance};
use std::collections::BTreeSet;
use std::ffi::{c_char, CString};

use super::context::{VulkanError, VulkanResult};
use super::device_selection::{required_device_extensions, PhysicalDeviceCandidate, QueueCapability};

/// Logical device wrapper with RAII cleanup
pub struct LogicalDevice {
    /// Vulkan logical device handle
    pub device: Device,
    /// Graphics operations queue
    pub graphics_queue: vk::Queue,
    /// Surface presentation queue
    pub present_queue: vk::Queue,
    /// Index of the graphics queue family
    pub graphics_family: u32,
    /// Index of the presentation queue family
    pub present_family: u32,
}

impl LogicalDevice {
    /// Create a new logical device with required queues
    ///
    /// `layers` must be the layers enabled on the instance.
    pub fn new(instance: &Instance, physical_device: &PhysicalDeviceCandidate, layers: &[CString]) -> VulkanResult<Self> {
        let graphics_family = physical_device
            .queue_family(QueueCapability::Graphics)
            .ok_or_else(|| missing_queue(physical_device, "graphics"))?;
        let present_family = physical_device
            .present_family()
            .ok_or_else(|| missing_queue(physical_device, "present"))?;

        let queue_priorities = [1.0_f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families(graphics_family, present_family)
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
                    .build()
            })
            .collect();

        let extension_ptrs: Vec<*const c_char> = required_device_extensions()
            .iter()
            .map(|ext| ext.as_ptr())
            .collect();
        let layer_ptrs: Vec<*const c_char> = layers.iter().map(|layer| layer.as_ptr()).collect();
        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs)
            .enabled_features(&features);

        let device = unsafe { instance.create_device(physical_device.handle(), &create_info, None) }
            .map_err(VulkanError::DeviceCreation)?;

        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(present_family, 0) };

        log::info!(
            "Created logical device on {} (graphics family {}, present family {})",
            physical_device.name(),
            graphics_family,
            present_family
        );

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
            graphics_family,
            present_family,
        })
    }

    /// Block until the device has finished all submitted work
    pub fn wait_idle(&self) -> VulkanResult<()> {
        unsafe { self.device.device_wait_idle() }.map_err(VulkanError::Api)
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                log::warn!("device_wait_idle failed during shutdown: {:?}", e);
            }
            self.device.destroy_device(None);
        }
    }
}

fn missing_queue(physical_device: &PhysicalDeviceCandidate, kind: &str) -> VulkanError {
    VulkanError::InitializationFailed(format!("{} has no {} queue family", physical_device.name(), kind))
}

fn unique_families(graphics_family: u32, present_family: u32) -> BTreeSet<u32> {
    BTreeSet::from([graphics_family, present_family])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_family_requests_one_queue() {
        assert_eq!(unique_families(0, 0).into_iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_distinct_families_request_two_queues() {
        assert_eq!(unique_families(2, 1).into_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_missing_queue_names_the_device() {
        let candidate = PhysicalDeviceCandidate::builder(vk::PhysicalDevice::null())
            .name("Test GPU")
            .build();
        let error = missing_queue(&candidate, "graphics");
        assert_eq!(error.to_string(), "Initialization failed: Test GPU has no graphics queue family");
    }
}
