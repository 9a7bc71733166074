//! Physical device enumeration
//!
//! Queries the driver for every physical device and turns each one into a
//! [`PhysicalDeviceCandidate`] for the selector.

use ash::{vk, Instance};

use super::context::{VulkanError, VulkanResult};
use super::device_selection::{
    find_present_family, queue_family_indices, select_device, PhysicalDeviceCandidate,
};
use super::instance::raw_name;
use super::surface::Surface;

/// Snapshot every physical device visible to the instance
pub fn enumerate_candidates(instance: &Instance, surface: &Surface) -> VulkanResult<Vec<PhysicalDeviceCandidate>> {
    let devices = unsafe { instance.enumerate_physical_devices() }.map_err(VulkanError::Api)?;

    devices
        .into_iter()
        .map(|device| describe_device(instance, surface, device))
        .collect()
}

fn describe_device(
    instance: &Instance,
    surface: &Surface,
    device: vk::PhysicalDevice,
) -> VulkanResult<PhysicalDeviceCandidate> {
    let properties = unsafe { instance.get_physical_device_properties(device) };
    let features = unsafe { instance.get_physical_device_features(device) };
    let queue_families = unsafe { instance.get_physical_device_queue_family_properties(device) };

    let indices = queue_family_indices(&queue_families);
    let present_family = find_present_family(&indices, |family| surface.supports_present(device, family))?;

    let extensions = unsafe { instance.enumerate_device_extension_properties(device) }.map_err(VulkanError::Api)?;

    Ok(PhysicalDeviceCandidate::builder(device)
        .properties(&properties)
        .features(features)
        .queue_families(indices)
        .present_family(present_family)
        .extensions(extensions.iter().map(|ext| raw_name(&ext.extension_name)))
        .build())
}

/// Enumerate physical devices and pick the best one for the surface
pub fn select_physical_device(instance: &Instance, surface: &Surface) -> VulkanResult<PhysicalDeviceCandidate> {
    let candidates = enumerate_candidates(instance, surface)?;

    for candidate in &candidates {
        log::info!("{}", candidate);
    }

    let selected = select_device(candidates)?;
    log::info!("Selected GPU: {} (score {})", selected.name(), selected.score());
    Ok(selected)
}
