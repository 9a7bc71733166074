//! Vulkan instance creation
//!
//! Owns the loader entry, the instance and, when validation is enabled, the
//! debug messenger that forwards validation messages to the logger.

use ash::extensions::ext::DebugUtils;
use ash::{vk, Entry, Instance};
use std::ffi::{c_char, CStr, CString};

use super::context::{VulkanError, VulkanResult};
use super::window::Window;
use crate::config::VulkanConfig;

const ENGINE_NAME: &str = "No Engine";

/// Load the Vulkan library
pub fn load_entry() -> VulkanResult<Entry> {
    unsafe { Entry::load() }.map_err(|e| VulkanError::Loading(e.to_string()))
}

/// Vulkan instance wrapper with RAII cleanup
pub struct VulkanInstance {
    /// Vulkan entry point
    pub entry: Entry,
    /// Vulkan instance handle
    pub instance: Instance,
    debug_messenger: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
    enabled_layers: Vec<CString>,
}

impl VulkanInstance {
    /// Create the instance
    ///
    /// With validation enabled the requested layers must all be present, the
    /// debug-utils extension is added and a debug messenger is attached.
    pub fn new(entry: Entry, window: &Window, config: &VulkanConfig) -> VulkanResult<Self> {
        let enable_validation = config.validation_enabled();

        let enabled_layers = to_cstrings(config.active_validation_layers())?;
        if enable_validation {
            let available = available_layer_names(&entry)?;
            let missing = missing_layers(config.active_validation_layers(), &available);
            if !missing.is_empty() {
                return Err(VulkanError::ValidationLayersUnavailable { missing });
            }
        }

        let app_name = to_cstring(&config.application_name)?;
        let engine_name = to_cstring(ENGINE_NAME)?;
        let (major, minor, patch) = config.application_version;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, major, minor, patch))
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let mut extensions = to_cstrings(&window.required_instance_extensions()?)?;
        if enable_validation {
            extensions.push(DebugUtils::name().to_owned());
        }
        log::debug!("Instance extensions: {:?}", extensions);

        let extension_ptrs: Vec<*const c_char> = extensions.iter().map(|ext| ext.as_ptr()).collect();
        let layer_ptrs: Vec<*const c_char> = enabled_layers.iter().map(|layer| layer.as_ptr()).collect();

        // Chained into the create info so instance creation itself is validated.
        let mut messenger_info = debug_messenger_create_info();
        let mut create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);
        if enable_validation {
            create_info = create_info.push_next(&mut messenger_info);
        }

        let instance = unsafe { entry.create_instance(&create_info, None) }
            .map_err(VulkanError::InstanceCreation)?;

        let debug_messenger = if enable_validation {
            let debug_utils = DebugUtils::new(&entry, &instance);
            match unsafe { debug_utils.create_debug_utils_messenger(&messenger_info, None) } {
                Ok(messenger) => Some((debug_utils, messenger)),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(VulkanError::DebugMessenger(e));
                }
            }
        } else {
            None
        };

        log::info!(
            "Created Vulkan instance for \"{}\" (validation {})",
            config.application_name,
            if enable_validation { "on" } else { "off" }
        );

        Ok(Self {
            entry,
            instance,
            debug_messenger,
            enabled_layers,
        })
    }

    /// Layers enabled on the instance, also passed to the logical device
    pub fn enabled_layers(&self) -> &[CString] {
        &self.enabled_layers
    }

    /// Whether a debug messenger is attached
    pub fn has_debug_messenger(&self) -> bool {
        self.debug_messenger.is_some()
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some((debug_utils, messenger)) = self.debug_messenger.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

fn debug_messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback))
        .build()
}

/// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = if callback_data.is_null() || (*callback_data).p_message.is_null() {
        "<no message>".into()
    } else {
        CStr::from_ptr((*callback_data).p_message).to_string_lossy()
    };

    if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        log::error!("validation layer: {:?} - {}", message_type, message);
    } else if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        log::warn!("validation layer: {:?} - {}", message_type, message);
    } else {
        log::debug!("validation layer: {:?} - {}", message_type, message);
    }

    vk::FALSE
}

/// Names of the instance layers installed on this system
pub fn available_layer_names(entry: &Entry) -> VulkanResult<Vec<String>> {
    let layers = entry.enumerate_instance_layer_properties().map_err(VulkanError::Api)?;
    Ok(layers.iter().map(|layer| raw_name(&layer.layer_name)).collect())
}

/// Names of the instance extensions installed on this system
pub fn available_extension_names(entry: &Entry) -> VulkanResult<Vec<String>> {
    let extensions = entry
        .enumerate_instance_extension_properties(None)
        .map_err(VulkanError::Api)?;
    Ok(extensions.iter().map(|ext| raw_name(&ext.extension_name)).collect())
}

/// Requested layers that are not in `available`, in request order
pub fn missing_layers(requested: &[String], available: &[String]) -> Vec<String> {
    requested
        .iter()
        .filter(|layer| !available.contains(layer))
        .cloned()
        .collect()
}

/// Convert a fixed size, NUL terminated name array filled by the driver
pub(crate) fn raw_name(raw: &[c_char]) -> String {
    // SAFETY: Vulkan name arrays are always NUL terminated within their bounds
    unsafe { CStr::from_ptr(raw.as_ptr()) }.to_string_lossy().into_owned()
}

fn to_cstring(value: &str) -> VulkanResult<CString> {
    CString::new(value).map_err(|_| VulkanError::InvalidName(value.to_string()))
}

fn to_cstrings(values: &[String]) -> VulkanResult<Vec<CString>> {
    values.iter().map(|value| to_cstring(value)).collect()
}
