//! Startup banner listing instance extensions and layers

use ash::Entry;

use super::context::VulkanResult;
use super::instance::{available_extension_names, available_layer_names};

/// Log every instance extension and layer installed on the system
pub fn log_vulkan_banner(entry: &Entry) -> VulkanResult<()> {
    let extensions = available_extension_names(entry)?;
    let layers = available_layer_names(entry)?;

    for line in banner_lines(&extensions, &layers) {
        log::info!("{}", line);
    }
    Ok(())
}

fn banner_lines(extensions: &[String], layers: &[String]) -> Vec<String> {
    let mut lines = Vec::with_capacity(extensions.len() + layers.len() + 2);

    lines.push(format!("{} available extensions:", extensions.len()));
    lines.extend(extensions.iter().map(|name| format!("\t{}", name)));

    lines.push(format!("{} validation layers:", layers.len()));
    lines.extend(layers.iter().map(|name| format!("\t{}", name)));

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_layout() {
        let extensions = vec!["VK_KHR_surface".to_string(), "VK_EXT_debug_utils".to_string()];
        let layers = vec!["VK_LAYER_KHRONOS_validation".to_string()];

        assert_eq!(
            banner_lines(&extensions, &layers),
            vec![
                "2 available extensions:",
                "\tVK_KHR_surface",
                "\tVK_EXT_debug_utils",
                "1 validation layers:",
                "\tVK_LAYER_KHRONOS_validation",
            ]
        );
    }

    #[test]
    fn test_banner_with_nothing_installed() {
        assert_eq!(banner_lines(&[], &[]), vec!["0 available extensions:", "0 validation layers:"]);
    }
}
