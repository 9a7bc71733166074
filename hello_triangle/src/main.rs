//! Hello triangle bootstrap
//!
//! Opens a window, brings up Vulkan on the best available GPU and waits for
//! the window to close.
//!
//! Usage: `hello_triangle [CONFIG.toml|CONFIG.ron]`

use std::path::{Path, PathBuf};

use vk_bootstrap::prelude::*;

const DEFAULT_CONFIG_PATH: &str = "hello_triangle.toml";

fn main() {
    let config = match load_config(std::env::args_os().nth(1).map(PathBuf::from)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    logging::init(&config.log_level);

    if let Err(e) = run(&config) {
        log::error!("Startup failed: {}", e);
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}

fn run(config: &BootstrapConfig) -> Result<(), AppError> {
    let mut app = HelloTriangleApp::new(config)?;
    app.run()
}

/// An explicit path must load; the default path is optional
fn load_config(explicit: Option<PathBuf>) -> Result<BootstrapConfig, ConfigError> {
    match explicit {
        Some(path) => BootstrapConfig::load_from_file(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => BootstrapConfig::load_from_file(DEFAULT_CONFIG_PATH),
        None => Ok(BootstrapConfig::default()),
    }
}
