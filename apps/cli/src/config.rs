//! CLI configuration loading.

use keel_launcher::{LaunchResult, LauncherConfig};

/// Load and merge launcher configuration.
///
/// Configuration precedence:
/// 1. CLI arguments (handled by clap)
/// 2. Local config file (./.keelrc)
/// 3. Global config file (~/.keel/config.toml)
/// 4. Platform defaults
pub fn load_config() -> LaunchResult<LauncherConfig> {
    LauncherConfig::discover_and_load()
}
