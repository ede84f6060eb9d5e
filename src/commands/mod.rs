// Command handlers module
pub mod check;
pub mod config;
pub mod monitor;
pub mod status;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::allocation::ResourceManager;
use crate::core::config::{load_or_default, Configuration, JsonConfigStore};
use crate::platform::SysinfoMetricsProvider;

// Re-exports for cleaner imports
pub use check::execute as check;
pub use monitor::execute as monitor;
pub use status::execute as status;

/// Open the persisted configuration store
pub fn open_store() -> Result<JsonConfigStore> {
    JsonConfigStore::default_location().context("Failed to locate configuration directory")
}

/// Build an engine on the platform provider and the persisted configuration
pub fn build_manager() -> Result<ResourceManager> {
    let store = open_store()?;
    let config = load_or_default(&store);
    Ok(build_manager_with(store, config))
}

/// Build an engine with an explicit configuration
pub fn build_manager_with(store: JsonConfigStore, config: Configuration) -> ResourceManager {
    let provider = Arc::new(SysinfoMetricsProvider::new());
    ResourceManager::with_configuration(provider, Arc::new(store), config)
}
