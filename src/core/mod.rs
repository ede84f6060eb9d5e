// Core business logic module

pub mod allocation;
pub mod config;

// Re-export commonly used items
pub use allocation::{ResourceAllocation, ResourceManager, SystemMetrics, SystemMetricsProvider};
pub use config::{Configuration, ConfigStore, JsonConfigStore};
