// InferGuard Library - Public API

// Re-export error types
pub mod error;
pub use error::{GuardError, Result};

// Module declarations
pub mod commands;
pub mod core;
pub mod platform;
pub mod ui;

// Re-export commonly used types
pub use core::allocation::{
    AllocationChange, ResourceAllocation, ResourceManager, SystemMetrics, SystemMetricsProvider,
};
pub use core::config::Configuration;

// Initialize logging
pub fn init_logging() {
    init_logging_with(log::LevelFilter::Info);
}

/// Initialize logging at `level`; `RUST_LOG` still takes precedence
pub fn init_logging_with(level: log::LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}
