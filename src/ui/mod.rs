// UI and formatting module

pub mod allocation_formatters;
pub mod formatters;

// Re-export commonly used items for cleaner imports
pub use allocation_formatters::{
    print_allocation, print_change, print_configuration, print_history, print_metrics,
    print_model_settings, print_recommendations,
};
pub use formatters::{format_percent, format_size, format_timestamp};
