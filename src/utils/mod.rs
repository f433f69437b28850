//! Utility modules for cross-cutting concerns

pub mod fs;
pub mod security;
pub mod time;

// Re-export commonly used items
pub use fs::sanitize_filename;
pub use security::mask_key;
pub use time::format_duration;
