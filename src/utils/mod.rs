// Utility functions module
pub mod date_format;

// Re-export for easy access
pub use date_format::*;
