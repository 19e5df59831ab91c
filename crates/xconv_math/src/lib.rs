// Re-export glam for convenience
pub use glam::*;

// Legacy matrix helpers
mod transform;
pub use transform::{format_fixed, DMat4Ext};
