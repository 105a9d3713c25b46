pub mod model;

// Re-export commonly used types/functions for consumers (tests)
pub use model::{load_image, load_raw_bin, parse_image, raw_image, Image};
