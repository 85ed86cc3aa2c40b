pub mod annotate;
pub mod backend;
pub mod classes;
pub mod config;
pub mod detector;
pub mod postprocessing;
pub mod preprocessing;

// Re-export commonly used types for convenience
pub use backend::InferenceBackend;
pub use config::DetectorConfig;
pub use detector::{Detector, DetectorError};
pub use postprocessing::{BoundingBox, Detection};
