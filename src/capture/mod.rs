// Public API - what other modules can use
pub use models::CaptureModel;
pub use repository::{CaptureRepository, InMemoryCaptureRepository, MySqlCaptureRepository};

// Internal modules
mod models;
mod repository;
