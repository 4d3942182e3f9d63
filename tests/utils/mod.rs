pub mod actions;
pub mod assertions;
pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use actions::TestClient;
#[allow(unused_imports)]
pub use mocks::FailingCaptureRepository;
#[allow(unused_imports)]
pub use setup::{TestHub, TestHubBuilder};
