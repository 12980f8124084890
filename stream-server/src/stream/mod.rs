pub mod manager;
pub mod readiness;
pub mod registry;
pub mod store;


pub use manager::StreamManager;
pub use registry::ProcessRegistry;
pub use store::{JsonStreamStore, StreamStore};
