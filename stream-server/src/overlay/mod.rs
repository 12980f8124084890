pub mod manager;

pub use manager::OverlayManager;
