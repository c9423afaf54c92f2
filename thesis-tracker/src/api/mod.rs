//! HTTP API handlers for thesis-tracker

pub mod caller;
pub mod health;
pub mod progress;
pub mod theses;

pub use caller::Caller;
pub use health::health_routes;
pub use progress::progress_routes;
pub use theses::thesis_routes;
