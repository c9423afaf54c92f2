//! # Thesis Track Common Library
//!
//! Shared code for the thesis tracking service:
//! - Entity model (theses, lecturer assignments, progress reports, comments)
//! - Database schema and queries
//! - Workflow event types (ThesisEvent enum) and the EventBus
//! - Configuration loading
//! - Weighted progress scoring

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod scoring;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use scoring::{calculate_progress, ThesisProgress};
