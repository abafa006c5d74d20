//! HTTP handlers for the vision service.

pub mod health;
pub mod metrics;
pub mod predict;
pub mod text;

pub use health::{health_check, readiness_check};
pub use metrics::metrics;
pub use predict::predict;
pub use text::{compare, generate};

/// Provider used when a request does not name one.
pub const DEFAULT_MODEL: &str = "openai";
