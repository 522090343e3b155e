//! Sarwatch API Library
//!
//! Read-only HTTP API over the event/product catalog.

mod handlers;
mod telemetry;

pub mod error;
pub mod setup;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
pub use telemetry::init_tracing;
