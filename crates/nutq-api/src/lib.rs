//! HTTP service for Nutq pronunciation evaluation
//!
//! Exposes the acceptance policy from `nutq-eval` over HTTP so that thin
//! clients can score a recognition result without embedding the rules.

pub mod config;
pub mod error;
pub mod evaluate;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod state;
pub mod tracing;
pub mod v1;

pub use config::ApiConfig;
pub use state::ApiState;
