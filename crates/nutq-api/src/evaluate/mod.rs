//! Evaluation endpoints: score a recognition result against a target word.

pub mod models;
pub mod routes;

pub use routes::routes;
