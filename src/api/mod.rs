//! HTTP API handlers for omnitool

pub mod health;
pub mod query;

pub use health::health_routes;
pub use query::{handle_get, handle_post};
