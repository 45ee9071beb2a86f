//! Pixbin API server
//!
//! HTTP surface for the upload pipeline: rate limiting, multipart extraction,
//! validation, optimization, and storage, exposed under `/api/v0`.

pub mod api_doc;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod setup;
pub mod state;
pub mod telemetry;
pub mod utils;
