//! Path-parameter credential gate for axum / tower, plus a small API server
//! that mounts it.
//!
//! The gate lives in [`middleware::path_auth`]; everything else is the host
//! application.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
