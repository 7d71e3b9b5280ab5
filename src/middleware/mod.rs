//! HTTP middleware.
//!
//! Layers that run ahead of the route handlers. The only one here is the
//! session gate; request tracing comes from tower-http in `main`.

/// Session authentication middleware
pub mod auth;
