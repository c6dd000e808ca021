//! # API Shared
//!
//! Shared wire types and services for the no-show APIs.
//!
//! Contains:
//! - Request/response messages (`messages` module), with serde and OpenAPI schemas
//! - Shared services like `HealthService`
//!
//! Used by `noshow-core` and `api-rest`.

pub mod health;
pub mod messages;

pub use health::HealthService;
pub use messages::*;
