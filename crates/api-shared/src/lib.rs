//! # API Shared
//!
//! Shared request/response types for the MedInfo APIs.
//!
//! Contains:
//! - JSON wire types with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the CLI so both surfaces render the same shapes.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
