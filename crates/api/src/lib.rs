//! Billtrack API Library
//!
//! HTTP surface of the bill tracker: routing, authentication, request
//! validation and error mapping over the billing services.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod security;
pub mod state;
pub mod validation;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
