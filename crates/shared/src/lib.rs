//! Billtrack Shared Types and Utilities
//!
//! Domain types, the database pool and the storage error shared by the
//! billing services and the API server.

pub mod db;
pub mod error;
pub mod types;

pub use db::*;
pub use error::*;
pub use types::*;
