//! Database models for the Workshop Inventory Management Platform
//!
//! Re-exports models from the shared crate and adds backend-specific models

pub use shared::models::*;
