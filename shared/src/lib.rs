//! Shared types and domain logic for the Workshop Inventory Management Platform
//!
//! This crate contains the domain models, the pure FIFO allocation and stock
//! ledger arithmetic, and validation helpers used by the backend.

pub mod allocation;
pub mod models;
pub mod types;
pub mod validation;

pub use allocation::*;
pub use models::*;
pub use types::*;
pub use validation::*;
