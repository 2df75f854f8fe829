//! HTTP handlers for the Workshop Inventory Management Platform

pub mod finished_product;
pub mod health;
pub mod history;
pub mod material;
pub mod product;
pub mod production;
pub mod receipt;

pub use finished_product::*;
pub use health::*;
pub use history::*;
pub use material::*;
pub use product::*;
pub use production::*;
pub use receipt::*;
