//! Domain models for the Workshop Inventory Management Platform

pub mod history;
pub mod material;
pub mod product;
pub mod production;

pub use history::*;
pub use material::*;
pub use product::*;
pub use production::*;
