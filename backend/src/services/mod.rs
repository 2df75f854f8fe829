//! Business logic services for the Workshop Inventory Management Platform

pub mod finished_product;
pub mod history;
pub mod material;
pub mod product;
pub mod production;
pub mod receipt;
pub mod stock;

pub use finished_product::FinishedProductService;
pub use history::HistoryService;
pub use material::MaterialService;
pub use product::ProductService;
pub use production::ProductionService;
pub use receipt::ReceiptService;
pub use stock::StockService;
