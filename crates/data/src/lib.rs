//! Persistence for the trade desk.
//!
//! This crate provides:
//! - Database client for `PostgreSQL` with embedded migrations
//! - Data models for reports, pending spreads and filled orders
//! - Store traits the execution layer is written against
//! - Repositories implementing those traits over `sqlx`
//! - An in-memory store for tests and dry runs

pub mod database;
pub mod memory;
pub mod models;
pub mod repositories;
pub mod store;

// Re-export commonly used types
pub use database::DatabaseClient;
pub use memory::InMemoryStore;

// Re-export models
pub use models::{
    AssetClass, MarketReportRecord, NewOrderRecord, NewPendingSpread, OrderHistoryRecord,
    PendingSpreadRecord, PendingSpreadStatus, PendingSpreadUpdate,
};

// Re-export repositories
pub use repositories::{
    OrderHistoryRepository, PendingSpreadRepository, ReportRepository, Repositories,
};
pub use store::{OrderHistoryStore, PendingSpreadStore, ReportStore};
