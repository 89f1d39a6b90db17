//! Database repositories for the trade desk.
//!
//! Each repository provides typed access to a single table and implements
//! the matching trait from [`crate::store`].

pub mod order_history_repo;
pub mod pending_spread_repo;
pub mod report_repo;

pub use order_history_repo::OrderHistoryRepository;
pub use pending_spread_repo::PendingSpreadRepository;
pub use report_repo::ReportRepository;

use sqlx::PgPool;

/// Creates all repositories from a single database pool.
#[derive(Debug, Clone)]
pub struct Repositories {
    pub reports: ReportRepository,
    pub pending_spreads: PendingSpreadRepository,
    pub order_history: OrderHistoryRepository,
}

impl Repositories {
    /// Creates a new set of repositories from a database pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            reports: ReportRepository::new(pool.clone()),
            pending_spreads: PendingSpreadRepository::new(pool.clone()),
            order_history: OrderHistoryRepository::new(pool),
        }
    }
}
