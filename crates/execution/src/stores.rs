//! Store handles injected into the runners.

use std::sync::Arc;

use trade_desk_data::{
    InMemoryStore, OrderHistoryStore, PendingSpreadStore, ReportStore, Repositories,
};

/// The three persistence seams a run touches.
#[derive(Clone)]
pub struct Stores {
    pub reports: Arc<dyn ReportStore>,
    pub pending: Arc<dyn PendingSpreadStore>,
    pub orders: Arc<dyn OrderHistoryStore>,
}

impl Stores {
    /// Postgres-backed stores.
    #[must_use]
    pub fn from_repositories(repos: Repositories) -> Self {
        Self {
            reports: Arc::new(repos.reports),
            pending: Arc::new(repos.pending_spreads),
            orders: Arc::new(repos.order_history),
        }
    }

    /// Every seam backed by one shared in-memory store.
    #[must_use]
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            reports: store.clone(),
            pending: store.clone(),
            orders: store,
        }
    }
}
