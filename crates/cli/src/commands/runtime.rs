//! Process-boundary wiring: database pool, brokerage client and the desk.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use trade_desk_alpaca::{AlpacaClient, AlpacaClientConfig};
use trade_desk_core::AppConfig;
use trade_desk_data::DatabaseClient;
use trade_desk_execution::{Stores, TradeDesk};

/// Connected clients for one process. Call [`Runtime::shutdown`] before exit.
pub struct Runtime {
    pub config: AppConfig,
    pub desk: Arc<TradeDesk>,
    database: DatabaseClient,
}

impl Runtime {
    /// Connects to the database, applies migrations and builds the desk.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable, migrations fail or
    /// brokerage credentials are missing.
    pub async fn connect(config: AppConfig) -> Result<Self> {
        let database = DatabaseClient::new(&config.database.url, config.database.max_connections)
            .await
            .context("Failed to connect to database")?;
        database
            .run_migrations()
            .await
            .context("Failed to run migrations")?;
        info!("Connected to database");

        let broker = AlpacaClient::new(AlpacaClientConfig::from_broker_config(&config.broker))
            .context("Failed to create brokerage client")?;
        info!(trading_url = %broker.trading_url(), "Brokerage client ready");

        let desk = TradeDesk::new(
            Arc::new(broker),
            Stores::from_repositories(database.repositories()),
            &config,
        );

        Ok(Self {
            config,
            desk: Arc::new(desk),
            database,
        })
    }

    pub async fn shutdown(self) {
        self.database.close().await;
        info!("Database connections closed");
    }
}
