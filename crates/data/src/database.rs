use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::repositories::Repositories;

/// Connection pool owner. Created once at the process boundary and closed on
/// shutdown.
#[derive(Debug, Clone)]
pub struct DatabaseClient {
    pool: PgPool,
}

impl DatabaseClient {
    /// Creates a new database client connected to the specified `PostgreSQL` database.
    ///
    /// # Errors
    /// Returns an error if the database connection cannot be established.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to database")?;
        Ok(Self { pool })
    }

    /// Applies embedded schema migrations.
    ///
    /// # Errors
    /// Returns an error if any migration fails.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to run database migrations")?;
        info!("Database migrations applied");
        Ok(())
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Builds every repository on top of this pool.
    #[must_use]
    pub fn repositories(&self) -> Repositories {
        Repositories::new(self.pool.clone())
    }

    /// Closes all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
