//! Postgres-backed repository implementations.

mod banners;
pub mod filter;
mod util;

pub use filter::FilterPlan;
pub use util::map_sqlx_error;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::{
    Postgres, Transaction,
    postgres::{PgConnectOptions, PgPool, PgPoolOptions},
    query,
};

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Open the shared pool. Every session carries a server-side
    /// `statement_timeout`, so a statement outlives neither its deadline nor
    /// an abandoned request.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        statement_timeout: Duration,
    ) -> Result<PgPool, sqlx::Error> {
        let options = PgConnectOptions::from_str(url)?.options([(
            "statement_timeout",
            statement_timeout.as_millis().to_string(),
        )]);

        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(statement_timeout)
            .connect_with(options)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }
}
