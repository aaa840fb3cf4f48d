use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

pub mod badges;
pub mod points;
pub mod profiles;
pub mod referrals;
pub mod stats;
pub mod supporters;
pub mod trial_alerts;
pub mod votes;
pub mod wishes;

/// Builds the pool without opening a connection; the first query connects.
pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_lazy(database_url)
}

pub async fn check_ready(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
