use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use sqlx::{Pool, Postgres};

pub type PgPool = Pool<Postgres>;

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Opens the pool and pings it, retrying with exponential backoff. The pool
/// is owned by whoever calls this; close it on shutdown.
pub async fn connect_pool(
    database_url: &str,
    max_connections: u32,
    attempts: u32,
) -> anyhow::Result<PgPool> {
    retry_with_backoff(attempts, INITIAL_RETRY_DELAY, move || async move {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .max_lifetime(Duration::from_secs(60 * 60))
            .connect(database_url)
            .await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok::<_, anyhow::Error>(pool)
    })
    .await
    .with_context(|| format!("failed to connect to database after {attempts} attempts"))
}

pub async fn ping(pool: &PgPool) -> bool {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .is_ok()
}

pub async fn retry_with_backoff<T, F, Fut>(
    attempts: u32,
    initial_delay: Duration,
    mut op: F,
) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let attempts = attempts.max(1);
    let mut delay = initial_delay;
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => return Err(err),
            Err(err) => {
                tracing::warn!(attempt, ?delay, error = ?err, "connect_attempt_failed_retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
        }
    }
}
