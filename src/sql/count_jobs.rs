use sqlx::{query_scalar, PgExecutor};

use crate::errors::Result;

/// Pending jobs, reserved or not
pub async fn count_jobs<'e>(executor: impl PgExecutor<'e>, escaped_schema: &str) -> Result<i64> {
    let sql = format!("select count(*) from {escaped_schema}.jobs");
    Ok(query_scalar(&sql).fetch_one(executor).await?)
}

pub async fn count_failures<'e>(
    executor: impl PgExecutor<'e>,
    escaped_schema: &str,
) -> Result<i64> {
    let sql = format!("select count(*) from {escaped_schema}.failures");
    Ok(query_scalar(&sql).fetch_one(executor).await?)
}
