use chrono::{DateTime, Utc};
use indoc::formatdoc;
use sqlx::{query, PgExecutor};

use crate::errors::Result;

#[tracing::instrument(skip_all, err, fields(otel.kind="client", db.system="postgresql"))]
pub async fn delete_job<'e>(
    executor: impl PgExecutor<'e>,
    escaped_schema: &str,
    job_id: i64,
) -> Result<bool> {
    let sql = formatdoc!(
        r#"
            delete from {escaped_schema}.jobs
                where id = $1::bigint
        "#
    );

    let deleted = query(&sql)
        .bind(job_id)
        .execute(executor)
        .await?
        .rows_affected();

    Ok(deleted > 0)
}

/// Deletes a job only while it still carries the reservation `reserved_at`.
#[tracing::instrument(skip_all, err, fields(otel.kind="client", db.system="postgresql"))]
pub async fn delete_reserved_job<'e>(
    executor: impl PgExecutor<'e>,
    escaped_schema: &str,
    job_id: i64,
    reserved_at: DateTime<Utc>,
) -> Result<bool> {
    let sql = formatdoc!(
        r#"
            delete from {escaped_schema}.jobs
                where id = $1::bigint
                and reserved_at = $2::timestamptz
        "#
    );

    let deleted = query(&sql)
        .bind(job_id)
        .bind(reserved_at)
        .execute(executor)
        .await?
        .rows_affected();

    Ok(deleted > 0)
}
