use chrono::{DateTime, Utc};
use indoc::formatdoc;
use retry_queue_job::FailureRecord;
use sqlx::{query_as, query_scalar, PgExecutor};

use crate::errors::Result;

/// Removes a pending job for good, handing back its stored payload.
///
/// With `reserved_at` set, the row is only taken while it still carries that
/// reservation. Meant to run inside the same transaction as [`insert_failure`].
pub async fn take_job<'e>(
    executor: impl PgExecutor<'e>,
    escaped_schema: &str,
    job_id: i64,
    reserved_at: Option<DateTime<Utc>>,
) -> Result<Option<Vec<u8>>> {
    let sql = formatdoc!(
        r#"
            delete from {escaped_schema}.jobs
                where id = $1::bigint
                and ($2::timestamptz is null or reserved_at = $2::timestamptz)
                returning job
        "#
    );

    let payload = query_scalar(&sql)
        .bind(job_id)
        .bind(reserved_at)
        .fetch_optional(executor)
        .await?;
    Ok(payload)
}

pub async fn insert_failure<'e>(
    executor: impl PgExecutor<'e>,
    escaped_schema: &str,
    job_id: i64,
    payload: &[u8],
    error: Option<&str>,
    failed_at: DateTime<Utc>,
) -> Result<FailureRecord> {
    let sql = formatdoc!(
        r#"
            insert into {escaped_schema}.failures (job_id, job, error, failed_at)
                values ($1::bigint, $2::bytea, $3::text, $4::timestamptz)
                returning *
        "#
    );

    let failure = query_as(&sql)
        .bind(job_id)
        .bind(payload)
        .bind(error)
        .bind(failed_at)
        .fetch_one(executor)
        .await?;
    Ok(failure)
}
