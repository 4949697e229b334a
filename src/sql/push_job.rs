use chrono::{DateTime, Utc};
use indoc::formatdoc;
use sqlx::{query_scalar, PgExecutor};
use tracing::info;

use crate::errors::Result;

/// Insert a new job, available from `available_at`
#[tracing::instrument(skip_all, err, fields(otel.kind="client", db.system="postgresql"))]
pub async fn push_job<'e>(
    executor: impl PgExecutor<'e>,
    escaped_schema: &str,
    payload: &[u8],
    available_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<i64> {
    let sql = formatdoc!(
        r#"
            insert into {escaped_schema}.jobs (job, attempts, reserved_at, available_at, created_at)
                values ($1::bytea, 0, null, $2::timestamptz, $3::timestamptz)
                returning id
        "#
    );

    let id: i64 = query_scalar(&sql)
        .bind(payload)
        .bind(available_at)
        .bind(now)
        .fetch_one(executor)
        .await?;

    info!(job_id = id, %available_at, "Job added to queue");

    Ok(id)
}
