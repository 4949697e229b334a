use chrono::{DateTime, Utc};
use indoc::formatdoc;
use retry_queue_job::JobRecord;
use sqlx::{query_as, PgExecutor};

use crate::errors::Result;

/// Reserves the next due job, oldest `available_at` first, then lowest id.
///
/// Selection and reservation happen in one statement. The candidate row is
/// locked with `skip locked`, so a concurrent caller moves on to another row
/// or gets nothing, it never reserves the same job.
#[tracing::instrument(skip_all, err, fields(otel.kind="client", db.system="postgresql"))]
pub async fn pop_job<'e>(
    executor: impl PgExecutor<'e>,
    escaped_schema: &str,
    now: DateTime<Utc>,
) -> Result<Option<JobRecord>> {
    let sql = formatdoc!(
        r#"
            with j as (
                select id
                    from {escaped_schema}.jobs
                    where reserved_at is null
                    and available_at <= $1::timestamptz
                    order by available_at asc, id asc
                    limit 1
                    for update
                    skip locked
            )
            update {escaped_schema}.jobs as jobs
                set reserved_at = $1::timestamptz
                from j
                where jobs.id = j.id
                returning jobs.*
        "#
    );

    let job = query_as(&sql).bind(now).fetch_optional(executor).await?;
    Ok(job)
}
