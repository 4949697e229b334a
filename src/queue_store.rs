use std::sync::Arc;
use std::time::Duration;

use getset::Getters;
use retry_queue_job::JobRecord;
use sqlx::PgPool;
use tracing::{debug, error};

use crate::clock::Clock;
use crate::codec::PayloadCodec;
use crate::errors::{QueueError, Result};
use crate::sql::{
    count_jobs::count_jobs,
    delete_job::{delete_job, delete_reserved_job},
    get_job::get_job,
    pop_job::pop_job,
    push_job::push_job,
    reclaim_jobs::reclaim_expired_jobs,
    release_job::release_job,
};

/// Durable storage of pending jobs.
///
/// Every method is safe to call from any number of processes sharing the
/// same database. Mutual exclusion is left entirely to Postgres.
#[derive(Clone, Getters, Debug)]
pub struct QueueStore {
    /// Database connection pool
    #[getset(get = "pub")]
    pg_pool: PgPool,

    /// SQL-escaped schema name holding the `jobs` table
    #[getset(get = "pub")]
    escaped_schema: String,

    clock: Arc<dyn Clock>,
}

impl QueueStore {
    pub fn new(pg_pool: PgPool, escaped_schema: String, clock: Arc<dyn Clock>) -> Self {
        Self {
            pg_pool,
            escaped_schema,
            clock,
        }
    }

    /// Enqueues a payload, claimable once `delay` has elapsed.
    ///
    /// A rejected write is an expected outcome here: it is logged and reported
    /// as `None`. Use [`try_push`](Self::try_push) to get the cause.
    pub async fn push(&self, payload: &[u8], delay: Duration) -> Option<i64> {
        match self.try_push(payload, delay).await {
            Ok(id) => Some(id),
            Err(e) => {
                error!(error = %e, "Could not add job to queue");
                None
            }
        }
    }

    pub async fn try_push(&self, payload: &[u8], delay: Duration) -> Result<i64> {
        let now = self.clock.now();
        let available_at = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|delay| now.checked_add_signed(delay))
            .ok_or(QueueError::InvalidDelay(delay))?;

        push_job(
            &self.pg_pool,
            &self.escaped_schema,
            payload,
            available_at,
            now,
        )
        .await
    }

    /// Encodes `job` with `codec` then pushes it.
    pub async fn push_job<C: PayloadCodec>(
        &self,
        codec: &C,
        job: &C::Job,
        delay: Duration,
    ) -> Result<i64> {
        let payload = codec.encode(job)?;
        self.try_push(&payload, delay).await
    }

    /// Claims the next due job, or returns `None` right away when there is
    /// nothing to do.
    ///
    /// Expired leases are reclaimed first, so work abandoned by a crashed
    /// worker becomes claimable again through this call.
    pub async fn pop(&self) -> Result<Option<JobRecord>> {
        let now = self.clock.now();

        reclaim_expired_jobs(&self.pg_pool, &self.escaped_schema, now).await?;
        let job = pop_job(&self.pg_pool, &self.escaped_schema, now).await?;

        match &job {
            Some(job) => debug!(job_id = job.id(), attempts = job.attempts(), "Job reserved"),
            None => debug!("No job due"),
        }

        Ok(job)
    }

    /// Puts a reserved job back in the pool and increments its attempts.
    ///
    /// Callers must not bump `attempts` themselves. Returns `false` when the
    /// reservation is already gone (reclaimed, deleted or never held).
    pub async fn release(&self, job: &JobRecord) -> Result<bool> {
        let Some(reserved_at) = job.reserved_at() else {
            return Ok(false);
        };

        let released =
            release_job(&self.pg_pool, &self.escaped_schema, job.id(), reserved_at).await?;

        if released {
            debug!(job_id = job.id(), "Job released");
        } else {
            debug!(job_id = job.id(), "Job reservation no longer held, nothing to release");
        }

        Ok(released)
    }

    /// Removes a job. Deleting a job that no longer exists is a no-op.
    pub async fn delete(&self, job: &JobRecord) -> Result<()> {
        if !delete_job(&self.pg_pool, &self.escaped_schema, job.id()).await? {
            debug!(job_id = job.id(), "Job already deleted");
        }
        Ok(())
    }

    /// Deletes a job only while it still holds the reservation it was popped
    /// with. Returns `false` once the lease was reclaimed or the job is gone.
    pub async fn complete(&self, job: &JobRecord) -> Result<bool> {
        let Some(reserved_at) = job.reserved_at() else {
            return Ok(false);
        };

        let deleted =
            delete_reserved_job(&self.pg_pool, &self.escaped_schema, job.id(), reserved_at).await?;
        if !deleted {
            debug!(job_id = job.id(), "Job reservation no longer held, nothing to complete");
        }
        Ok(deleted)
    }

    /// Number of pending jobs, reserved ones included.
    pub async fn jobs(&self) -> Result<i64> {
        count_jobs(&self.pg_pool, &self.escaped_schema).await
    }

    pub async fn get_job(&self, job_id: i64) -> Result<Option<JobRecord>> {
        get_job(&self.pg_pool, &self.escaped_schema, job_id).await
    }
}
