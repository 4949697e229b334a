use std::future::Future;
use std::ops::AddAssign;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use retry_queue_job::JobRecord;
use retry_queue_shutdown_signal::{shutdown_signal, ShutdownSignal};
use tracing::{debug, error, info, warn};

use crate::builder::Queue;
use crate::codec::PayloadCodec;
use crate::errors::Result;
use crate::job_error::{FailureReason, JobError};

/// Runs a decoded job. An `Err` is retried until the worker's max attempts
/// are used up, then the job is moved to the failure sink with that error.
pub trait JobHandler<J>: Send + Sync {
    type Error: JobError;

    fn run(&self, job: J) -> impl Future<Output = core::result::Result<(), Self::Error>> + Send;
}

impl<J, E, Fut, F> JobHandler<J> for F
where
    F: Fn(J) -> Fut + Send + Sync,
    Fut: Future<Output = core::result::Result<(), E>> + Send,
    E: JobError,
{
    type Error = E;

    fn run(&self, job: J) -> impl Future<Output = core::result::Result<(), E>> + Send {
        self(job)
    }
}

/// What happened to a single claimed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The handler succeeded and the job was deleted
    Completed,
    /// The handler failed and the job went back to the pool
    Released,
    /// The job was moved to the failure sink
    Failed,
    /// The reservation was lost before the outcome could be stored
    LeaseLost,
}

/// Counts of outcomes over one or more jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: usize,
    pub released: usize,
    pub failed: usize,
    pub lease_lost: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.completed + self.released + self.failed + self.lease_lost
    }

    fn record(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Completed => self.completed += 1,
            JobOutcome::Released => self.released += 1,
            JobOutcome::Failed => self.failed += 1,
            JobOutcome::LeaseLost => self.lease_lost += 1,
        }
    }
}

impl AddAssign for RunSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.completed += rhs.completed;
        self.released += rhs.released;
        self.failed += rhs.failed;
        self.lease_lost += rhs.lease_lost;
    }
}

/// Configuration for a [`Worker`].
#[derive(Default)]
pub struct WorkerOptions {
    /// How long to sleep once the queue is drained
    poll_interval: Option<Duration>,

    /// Number of jobs processed concurrently
    concurrency: Option<usize>,

    /// Attempts after which a failing job goes to the failure sink
    max_attempts: Option<i16>,

    shutdown_signal: Option<ShutdownSignal>,
}

impl WorkerOptions {
    /// # Default
    /// 1000 milliseconds.
    pub fn poll_interval(mut self, value: Duration) -> Self {
        self.poll_interval = Some(value);
        self
    }

    /// # Default
    /// The number of logical CPUs.
    ///
    /// # Panics
    /// Panics if the value is 0.
    pub fn concurrency(mut self, value: usize) -> Self {
        assert!(value > 0, "Concurrency must be greater than 0");
        self.concurrency = Some(value);
        self
    }

    /// Counts the failed run itself, so `1` means a job is never retried.
    ///
    /// Releasing a job leaves its `available_at` alone, so retries follow each
    /// other without any delay. Keep this low for handlers that fail on
    /// resources which need time to recover.
    ///
    /// # Default
    /// 25 attempts.
    ///
    /// # Panics
    /// Panics if the value is not positive.
    pub fn max_attempts(mut self, value: i16) -> Self {
        assert!(value > 0, "Max attempts must be greater than 0");
        self.max_attempts = Some(value);
        self
    }

    /// Replaces the default OS signal handling.
    pub fn shutdown_signal(mut self, value: ShutdownSignal) -> Self {
        self.shutdown_signal = Some(value);
        self
    }

    pub fn build<C, H>(self, queue: Queue, codec: C, handler: H) -> Worker<C, H>
    where
        C: PayloadCodec,
        H: JobHandler<C::Job>,
    {
        Worker {
            queue,
            codec,
            handler,
            poll_interval: self.poll_interval.unwrap_or(Duration::from_millis(1000)),
            concurrency: self.concurrency.unwrap_or_else(num_cpus::get),
            max_attempts: self.max_attempts.unwrap_or(25),
            shutdown_signal: self.shutdown_signal.unwrap_or_else(shutdown_signal),
        }
    }
}

/// Polls a queue and runs every due job through a handler.
pub struct Worker<C, H> {
    queue: Queue,
    codec: C,
    handler: H,
    poll_interval: Duration,
    concurrency: usize,
    max_attempts: i16,
    shutdown_signal: ShutdownSignal,
}

impl<C, H> Worker<C, H>
where
    C: PayloadCodec,
    H: JobHandler<C::Job>,
{
    /// Processes jobs until none is due, polls again after `poll_interval`,
    /// and returns once the shutdown signal fires.
    ///
    /// Jobs in flight when the signal arrives are finished first.
    pub async fn run(&self) -> Result<()> {
        info!(
            concurrency = self.concurrency,
            poll_interval = ?self.poll_interval,
            "Worker started"
        );

        while !self.is_shutting_down() {
            match self.run_once().await {
                Ok(summary) if summary.total() > 0 => debug!(?summary, "Queue drained"),
                Ok(_) => {}
                Err(e) => error!(error = %e, "Error while processing jobs"),
            }

            tokio::select! {
                _ = self.shutdown_signal.clone() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!("Worker stopped");
        Ok(())
    }

    /// Processes jobs until the queue has nothing due, then returns.
    ///
    /// A released job is due again right away, so a failing job is retried
    /// within the same call until it reaches max attempts.
    ///
    /// An error stops only the concurrent slot it happened in. The other slots
    /// keep going until the queue is drained, then the first error is returned.
    pub async fn run_once(&self) -> Result<RunSummary> {
        let drains = (0..self.concurrency).map(|_| self.drain());
        let mut summary = RunSummary::default();
        let mut first_error = None;
        for partial in join_all(drains).await {
            match partial {
                Ok(partial) => summary += partial,
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => error!(error = %e, "Error while processing jobs"),
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    async fn drain(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        while !self.is_shutting_down() {
            let Some(job) = self.queue.store().pop().await? else {
                break;
            };
            summary.record(self.process_job(job).await?);
        }

        Ok(summary)
    }

    /// Runs one claimed job and stores its outcome.
    pub async fn process_job(&self, job: JobRecord) -> Result<JobOutcome> {
        let store = self.queue.store();

        let decoded = match self.codec.decode(job.payload()) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(job_id = job.id(), error = %e, "Could not decode job payload");
                let reason = FailureReason::from(e);
                return self.fail(&job, Some(&reason)).await;
            }
        };

        match self.handler.run(decoded).await {
            Ok(()) => {
                if store.complete(&job).await? {
                    debug!(job_id = job.id(), "Job completed");
                    Ok(JobOutcome::Completed)
                } else {
                    warn!(job_id = job.id(), "Lease expired before the job could be completed");
                    Ok(JobOutcome::LeaseLost)
                }
            }
            Err(e) => {
                let attempts = i32::from(job.attempts()) + 1;
                warn!(
                    job_id = job.id(),
                    attempts,
                    max_attempts = self.max_attempts,
                    kind = %e.kind(),
                    message = %e.message(),
                    "Job failed"
                );

                if attempts >= i32::from(self.max_attempts) {
                    return self.fail(&job, Some(&e)).await;
                }

                if store.release(&job).await? {
                    Ok(JobOutcome::Released)
                } else {
                    warn!(job_id = job.id(), "Lease expired before the job could be released");
                    Ok(JobOutcome::LeaseLost)
                }
            }
        }
    }

    async fn fail(&self, job: &JobRecord, error: Option<&dyn JobError>) -> Result<JobOutcome> {
        match self.queue.failure_sink().record_reserved(job, error).await? {
            Some(_) => Ok(JobOutcome::Failed),
            None => Ok(JobOutcome::LeaseLost),
        }
    }

    fn is_shutting_down(&self) -> bool {
        self.shutdown_signal.clone().now_or_never().is_some()
    }
}
