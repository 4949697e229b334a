#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use retry_queue::clock::mock::MockClock;
use retry_queue::{FailureRecord, JobRecord, Queue, QueueOptions};
use sqlx::postgres::PgConnectOptions;
use sqlx::PgPool;
use tokio::sync::OnceCell;
use tokio::task::LocalSet;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const SCHEMA: &str = "retry_queue";

#[derive(Clone, Debug)]
pub struct TestDatabase {
    pub source_pool: PgPool,
    pub test_pool: PgPool,
    pub name: String,
    pub clock: MockClock,
}

/// Fixed starting point of every test's simulated clock.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

impl TestDatabase {
    async fn drop(&self) {
        self.test_pool.close().await;
        sqlx::query(&format!("DROP DATABASE {} WITH (FORCE)", self.name))
            .execute(&self.source_pool)
            .await
            .expect("Failed to drop test database");
    }

    pub fn create_queue_options(&self) -> QueueOptions {
        QueueOptions::default()
            .pg_pool(self.test_pool.clone())
            .schema(SCHEMA)
            .clock(self.clock.clone())
    }

    pub async fn create_queue(&self) -> Queue {
        self.create_queue_options()
            .init()
            .await
            .expect("Failed to create queue")
    }

    pub fn advance(&self, seconds: i64) {
        self.clock.advance(chrono::Duration::seconds(seconds));
    }

    pub async fn get_jobs(&self) -> Vec<JobRecord> {
        sqlx::query_as("select * from retry_queue.jobs order by id asc")
            .fetch_all(&self.test_pool)
            .await
            .expect("Failed to get jobs")
    }

    pub async fn get_failures(&self) -> Vec<FailureRecord> {
        sqlx::query_as("select * from retry_queue.failures order by id asc")
            .fetch_all(&self.test_pool)
            .await
            .expect("Failed to get failures")
    }

    /// Makes every later insert into `failures` fail with a check violation.
    pub async fn reject_failure_inserts(&self) {
        sqlx::query(
            "alter table retry_queue.failures add constraint reject_all check (job_id < 0) not valid",
        )
        .execute(&self.test_pool)
        .await
        .expect("Failed to add constraint");
    }

    pub async fn get_migrations(&self) -> Vec<i32> {
        sqlx::query_scalar("select id from retry_queue.migrations order by id asc")
            .fetch_all(&self.test_pool)
            .await
            .expect("Failed to get migrations")
    }
}

pub async fn create_test_database(db_url: &str) -> TestDatabase {
    let mut pg_conn_options: PgConnectOptions =
        db_url.parse().expect("Failed to parse DATABASE_URL");
    pg_conn_options = pg_conn_options.application_name("__test_retry_queue");

    let pg_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(4)
        .connect_with(pg_conn_options.clone())
        .await
        .expect("Failed to connect to database");

    let db_id = uuid::Uuid::now_v7();
    let db_name = format!("__test_retry_queue_{}", db_id.simple());

    sqlx::query(&format!("CREATE DATABASE {}", db_name))
        .execute(&pg_pool)
        .await
        .expect("Failed to create test database");

    let test_options = pg_conn_options.database(&db_name);

    let test_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect_with(test_options)
        .await
        .expect("Failed to connect to test database");

    TestDatabase {
        source_pool: pg_pool,
        test_pool,
        name: db_name,
        clock: MockClock::new(start_time()),
    }
}

/// Runs `test_fn` against a fresh database, dropped afterwards.
///
/// Skipped when `DATABASE_URL` is not set.
pub async fn with_test_db<F, Fut>(test_fn: F)
where
    F: FnOnce(TestDatabase) -> Fut + 'static,
    Fut: std::future::Future<Output = ()>,
{
    let Ok(db_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL is not set, skipping database test");
        return;
    };

    enable_logs().await;

    let local_set = LocalSet::new();

    local_set
        .run_until(async move {
            let test_db = create_test_database(&db_url).await;
            let test_db_2 = test_db.clone();

            let result = tokio::task::spawn_local(async move {
                test_fn(test_db_2).await;
            })
            .await;

            test_db.drop().await;
            result.expect("Test failed");
        })
        .await;
}

pub async fn enable_logs() {
    static ONCE: OnceCell<()> = OnceCell::const_new();

    ONCE.get_or_init(|| async {
        let fmt_layer = tracing_subscriber::fmt::layer().with_test_writer();
        // Log level set to debug except for sqlx set at warn (to not show all sql requests)
        let filter_layer = EnvFilter::try_new("debug,sqlx=warn").unwrap();

        let _ = tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .try_init();
    })
    .await;
}
