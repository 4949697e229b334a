pub mod pg_version;
pub mod sql;

use indoc::formatdoc;
use pg_version::fetch_and_check_postgres_version;
use sql::QUEUE_MIGRATIONS;
use sqlx::{query, query_scalar, Acquire, Error as SqlxError, PgExecutor, Postgres};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Error occured while parsing postgres version: {0}")]
    ParseVersionError(#[from] std::num::ParseIntError),
    #[error("retry_queue requires PostgreSQL v12.0 or greater (detected `server_version_num` = {0})")]
    IncompatibleVersion(u32),
    #[error("Error occured while migrate: {0}")]
    SqlError(#[from] sqlx::Error),
}

/// Creates the schema and its `migrations` table when they are missing.
async fn install_schema<'e, E>(executor: E, escaped_schema: &str) -> Result<(), MigrateError>
where
    E: PgExecutor<'e> + Acquire<'e, Database = Postgres> + Clone,
{
    let version = fetch_and_check_postgres_version(executor.clone()).await?;
    info!(pg_version = version, "Installing retry_queue schema");

    let create_schema_query = formatdoc!(
        r#"
            create schema if not exists {escaped_schema};
        "#
    );

    let create_migration_table_query = formatdoc!(
        r#"
            create table if not exists {escaped_schema}.migrations (
                id int primary key,
                ts timestamptz default now() not null
            );
        "#
    );

    let mut tx = executor.begin().await?;
    // `if not exists` alone still races with a concurrent installer
    query("select pg_advisory_xact_lock(hashtext($1))")
        .bind(escaped_schema)
        .execute(tx.as_mut())
        .await?;
    query(&create_schema_query).execute(tx.as_mut()).await?;
    query(&create_migration_table_query)
        .execute(tx.as_mut())
        .await?;
    tx.commit().await?;

    Ok(())
}

/// Returns the id of the last applied migration, installing the schema first
/// if the `migrations` table does not exist yet.
async fn get_last_migration<'e, E>(
    executor: &E,
    escaped_schema: &str,
) -> Result<Option<i32>, MigrateError>
where
    E: PgExecutor<'e> + Acquire<'e, Database = Postgres> + Send + Sync + Clone,
{
    let migrations_status_query =
        format!("select id from {escaped_schema}.migrations order by id desc limit 1");
    let last_migration_query_result = query_scalar::<_, i32>(&migrations_status_query)
        .fetch_optional(executor.clone())
        .await;

    match last_migration_query_result {
        Err(SqlxError::Database(e)) => {
            // 42P01: undefined_table, 3F000: invalid_schema_name
            match e.code().as_deref() {
                Some("42P01") | Some("3F000") => {
                    install_schema(executor.clone(), escaped_schema).await?;
                    Ok(None)
                }
                _ => Err(MigrateError::SqlError(SqlxError::Database(e))),
            }
        }
        Err(e) => Err(MigrateError::SqlError(e)),
        Ok(id) => Ok(id),
    }
}

/// Brings the queue schema up to date. Safe to call from several processes at
/// once and on every start: applied migrations are skipped.
pub async fn migrate<'e, E>(executor: E, escaped_schema: &str) -> Result<(), MigrateError>
where
    E: PgExecutor<'e> + Acquire<'e, Database = Postgres> + Send + Sync + Clone,
{
    let last_migration = get_last_migration(&executor, escaped_schema).await?;

    let mut highest_migration = 0;
    let mut migrated = false;
    for migration in QUEUE_MIGRATIONS.iter() {
        let migration_number = migration.migration_number();
        highest_migration = highest_migration.max(migration_number);

        if last_migration.is_some_and(|last| last >= migration_number) {
            continue;
        }

        let mut tx = executor.clone().begin().await?;

        // Serializes concurrent installers of the same schema
        query("select pg_advisory_xact_lock(hashtext($1))")
            .bind(escaped_schema)
            .execute(tx.as_mut())
            .await?;

        let already_applied: bool = query_scalar(&format!(
            "select exists(select 1 from {escaped_schema}.migrations where id = $1)"
        ))
        .bind(migration_number)
        .fetch_one(tx.as_mut())
        .await?;

        if already_applied {
            tx.rollback().await?;
            continue;
        }

        info!(
            migration_number,
            migration_name = migration.name(),
            "Running migration {}",
            migration.name(),
        );
        migration.execute(&mut tx, escaped_schema).await?;
        query(&format!(
            "insert into {escaped_schema}.migrations (id) values ($1)"
        ))
        .bind(migration_number)
        .execute(tx.as_mut())
        .await?;

        tx.commit().await?;
        migrated = true;
    }

    if migrated {
        info!("Migrations complete");
    }

    if let Some(last_migration) = last_migration {
        if highest_migration < last_migration {
            warn!(
                last_migration,
                highest_migration,
                "Database is using retry_queue schema revision {}, but this build only knows up to revision {}. Attempting to continue regardless.",
                last_migration,
                highest_migration,
            );
        }
    }

    Ok(())
}
