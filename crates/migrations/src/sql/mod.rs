use sqlx::{Postgres, Transaction};

pub mod m000001;

pub struct QueueMigration {
    name: &'static str,
    pub(crate) stmts: &'static [&'static str],
}

impl QueueMigration {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Parsed from the name, `m000001` is migration 1.
    pub fn migration_number(&self) -> i32 {
        self.name.trim_start_matches('m').parse().unwrap_or(0)
    }

    pub async fn execute<'e>(
        &self,
        tx: &mut Transaction<'e, Postgres>,
        escaped_schema: &str,
    ) -> Result<(), sqlx::Error> {
        for stmt in self.stmts {
            let stmt = stmt.replace(":QUEUE_SCHEMA", escaped_schema);
            sqlx::query(&stmt).execute(tx.as_mut()).await?;
        }

        Ok(())
    }
}

pub const QUEUE_MIGRATIONS: &[QueueMigration] = &[m000001::M000001_MIGRATION];
