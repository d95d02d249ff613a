//! The startup flow: configure, check the connection, synchronize every model.
//!
//! Each step reports its outcome as a value. Whether a failed connection check
//! stops the synchronization is up to the [`FailurePolicy`].

use log::{error, info, warn};
use shelf::database::DatabaseSchema;

use crate::{
    connection::{ConnectionConfig, Database},
    database::{DatabaseCompiler, SyncMode, SyncResult},
    error::Error,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Attempt synchronization even when the connection check failed.
    Continue,
    /// Skip synchronization when the connection check failed.
    Halt,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Continue
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BootstrapOptions {
    pub mode: SyncMode,
    pub policy: FailurePolicy,
}

#[derive(Debug)]
pub enum StepOutcome {
    Synchronized(SyncResult),
    Failed(Error),
    Skipped,
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Synchronized(_))
    }
}

#[derive(Debug)]
pub struct ModelReport {
    pub model_name: String,
    pub table_name: String,
    pub outcome: StepOutcome,
}

#[derive(Debug)]
pub struct BootstrapReport {
    pub connection: Result<(), Error>,
    pub models: Vec<ModelReport>,
}

impl BootstrapReport {
    pub fn is_success(&self) -> bool {
        self.connection.is_ok() && self.models.iter().all(|model| model.outcome.is_success())
    }
}

pub struct Bootstrap {
    config: ConnectionConfig,
    options: BootstrapOptions,
}

impl Bootstrap {
    pub fn new(config: ConnectionConfig, options: BootstrapOptions) -> Self {
        Bootstrap { config, options }
    }

    /// Runs every step once. The database handle is closed before returning,
    /// whatever the outcome.
    pub async fn run(&self, schemas: Vec<DatabaseSchema>) -> BootstrapReport {
        let database = Database::connect_lazy(&self.config);
        let report = self.run_steps(&database, schemas).await;
        database.close().await;

        report
    }

    async fn run_steps(&self, database: &Database, schemas: Vec<DatabaseSchema>) -> BootstrapReport {
        let connection = check_connection(database).await;
        let halt = connection.is_err() && self.options.policy == FailurePolicy::Halt;

        let compiler = DatabaseCompiler::from_pool(database.pool(), schemas);
        let mut models = Vec::with_capacity(compiler.tables().len());

        for table in compiler.tables() {
            let outcome = if halt {
                warn!(
                    "Skipping synchronization of the {} model: no database connection",
                    table.model_name
                );
                StepOutcome::Skipped
            } else {
                sync_model(&compiler, table, self.options.mode).await
            };

            models.push(ModelReport {
                model_name: table.model_name.clone(),
                table_name: table.table_name.clone(),
                outcome,
            });
        }

        BootstrapReport { connection, models }
    }
}

pub async fn check_connection(database: &Database) -> Result<(), Error> {
    match database.authenticate().await {
        Ok(()) => {
            info!("Database connection has been established successfully.");
            Ok(())
        }
        Err(err) => {
            error!("Unable to connect to the database: {}", err);
            Err(err)
        }
    }
}

pub async fn sync_model(
    compiler: &DatabaseCompiler<'_>,
    table: &DatabaseSchema,
    mode: SyncMode,
) -> StepOutcome {
    match compiler.sync_table(table, mode).await {
        Ok(result) => {
            info!("{} model was synchronized successfully.", table.model_name);
            StepOutcome::Synchronized(result)
        }
        Err(err) => {
            error!("Error synchronizing the {} model: {}", table.model_name, err);
            StepOutcome::Failed(err)
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use log::Level;

    use super::*;
    use crate::tests_cfg::{capture_logs, captured_logs, product_schema};

    fn unreachable_config() -> ConnectionConfig {
        ConnectionConfig {
            database: "testdb".to_string(),
            user: "root".to_string(),
            password: "x".to_string(),
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout: Some(Duration::from_millis(500)),
        }
    }

    #[tokio::test]
    async fn sync_is_attempted_after_failed_connection() {
        let bootstrap = Bootstrap::new(unreachable_config(), BootstrapOptions::default());
        let report = bootstrap.run(vec![product_schema()]).await;

        assert!(report.connection.is_err());
        assert_eq!(report.models.len(), 1);
        assert_eq!(report.models[0].model_name, "Product");
        assert_eq!(report.models[0].table_name, "products");
        assert!(matches!(report.models[0].outcome, StepOutcome::Failed(_)));
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn failed_connection_status_lines() {
        capture_logs();
        let report = Bootstrap::new(unreachable_config(), BootstrapOptions::default())
            .run(vec![product_schema()])
            .await;

        let connection_err = report.connection.as_ref().unwrap_err().to_string();
        let sync_err = match &report.models[0].outcome {
            StepOutcome::Failed(err) => err.to_string(),
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(
            captured_logs(Level::Info),
            vec![
                format!("Unable to connect to the database: {}", connection_err),
                format!("Error synchronizing the Product model: {}", sync_err),
            ]
        );
    }

    #[tokio::test]
    async fn halted_status_lines() {
        capture_logs();
        let options = BootstrapOptions {
            policy: FailurePolicy::Halt,
            ..BootstrapOptions::default()
        };
        Bootstrap::new(unreachable_config(), options)
            .run(vec![product_schema()])
            .await;

        let lines = captured_logs(Level::Warn);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Unable to connect to the database: "));
        assert_eq!(
            lines[1],
            "Skipping synchronization of the Product model: no database connection"
        );
    }

    #[tokio::test]
    async fn halt_skips_sync() {
        let options = BootstrapOptions {
            policy: FailurePolicy::Halt,
            ..BootstrapOptions::default()
        };
        let report = Bootstrap::new(unreachable_config(), options)
            .run(vec![product_schema()])
            .await;

        assert!(report.connection.is_err());
        assert!(matches!(report.models[0].outcome, StepOutcome::Skipped));
        assert!(!report.is_success());
    }

    #[test]
    fn report_success_requires_every_step() {
        let report = BootstrapReport {
            connection: Ok(()),
            models: vec![ModelReport {
                model_name: "Product".to_string(),
                table_name: "products".to_string(),
                outcome: StepOutcome::Synchronized(SyncResult::default()),
            }],
        };
        assert!(report.is_success());
    }
}
