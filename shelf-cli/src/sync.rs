use anyhow::{anyhow, Result};
use async_trait::async_trait;
use clap::Parser;
use log::debug;
use shelf::schema::Schema as _;
use shelf_compile::{
    bootstrap::{Bootstrap, BootstrapOptions, BootstrapReport, FailurePolicy, StepOutcome},
    database::SyncMode,
};

use crate::{config::ConnectionArgs, schema, Runnable};

/// Checks the connection, then creates or verifies the table of every model
#[derive(Parser)]
pub struct Synchronize {
    #[clap(flatten)]
    pub connection: ConnectionArgs,
    /// Alters existing tables to match their models. Columns are never dropped
    #[clap(long)]
    pub alter: bool,
    /// Skips synchronization when the connection check fails
    #[clap(long)]
    pub halt_on_error: bool,
    /// Prints more information
    #[clap(short, long)]
    pub verbose: bool,
}

impl Synchronize {
    fn options(&self) -> BootstrapOptions {
        BootstrapOptions {
            mode: if self.alter {
                SyncMode::Alter
            } else {
                SyncMode::Create
            },
            policy: if self.halt_on_error {
                FailurePolicy::Halt
            } else {
                FailurePolicy::Continue
            },
        }
    }
}

#[async_trait]
impl Runnable for Synchronize {
    async fn run(&mut self) -> Result<()> {
        let bootstrap = Bootstrap::new(self.connection.connection_config(), self.options());
        let report = bootstrap.run(schema::Schema::database_schemas()).await;

        for model in &report.models {
            if let StepOutcome::Synchronized(result) = &model.outcome {
                debug!(
                    "{}: created {}, {} queries executed",
                    model.table_name, result.created, result.queries_executed
                );
            }
        }

        match failed_steps(&report) {
            0 => Ok(()),
            failed => Err(anyhow!("bootstrap finished with {} failed step(s)", failed)),
        }
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }
}

fn failed_steps(report: &BootstrapReport) -> usize {
    let connection = usize::from(report.connection.is_err());
    connection
        + report
            .models
            .iter()
            .filter(|model| !model.outcome.is_success())
            .count()
}

#[cfg(test)]
mod test {
    use shelf_compile::{bootstrap::ModelReport, database::SyncResult, error::Error};

    use super::*;

    #[test]
    fn default_options() {
        let sync = Synchronize::parse_from(vec!["sync"]);
        assert_eq!(sync.options(), BootstrapOptions::default());

        let sync = Synchronize::parse_from(vec!["sync", "--alter", "--halt-on-error"]);
        assert_eq!(
            sync.options(),
            BootstrapOptions {
                mode: SyncMode::Alter,
                policy: FailurePolicy::Halt,
            }
        );
    }

    #[test]
    fn counts_failed_steps() {
        let report = BootstrapReport {
            connection: Err(Error::Drift {
                table: "products".to_string(),
                changes: Vec::new(),
            }),
            models: vec![
                ModelReport {
                    model_name: "Product".to_string(),
                    table_name: "products".to_string(),
                    outcome: StepOutcome::Skipped,
                },
                ModelReport {
                    model_name: "Shelf".to_string(),
                    table_name: "shelf".to_string(),
                    outcome: StepOutcome::Synchronized(SyncResult::default()),
                },
            ],
        };
        assert_eq!(failed_steps(&report), 2);
    }
}
