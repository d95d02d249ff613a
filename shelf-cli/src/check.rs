use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use shelf_compile::{bootstrap::check_connection, connection::Database};

use crate::{config::ConnectionArgs, Runnable};

/// Checks that the database can be reached with the configured credentials
#[derive(Parser)]
pub struct Check {
    #[clap(flatten)]
    pub connection: ConnectionArgs,
    /// Prints more information
    #[clap(short, long)]
    pub verbose: bool,
}

#[async_trait]
impl Runnable for Check {
    async fn run(&mut self) -> Result<()> {
        let database = Database::connect_lazy(&self.connection.connection_config());
        let result = check_connection(&database).await;
        database.close().await;

        result.context("connectivity check failed")
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }
}
