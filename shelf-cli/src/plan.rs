use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use log::info;
use shelf::schema::Schema as _;
use shelf_compile::{connection::Database, database::DatabaseCompiler};

use crate::{config::ConnectionArgs, schema, Runnable};

/// Prints the SQL `sync --alter` would execute, without running it
#[derive(Parser)]
pub struct Plan {
    #[clap(flatten)]
    pub connection: ConnectionArgs,
    /// Prints more information
    #[clap(short, long)]
    pub verbose: bool,
}

#[async_trait]
impl Runnable for Plan {
    async fn run(&mut self) -> Result<()> {
        let database = Database::connect_lazy(&self.connection.connection_config());
        let compiler = DatabaseCompiler::from_pool(database.pool(), schema::Schema::database_schemas());
        let sql = compiler.compile().await;
        database.close().await;

        let sql = sql.context("could not read the live schema")?;
        if sql.is_empty() {
            info!("Every table matches its model.");
        } else {
            println!("{}", sql);
        }

        Ok(())
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }
}
