use std::io::Write;

use anyhow::Result;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{error, Level, LevelFilter};

use check::Check;
use plan::Plan;
use sync::Synchronize;

mod check;
mod config;
mod macros;
mod plan;
mod schema;
mod sync;

/// Shelf cli
///
/// Without a subcommand, runs `sync` with the flags given here.
#[derive(Parser)]
#[clap(version, args_conflicts_with_subcommands = true)]
struct Opts {
    #[clap(subcommand)]
    pub subcmd: Option<SubCommand>,
    #[clap(flatten)]
    pub sync: Synchronize,
}

#[derive(Subcommand)]
enum SubCommand {
    Sync(Synchronize),
    Check(Check),
    Plan(Plan),
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let opts: Opts = Opts::parse();

    let mut cmd = match opts.subcmd {
        Some(SubCommand::Sync(sync)) => runnable_cmd!(sync),
        Some(SubCommand::Check(check)) => runnable_cmd!(check),
        Some(SubCommand::Plan(plan)) => runnable_cmd!(plan),
        None => runnable_cmd!(opts.sync),
    };

    let log_level = if cmd.is_verbose() {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .filter_module("sqlx", LevelFilter::Warn)
        .format(|buf, record| {
            let prefix = match record.level() {
                Level::Error => "error".red(),
                Level::Warn => "warn".yellow(),
                Level::Info => "info".blue(),
                Level::Debug => "debug".purple(),
                Level::Trace => "trace".cyan(),
            }
            .bold();
            writeln!(buf, "{} {}", prefix, record.args())
        })
        .init();

    if let Err(err) = cmd.run().await {
        error!("{}", err);
        if cmd.is_verbose() {
            let err_chain = err.chain().skip(1);
            if err_chain.clone().next().is_some() {
                eprintln!("{}", "\nCaused by:".italic().truecolor(190, 190, 190));
            }
            err_chain
                .for_each(|cause| eprintln!(" - {}", cause.to_string().truecolor(190, 190, 190)));
        }
        std::process::exit(1);
    }
}

#[async_trait]
pub trait Runnable {
    async fn run(&mut self) -> Result<()>;

    fn is_verbose(&self) -> bool {
        false
    }
}
