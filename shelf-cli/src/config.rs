use std::time::Duration;

use clap::Args;
use log::warn;
use shelf_compile::connection::{ConnectionConfig, DEFAULT_PORT};

/// Connection settings. Flags take precedence over the environment, which
/// may be seeded from a `.env` file in the working directory.
#[derive(Args, Clone)]
pub struct ConnectionArgs {
    /// Name of the database
    #[clap(long, env = "DB_NAME")]
    pub db_name: Option<String>,
    /// User to authenticate as
    #[clap(long, env = "DB_USER")]
    pub db_user: Option<String>,
    /// Password of the user
    #[clap(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,
    /// Host of the MySQL server
    #[clap(long, env = "DB_HOST")]
    pub db_host: Option<String>,
    /// Port of the MySQL server
    #[clap(long, env = "DB_PORT", default_value_t = DEFAULT_PORT)]
    pub db_port: u16,
    /// Seconds to wait for a connection
    #[clap(long, env = "DB_CONNECT_TIMEOUT")]
    pub connect_timeout: Option<u64>,
}

impl ConnectionArgs {
    /// Missing values are passed on empty; the connection check reports them.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            database: required(&self.db_name, "DB_NAME"),
            user: required(&self.db_user, "DB_USER"),
            password: required(&self.db_password, "DB_PASSWORD"),
            host: required(&self.db_host, "DB_HOST"),
            port: self.db_port,
            connect_timeout: self.connect_timeout.map(Duration::from_secs),
        }
    }
}

fn required(value: &Option<String>, var: &str) -> String {
    match value {
        Some(value) => value.clone(),
        None => {
            warn!("{} is not set", var);
            String::new()
        }
    }
}
