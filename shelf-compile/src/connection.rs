use std::{fmt, time::Duration};

use log::debug;
use sqlx::{
    mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions},
    Connection,
};

use crate::error::Error;

/// The only dialect shelf speaks.
pub const DIALECT: &str = "mysql";

pub const DEFAULT_PORT: u16 = 3306;

/// Connection parameters. Nothing here is validated: a wrong or empty value
/// surfaces as an error the first time the database is reached.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub database: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    /// How long to wait for a connection. The driver default applies when unset.
    pub connect_timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            database: String::new(),
            user: String::new(),
            password: String::new(),
            host: String::new(),
            port: DEFAULT_PORT,
            connect_timeout: None,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"********")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl ConnectionConfig {
    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

/// An owned handle to the database. Dropping it leaves open connections to
/// the pool's own teardown; call [`Database::close`] to release them.
pub struct Database {
    pool: MySqlPool,
}

impl Database {
    /// Builds the handle without touching the network.
    pub fn connect_lazy(config: &ConnectionConfig) -> Database {
        debug!(
            "configuring {} client for `{}` at {}:{}",
            DIALECT, config.database, config.host, config.port
        );

        let mut options = MySqlPoolOptions::new();
        if let Some(timeout) = config.connect_timeout {
            options = options.acquire_timeout(timeout);
        }

        Database {
            pool: options.connect_lazy_with(config.connect_options()),
        }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// One authentication round-trip.
    pub async fn authenticate(&self) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;
        conn.ping().await?;
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
        debug!("database handle closed");
    }
}
