//! Redis backend configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use vestibule_core::{BackendError, BackendResult};

fn default_connection_timeout() -> Duration {
    Duration::from_secs(5)
}

const DEFAULT_PORT: u16 = 6379;
const DEFAULT_POOL_SIZE: u32 = 8;

/// Configuration for a single-node [`RedisBackend`](crate::RedisBackend).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis host name.
    pub host: String,
    /// Redis port.
    pub port: u16,
    /// Database number (0-15).
    pub database: u8,
    /// Password, if the server requires one.
    pub password: Option<String>,
    /// Connection timeout.
    #[serde(with = "humantime_serde", default = "default_connection_timeout")]
    pub connection_timeout: Duration,
    /// Connection pool size.
    pub pool_size: u32,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            database: 0,
            password: None,
            connection_timeout: default_connection_timeout(),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl RedisConfig {
    /// Create a configuration for the given host, other options default.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the database number.
    pub fn with_database(mut self, database: u8) -> Self {
        self.database = database;
        self
    }

    /// Set the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the connection timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the connection pool size.
    pub fn with_pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    /// Load configuration from environment variables
    /// (`VESTIBULE_REDIS_HOST`, `VESTIBULE_REDIS_PORT`,
    /// `VESTIBULE_REDIS_DATABASE`, `VESTIBULE_REDIS_PASSWORD`,
    /// `VESTIBULE_REDIS_POOL_SIZE`).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("VESTIBULE_REDIS_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("VESTIBULE_REDIS_PORT")
            && let Ok(port) = port.parse()
        {
            config.port = port;
        }
        if let Ok(db) = std::env::var("VESTIBULE_REDIS_DATABASE")
            && let Ok(db) = db.parse()
        {
            config.database = db;
        }
        if let Ok(password) = std::env::var("VESTIBULE_REDIS_PASSWORD") {
            config.password = Some(password);
        }
        if let Ok(size) = std::env::var("VESTIBULE_REDIS_POOL_SIZE")
            && let Ok(size) = size.parse()
        {
            config.pool_size = size;
        }

        config
    }

    /// Reject unusable settings. Surfaced at backend `init()`, never
    /// deferred to first use.
    pub fn validate(&self) -> BackendResult<()> {
        if self.host.is_empty() {
            return Err(BackendError::config("host must not be empty"));
        }
        if self.port == 0 {
            return Err(BackendError::config("port must not be 0"));
        }
        if self.pool_size == 0 {
            return Err(BackendError::config("pool size must be at least 1"));
        }
        Ok(())
    }

    /// Render the full connection URL with auth and database.
    pub fn connection_url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.database
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

/// Configuration for a [`RedisClusterBackend`](crate::RedisClusterBackend).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisClusterConfig {
    /// Cluster seed nodes as `(host, port)` pairs.
    pub host_ports: Vec<(String, u16)>,
    /// Password, if the cluster requires one.
    pub password: Option<String>,
    /// Connection timeout.
    #[serde(with = "humantime_serde", default = "default_connection_timeout")]
    pub connection_timeout: Duration,
    /// Connection pool size.
    pub pool_size: u32,
}

impl RedisClusterConfig {
    /// Parse a `host[:port](,host[:port])*` node list into a configuration.
    /// Nodes without an explicit port get the default Redis port.
    pub fn parse(host_ports: &str) -> BackendResult<Self> {
        Ok(Self {
            host_ports: parse_host_ports(host_ports)?,
            password: None,
            connection_timeout: default_connection_timeout(),
            pool_size: DEFAULT_POOL_SIZE,
        })
    }

    /// Set the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the connection timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the connection pool size.
    pub fn with_pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    /// Reject unusable settings.
    pub fn validate(&self) -> BackendResult<()> {
        if self.host_ports.is_empty() {
            return Err(BackendError::config("at least one cluster node required"));
        }
        if self.pool_size == 0 {
            return Err(BackendError::config("pool size must be at least 1"));
        }
        Ok(())
    }

    /// Render one connection URL per seed node.
    pub fn node_urls(&self) -> Vec<String> {
        self.host_ports
            .iter()
            .map(|(host, port)| match &self.password {
                Some(password) => format!("redis://:{password}@{host}:{port}"),
                None => format!("redis://{host}:{port}"),
            })
            .collect()
    }
}

/// Parse a comma-separated `host[:port]` list.
pub fn parse_host_ports(list: &str) -> BackendResult<Vec<(String, u16)>> {
    let mut pairs = Vec::new();
    for entry in list.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(BackendError::config(format!(
                "empty node entry in host:port list '{list}'"
            )));
        }
        match entry.split_once(':') {
            Some((host, port)) => {
                if host.is_empty() {
                    return Err(BackendError::config(format!(
                        "missing host in node entry '{entry}'"
                    )));
                }
                let port: u16 = port.parse().map_err(|_| {
                    BackendError::config(format!("invalid port in node entry '{entry}'"))
                })?;
                pairs.push((host.to_string(), port));
            }
            None => pairs.push((entry.to_string(), DEFAULT_PORT)),
        }
    }
    Ok(pairs)
}
