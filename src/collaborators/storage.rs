//! Storage connection boundary.
//!
//! The gateway needs its backing store reachable before it serves traffic but
//! does not speak the store's protocol itself. The default connector verifies
//! reachability by opening a TCP connection and keeps it for the life of the
//! process.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::net::TcpStream;
use url::Url;

use crate::config::StorageConfig;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid storage url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("storage url has no host")]
    MissingHost,

    #[error("storage url has no port and scheme '{0}' has no default")]
    MissingPort(String),

    #[error("timed out connecting to {endpoint} after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },

    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
}

/// An established storage connection.
#[derive(Debug)]
pub struct StorageHandle {
    endpoint: String,
    connected_at: DateTime<Utc>,
    _connection: Option<TcpStream>,
}

impl StorageHandle {
    /// Handle for a store that holds no socket (in-process or test stores).
    pub fn detached(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connected_at: Utc::now(),
            _connection: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }
}

#[async_trait]
pub trait StorageConnector: Send + Sync {
    async fn connect(&self) -> Result<StorageHandle, StorageError>;
}

/// Connects to the host and port named by a storage URL.
#[derive(Debug, Clone)]
pub struct TcpStorageConnector {
    url: String,
    timeout: Duration,
}

impl TcpStorageConnector {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.url.clone(), config.connect_timeout())
    }

    /// `host:port` named by the URL. Credentials are never part of it.
    pub fn endpoint(&self) -> Result<(String, u16), StorageError> {
        let url = Url::parse(&self.url)?;
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or(StorageError::MissingHost)?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = url
            .port()
            .or_else(|| default_port(url.scheme()))
            .ok_or_else(|| StorageError::MissingPort(url.scheme().to_string()))?;
        Ok((host, port))
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "mongodb" => Some(27017),
        "postgres" | "postgresql" => Some(5432),
        "redis" | "rediss" => Some(6379),
        "mysql" => Some(3306),
        _ => None,
    }
}

#[async_trait]
impl StorageConnector for TcpStorageConnector {
    async fn connect(&self) -> Result<StorageHandle, StorageError> {
        let (host, port) = self.endpoint()?;
        let endpoint = format!("{host}:{port}");

        tracing::info!(endpoint = %endpoint, "Connecting to storage");
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect((host.as_str(), port)))
            .await
            .map_err(|_| StorageError::Timeout {
                endpoint: endpoint.clone(),
                timeout: self.timeout,
            })?
            .map_err(|source| StorageError::Connect {
                endpoint: endpoint.clone(),
                source,
            })?;

        Ok(StorageHandle {
            endpoint,
            connected_at: Utc::now(),
            _connection: Some(stream),
        })
    }
}
