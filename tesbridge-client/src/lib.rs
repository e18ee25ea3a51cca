//! Tesbridge HTTP Client
//!
//! A small, type-safe client for the two Task Execution Service endpoints the
//! bridge needs: task creation and minimal status lookups.
//!
//! The client is stateless per call and cheap to clone, so many polling
//! workers can share one instance. It never retries; retry policy belongs to
//! the caller.
//!
//! # Example
//!
//! ```no_run
//! use tesbridge_client::TesClient;
//!
//! # async fn example() -> tesbridge_client::Result<()> {
//! let client = TesClient::new("localhost:8000");
//! let op = client.fetch_status("task-123").await?;
//! println!("{} is {:?}", op.id, op.state);
//! # Ok(())
//! # }
//! ```

pub mod error;
mod tasks;

pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for a Task Execution Service
#[derive(Debug, Clone)]
pub struct TesClient {
    /// Base URL of the service (e.g., "http://localhost:8000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl TesClient {
    /// Create a new client
    ///
    /// `http://` is assumed when `addr` carries no scheme, and a trailing
    /// slash is dropped.
    ///
    /// # Example
    /// ```
    /// use tesbridge_client::TesClient;
    ///
    /// let client = TesClient::new("localhost:8000/");
    /// assert_eq!(client.base_url(), "http://localhost:8000");
    /// ```
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_client(addr, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(addr: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: normalize_addr(addr),
            client,
        }
    }

    /// Get the base URL of the service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

/// Service address as the client will use it
///
/// `http://` is prepended when `addr` carries no scheme and a trailing
/// slash is dropped.
pub fn normalize_addr(addr: impl Into<String>) -> String {
    let addr = addr.into();
    let addr = if addr.starts_with("http") {
        addr
    } else {
        format!("http://{}", addr)
    };
    addr.trim_end_matches('/').to_string()
}
