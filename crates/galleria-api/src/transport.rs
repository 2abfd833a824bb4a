// Shared transport configuration for building reqwest::Client instances.
//
// The API uses Django session authentication, so every client carries a
// cookie jar; the CSRF token is layered on top by `RestClient`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;

/// Transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub cookie_jar: Option<Arc<Jar>>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            cookie_jar: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// A cookie jar is created if the config doesn't already hold one —
    /// session auth requires cookies on every request.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let jar = self
            .cookie_jar
            .clone()
            .unwrap_or_else(|| Arc::new(Jar::default()));

        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent("galleria-api/0.1.0")
            .cookie_provider(jar)
            .build()
            .map_err(|e| crate::error::Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Create a config with a fresh cookie jar (for sharing across clients).
    pub fn with_cookie_jar(mut self) -> Self {
        self.cookie_jar = Some(Arc::new(Jar::default()));
        self
    }
}
