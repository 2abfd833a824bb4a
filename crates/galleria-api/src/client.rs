// REST client for the galleria API
//
// Wraps `reqwest::Client` with endpoint URL construction, error
// normalization (non-2xx bodies carry a `detail` string), and CSRF token
// handling. Higher layers never touch reqwest directly.

use std::sync::RwLock;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Request header carrying the anti-forgery token on every request.
const CSRF_HEADER: &str = "X-CSRFToken";

/// One field of a `multipart/form-data` request body.
///
/// Scalar values are pre-stringified by the caller, the way a browser
/// `FormData` would stringify them.
#[derive(Debug, Clone)]
pub enum FormField {
    Text(String),
    File {
        file_name: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

/// Shape of a non-2xx error body: `{"detail": "..."}`.
#[derive(serde::Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Raw HTTP client for the galleria API.
///
/// Issues plain REST+JSON requests against `{base_url}/{path}`, rewrites
/// every failure into an [`Error`] whose message is the server's `detail`
/// string, and transparently injects/rotates the CSRF token.
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    /// Anti-forgery token. Sent on every request; replaced whenever a
    /// response carries a rotated value.
    csrf_token: RwLock<Option<String>>,
}

impl RestClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the API root, e.g. `https://example.org/api`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            csrf_token: RwLock::new(None),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            csrf_token: RwLock::new(None),
        }
    }

    /// The API root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── CSRF token management ─────────────────────────────────────────

    /// Store an anti-forgery token (e.g. restored from persisted state).
    pub fn set_csrf_token(&self, token: String) {
        debug!("storing CSRF token");
        *self.csrf_token.write().expect("CSRF lock poisoned") = Some(token);
    }

    /// The currently stored token, for persisting across sessions.
    pub fn csrf_token(&self) -> Option<String> {
        self.csrf_token.read().expect("CSRF lock poisoned").clone()
    }

    /// Replace the stored token if the response carries a rotated value.
    fn update_csrf_from_response(&self, headers: &reqwest::header::HeaderMap) {
        let new_token = headers
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        if let Some(token) = new_token {
            trace!("CSRF token rotated");
            *self.csrf_token.write().expect("CSRF lock poisoned") = Some(token);
        }
    }

    /// Apply the stored token to a request builder.
    fn apply_csrf(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let guard = self.csrf_token.read().expect("CSRF lock poisoned");
        match guard.as_deref() {
            Some(token) => builder.header(CSRF_HEADER, token),
            None => builder,
        }
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Build a full URL for an API path, e.g. `piece/3` or `login`.
    fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and deserialize the JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("GET {}", url);

        let builder = self.apply_csrf(self.http.get(url));
        let resp = builder.send().await?;
        self.parse_json(resp).await
    }

    /// Send a POST request with a JSON body.
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("POST {}", url);

        let builder = self.apply_csrf(self.http.post(url).json(body));
        let resp = builder.send().await?;
        self.parse_json(resp).await
    }

    /// Send a POST request with no body, discarding the response body.
    /// Used for endpoints like `logout` that return nothing useful.
    pub async fn post_empty(&self, path: &str) -> Result<(), Error> {
        let url = self.api_url(path)?;
        debug!("POST {}", url);

        let builder = self.apply_csrf(self.http.post(url));
        let resp = builder.send().await?;
        self.check_status(resp).await?;
        Ok(())
    }

    /// Send a PATCH request with a JSON body.
    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("PATCH {}", url);

        let builder = self.apply_csrf(self.http.patch(url).json(body));
        let resp = builder.send().await?;
        self.parse_json(resp).await
    }

    /// Send a PATCH request with a `multipart/form-data` body.
    ///
    /// Used when a write includes a binary field (e.g. a piece image),
    /// which can't travel through a JSON request.
    pub async fn patch_form<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: Vec<(String, FormField)>,
    ) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("PATCH (multipart) {}", url);

        let mut form = reqwest::multipart::Form::new();
        for (name, field) in fields {
            form = match field {
                FormField::Text(value) => form.text(name, value),
                FormField::File {
                    file_name,
                    content_type,
                    bytes,
                } => {
                    let mut part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
                    if let Some(mime) = content_type {
                        part = part.mime_str(&mime).map_err(Error::Transport)?;
                    }
                    form.part(name, part)
                }
            };
        }

        let builder = self.apply_csrf(self.http.patch(url).multipart(form));
        let resp = builder.send().await?;
        self.parse_json(resp).await
    }

    /// Send a PUT request with a JSON body.
    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("PUT {}", url);

        let builder = self.apply_csrf(self.http.put(url).json(body));
        let resp = builder.send().await?;
        self.parse_json(resp).await
    }

    /// Send a DELETE request. Success is HTTP 204 with an empty body.
    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.api_url(path)?;
        debug!("DELETE {}", url);

        let builder = self.apply_csrf(self.http.delete(url));
        let resp = builder.send().await?;
        self.check_status(resp).await?;
        Ok(())
    }

    // ── Response handling ────────────────────────────────────────────

    /// Reject non-2xx responses, normalizing the body's `detail` field
    /// into the error message. Returns the response for further parsing.
    async fn check_status(&self, resp: reqwest::Response) -> Result<reqwest::Response, Error> {
        // Capture any token rotation before consuming the response.
        self.update_csrf_from_response(resp.headers());

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|e| e.detail);

        Err(Error::Api {
            message: detail.unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            status: status.as_u16(),
        })
    }

    /// Check status, then deserialize the body.
    async fn parse_json<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let resp = self.check_status(resp).await?;
        let body = resp.text().await?;

        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }
}
