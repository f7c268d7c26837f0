//! HTTP context for the Ledger Core API
//!
//! Every SDK call goes through [`Client`]: a thin POST-JSON transport that
//! applies basic-auth from the configured access token, tags requests with
//! a correlation id, and turns the service's structured error bodies into
//! [`Error::Api`].

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::config::Config;
use crate::query::{Page, QueryParams};
use crate::{Error, Result};

/// Error body returned by the ledger service on non-2xx responses
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: String,
    message: String,
    detail: Option<String>,
}

/// Client for the Ledger Core API
///
/// Cheap to clone once built; derived clients (for example the mock HSM
/// signer connection) share transport settings and credentials.
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    access_token: Option<SecretString>,
}

impl Client {
    /// Create an unauthenticated client for the given core URL.
    pub fn new(url: &str) -> Result<Self> {
        ClientBuilder::new(url).build()
    }

    /// Create a client from a [`Config`].
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = ClientBuilder::new(&config.core.url)
            .timeout(Duration::from_millis(config.http.timeout_ms))
            .connect_timeout(Duration::from_millis(config.http.connect_timeout_ms));
        if let Some(token) = &config.core.access_token {
            builder = builder.access_token(token.expose_secret());
        }
        builder.build()
    }

    /// The base URL this client talks to.
    pub fn url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Derive a client rooted at a sub-path of this one, keeping transport
    /// settings and credentials. Used for the core-hosted mock HSM.
    pub(crate) fn with_base_path(&self, path: &str) -> Result<Self> {
        let base_url = self
            .base_url
            .join(path)
            .map_err(|e| Error::Config(format!("invalid base path {}: {}", path, e)))?;
        Ok(Self {
            http: self.http.clone(),
            base_url,
            access_token: self.access_token.as_ref().map(clone_secret),
        })
    }

    /// POST a JSON body to an endpoint and deserialize the JSON response.
    pub(crate) async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(endpoint, body).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            Error::Unexpected(format!(
                "malformed response from {}: {}",
                endpoint, e
            ))
        })
    }

    /// POST a JSON body, checking only for success. Used by endpoints that
    /// return no meaningful body (configure, reset, deletes, feed acks).
    pub(crate) async fn post_ok<B>(&self, endpoint: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        self.send(endpoint, body).await?;
        Ok(())
    }

    /// Fetch one page of a list endpoint.
    pub(crate) async fn fetch_page<T>(
        &self,
        endpoint: &'static str,
        params: &QueryParams,
    ) -> Result<Page<T>>
    where
        T: DeserializeOwned,
    {
        params.validate()?;
        let mut page: Page<T> = self.post(endpoint, params).await?;
        page.endpoint = endpoint;
        Ok(page)
    }

    async fn send<B>(&self, endpoint: &str, body: &B) -> Result<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| Error::InvalidArgument(format!("invalid endpoint {}: {}", endpoint, e)))?;
        let request_id = uuid::Uuid::new_v4().to_string();

        let mut request = self
            .http
            .post(url)
            .header("X-Request-Id", &request_id)
            .json(body);
        if let Some(token) = &self.access_token {
            let token = token.expose_secret();
            let (user, pass) = token.split_once(':').unwrap_or((token, ""));
            request = request.basic_auth(user, Some(pass));
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            tracing::debug!(endpoint, request_id, "Request succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(err) => {
                tracing::warn!(endpoint, request_id, code = %err.code, "API error");
                Err(Error::Api {
                    code: err.code,
                    message: err.message,
                    detail: err.detail,
                })
            }
            Err(_) => Err(unexpected_status(endpoint, status, &body)),
        }
    }
}

fn unexpected_status(endpoint: &str, status: StatusCode, body: &str) -> Error {
    let preview: String = body.chars().take(200).collect();
    Error::Unexpected(format!("{} returned {}: {}", endpoint, status, preview))
}

fn clone_secret(token: &SecretString) -> SecretString {
    SecretString::from(token.expose_secret().to_owned())
}

impl Clone for Client {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            access_token: self.access_token.as_ref().map(clone_secret),
        }
    }
}

// Implement Debug manually to avoid exposing the token
impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Builder for [`Client`]
pub struct ClientBuilder {
    url: String,
    access_token: Option<SecretString>,
    timeout: Duration,
    connect_timeout: Duration,
}

impl ClientBuilder {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            access_token: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Access token in `id:secret` form.
    pub fn access_token(mut self, token: &str) -> Self {
        self.access_token = Some(SecretString::from(token.to_string()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Client> {
        // A trailing slash keeps Url::join from eating the last path segment.
        let normalized = if self.url.ends_with('/') {
            self.url.clone()
        } else {
            format!("{}/", self.url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| Error::Config(format!("invalid core URL {}: {}", self.url, e)))?;

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()?;

        Ok(Client {
            http,
            base_url,
            access_token: self.access_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let client = Client::new("http://localhost:1999").unwrap();
        assert_eq!(client.url(), "http://localhost:1999/");
    }

    #[test]
    fn with_base_path_joins_relative() {
        let client = Client::new("http://localhost:1999").unwrap();
        let hsm = client.with_base_path("mockhsm/").unwrap();
        assert_eq!(hsm.url(), "http://localhost:1999/mockhsm/");
    }

    #[test]
    fn build_rejects_bad_url() {
        assert!(matches!(
            Client::new("not a url"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn debug_redacts_token() {
        let client = ClientBuilder::new("http://localhost:1999")
            .access_token("client:super-secret")
            .build()
            .unwrap();

        let debug = format!("{:?}", client);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn error_body_parses() {
        let body = r#"{"code":"CH006","message":"account not found","detail":"alias: bob"}"#;
        let err: ApiErrorBody = serde_json::from_str(body).unwrap();
        assert_eq!(err.code, "CH006");
        assert_eq!(err.detail.as_deref(), Some("alias: bob"));
    }
}
