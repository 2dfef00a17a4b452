//! Where raw rows come from.
//!
//! [`RowSource`] is the seam between the control plane and the network.
//! [`SocrataClient`] is the production implementation; tests plug in fakes.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use nycdata_model::Row;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use crate::error::CoreError;

pub const DEFAULT_BASE_URL: &str = "https://data.cityofnewyork.us/resource";

/// Header Socrata reads app tokens from.
pub const APP_TOKEN_HEADER: &str = "X-App-Token";

const ERROR_SNIPPET_CHARS: usize = 300;

/// Fetches one page of rows for a dataset.
///
/// Implementations map non-2xx responses to [`CoreError::Upstream`] and
/// network failures to [`CoreError::Transient`] so the retry layer can
/// classify them.
pub trait RowSource: Send + Sync + 'static {
    fn fetch_rows(
        &self,
        dataset_id: &str,
        params: &BTreeMap<String, String>,
    ) -> impl Future<Output = Result<Vec<Row>, CoreError>> + Send;
}

/// Connection settings for [`SocrataClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocrataConfig {
    pub base_url: String,
    pub app_token: Option<String>,
    pub timeout: Duration,
}

impl Default for SocrataConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            app_token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// `reqwest` client for the Socrata resource API.
#[derive(Debug, Clone)]
pub struct SocrataClient {
    client: reqwest::Client,
    base_url: String,
}

impl SocrataClient {
    /// Builds a client with the configured timeout and optional app token.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidInput` if the app token is not a valid header
    /// value, or `CoreError::Transient` if the TLS backend fails to initialize.
    pub fn new(config: &SocrataConfig) -> Result<Self, CoreError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = config.app_token.as_deref().filter(|token| !token.is_empty()) {
            let value = HeaderValue::from_str(token).map_err(|_| {
                crate::error::InvalidInput::new(
                    "app_token",
                    "app token contains characters not allowed in an HTTP header",
                    "Copy the Socrata app token again without surrounding whitespace.",
                )
            })?;
            headers.insert(APP_TOKEN_HEADER, value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .user_agent(concat!("nycdata-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| CoreError::Transient(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn dataset_url(&self, dataset_id: &str) -> String {
        format!("{}/{dataset_id}.json", self.base_url)
    }
}

impl RowSource for SocrataClient {
    async fn fetch_rows(
        &self,
        dataset_id: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Vec<Row>, CoreError> {
        let url = self.dataset_url(dataset_id);
        debug!(dataset_id, ?params, "requesting rows");
        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(transient)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream(status, &body));
        }

        response.json::<Vec<Row>>().await.map_err(transient)
    }
}

fn transient(err: reqwest::Error) -> CoreError {
    CoreError::Transient(err.without_url().to_string())
}

fn upstream(status: StatusCode, body: &str) -> CoreError {
    let snippet: String = body.trim().chars().take(ERROR_SNIPPET_CHARS).collect();
    let message = if snippet.is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        snippet
    };
    CoreError::Upstream {
        status: status.as_u16(),
        message,
    }
}
