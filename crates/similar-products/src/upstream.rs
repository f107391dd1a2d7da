//! HTTP client for the upstream product service.
//!
//! - `GET {base}/product/{id}/similarids` returns a JSON array of ids
//! - `GET {base}/product/{id}` returns a JSON product
//!
//! A 404 becomes [`FetchError::NotFound`]; every other failure is mapped onto
//! the rest of the [`FetchError`] taxonomy. Each call, including reading and
//! decoding the body, runs under a single time limit.

use crate::config::UpstreamConfig;
use crate::error::{ConfigError, FetchError};
use crate::model::{ProductId, ProductResponse};
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tower::service_fn;
use tower::util::BoxCloneSyncService;
use tracing::{debug, warn};

/// Longest error body kept in [`FetchError::Upstream`].
const MAX_ERROR_BODY: usize = 256;

/// A raw upstream operation, before any resilience layer.
pub type UpstreamService<Res> = BoxCloneSyncService<ProductId, Res, FetchError>;

/// Client for the product service. Cheap to clone.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(ConfigError::HttpClient)?;
        Self::with_http_client(http, config)
    }

    /// Uses an existing `reqwest` client, e.g. one with a shared pool.
    pub fn with_http_client(
        http: reqwest::Client,
        config: &UpstreamConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            http,
            base_url: config.base_url()?,
            timeout: config.timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetches the ids similar to `id`, in upstream ranking order.
    ///
    /// Blank or null entries are dropped.
    pub async fn fetch_similar_ids(&self, id: &ProductId) -> Result<Vec<ProductId>, FetchError> {
        let url = self.product_url(id, Some("similarids"));
        let raw: Vec<Option<String>> = self.get_json(url).await?;

        let ids = raw
            .into_iter()
            .filter_map(|entry| {
                let parsed = entry.as_deref().map(ProductId::parse);
                match parsed {
                    Some(Ok(similar)) => Some(similar),
                    _ => {
                        warn!(product_id = %id, entry = ?entry, "Dropping blank similar product id");
                        None
                    }
                }
            })
            .collect();
        Ok(ids)
    }

    /// Fetches the raw product payload for `id`.
    pub async fn fetch_product(&self, id: &ProductId) -> Result<ProductResponse, FetchError> {
        let url = self.product_url(id, None);
        self.get_json(url).await
    }

    /// The similar-ids lookup as a Tower service.
    pub fn similar_ids_service(&self) -> UpstreamService<Vec<ProductId>> {
        let client = self.clone();
        BoxCloneSyncService::new(service_fn(move |id: ProductId| {
            let client = client.clone();
            async move { client.fetch_similar_ids(&id).await }
        }))
    }

    /// The product lookup as a Tower service.
    pub fn product_service(&self) -> UpstreamService<ProductResponse> {
        let client = self.clone();
        BoxCloneSyncService::new(service_fn(move |id: ProductId| {
            let client = client.clone();
            async move { client.fetch_product(&id).await }
        }))
    }

    /// `{base}/product/{id}[/{suffix}]`, with `id` encoded as one path segment.
    pub(crate) fn product_url(&self, id: &ProductId, suffix: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        // the base url was checked to accept path segments
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("product").push(id.as_str());
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        debug!(%url, "Calling upstream");

        let call = async {
            let response = self
                .http
                .get(url.clone())
                .header(ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Err(FetchError::NotFound);
            }
            if !status.is_success() {
                let mut message = response.text().await.unwrap_or_default();
                truncate(&mut message, MAX_ERROR_BODY);
                return Err(FetchError::Upstream {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| self.transport_error(e))?;
            serde_json::from_slice(&body).map_err(|e| FetchError::Malformed(e.to_string()))
        };

        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                after: self.timeout,
            }),
        };

        if let Err(error) = &result {
            if error.is_not_found() {
                debug!(%url, "Upstream returned not found");
            } else {
                warn!(%url, %error, "Upstream call failed");
            }
        }
        result
    }

    fn transport_error(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                after: self.timeout,
            }
        } else {
            FetchError::Transport(error.to_string())
        }
    }
}

fn truncate(message: &mut String, max: usize) {
    if message.len() > max {
        let mut end = max;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }
}
