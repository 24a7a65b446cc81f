//! HTTP client for the IndustryDB API

use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use industrydb_common::{
    ApiConfig, Error, PreviewRequest, PreviewResponse, Result, SearchFilters, SearchResponse,
    SearchResultPage, UsageInfo, UsageResponse,
};

use crate::api::LeadsApi;

const SEARCH_PATH: &str = "/api/v1/leads/search";
const PREVIEW_PATH: &str = "/api/v1/leads/preview";
const USAGE_PATH: &str = "/api/v1/usage";

/// reqwest-backed [`LeadsApi`]
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new client
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("industrydb-client/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(transport_error)?;
        let response = check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| Error::Decode(e.to_string()))
    }
}

#[async_trait]
impl LeadsApi for HttpClient {
    async fn search(
        &self,
        filters: &SearchFilters,
        cancel: &CancellationToken,
    ) -> Result<SearchResultPage> {
        let request = self
            .request(Method::GET, SEARCH_PATH)
            .query(&filters.query_pairs());

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Search request aborted");
                Err(Error::Cancelled)
            }
            response = self.send::<SearchResponse>(request) => response.map(Into::into),
        }
    }

    async fn preview(&self, filters: &SearchFilters) -> Result<u64> {
        let request = self
            .request(Method::POST, PREVIEW_PATH)
            .json(&PreviewRequest::from(filters));
        let response: PreviewResponse = self.send(request).await?;
        Ok(response.estimated_count)
    }

    async fn usage(&self) -> Result<UsageInfo> {
        let response: UsageResponse = self.send(self.request(Method::GET, USAGE_PATH)).await?;
        Ok(response.into())
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Network(format!("request timed out: {}", e))
    } else {
        Error::Network(e.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), "API returned an error");

    Err(Error::from_status(status.as_u16(), &body, retry_after))
}
