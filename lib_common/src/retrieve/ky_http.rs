//! # HTTP Retrieval Utilities
//!
//! This module provides a robust, asynchronous API client wrapper around `reqwest`.
//! It includes optional middleware support for exponential backoff retries on
//! transient transport failures and standardized JSON response handling.
//!
//! Non-2xx statuses are *not* errors here: they come back as an [`ApiResponse`]
//! with `success == false` so that each API client can apply its own rules
//! (the chat endpoint, for example, reports failure inside a 200 body).

use std::time::Duration;

use reqwest::{
    header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE},
    Method, Url,
};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Transport-level failures raised by [`ApiClient`].
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// The base URL or joined path is not a valid absolute URL.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The underlying HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    Client(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection refused, DNS failure, reset, or any other transport error.
    #[error("network error: {0}")]
    Network(String),

    /// A 2xx body that is not the JSON shape the caller asked for.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RetrieveError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RetrieveError::Timeout(err.to_string())
        } else {
            RetrieveError::Network(err.to_string())
        }
    }

    fn from_middleware(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => Self::from_reqwest(e),
            reqwest_middleware::Error::Middleware(e) => RetrieveError::Network(e.to_string()),
        }
    }
}

/// A standardized container for API responses.
///
/// This struct wraps the deserialized data along with metadata about the
/// HTTP transaction, such as status codes and headers.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The successfully deserialized response body, if any.
    pub data: Option<T>,
    /// The raw error body returned by the server if the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
    /// The headers returned by the server.
    pub headers: HeaderMap,
}

/// Construction options for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiClientOptions {
    /// Per-request timeout applied by the underlying `reqwest::Client`.
    pub timeout: Duration,
    /// Value of the `User-Agent` header.
    pub user_agent: Option<String>,
    /// An optional Bearer token used for authorization.
    pub auth_token: Option<String>,
    /// Transient transport retries performed by the middleware. Zero disables it.
    pub transport_retries: u32,
}

impl Default for ApiClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: None,
            auth_token: None,
            transport_retries: 0,
        }
    }
}

/// A flexible asynchronous HTTP client.
///
/// Built on top of `reqwest_middleware`, it handles base URLs,
/// authentication tokens, timeouts and optional automatic retries.
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
    /// The base URL to which all relative paths are joined.
    base_url: Url,
    /// An optional Bearer token used for authorization.
    auth_token: Option<String>,
}

impl ApiClient {
    /// Creates a new `ApiClient` instance.
    ///
    /// # Arguments
    /// * `base_url` - The absolute base URL for the API (e.g., "https://api.example.com/v1/").
    ///   A trailing slash is added when missing so relative paths append rather than replace.
    /// * `options` - Timeout, user agent, auth token and transport retry settings.
    ///
    /// # Errors
    /// Returns [`RetrieveError::InvalidUrl`] if `base_url` is not absolute.
    pub fn new(base_url: &str, options: ApiClientOptions) -> Result<Self, RetrieveError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let url = Url::parse(&normalized)?;

        let mut builder = reqwest::Client::builder().timeout(options.timeout);
        if let Some(agent) = &options.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let http = builder
            .build()
            .map_err(|e| RetrieveError::Client(e.to_string()))?;

        let mut client = ClientBuilder::new(http);
        if options.transport_retries > 0 {
            let retry_policy =
                ExponentialBackoff::builder().build_with_max_retries(options.transport_retries);
            client = client.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }

        Ok(Self {
            inner: client.build(),
            base_url: url,
            auth_token: options.auth_token,
        })
    }

    /// The base URL all request paths are joined onto.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Performs a generic HTTP request and handles the response.
    ///
    /// This method manages URL joining, query parameters, authentication, and
    /// JSON serialization/deserialization.
    ///
    /// # Arguments
    /// * `method` - The HTTP verb (GET, POST, etc.).
    /// * `path` - The relative path to append to the base URL.
    /// * `query` - Query string pairs.
    /// * `body` - Optional serializable object to send as the JSON body.
    ///
    /// # Errors
    /// Returns a [`RetrieveError`] if URL joining, network execution or decoding of a
    /// 2xx body fails.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, RetrieveError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let full_url = self.base_url.join(path)?;
        let mut req = self.inner.request(method, full_url);

        if !query.is_empty() {
            req = req.query(query);
        }

        if let Some(token) = &self.auth_token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        if let Some(b) = body {
            let json_body = serde_json::to_string(b)?;
            req = req.header(CONTENT_TYPE, "application/json").body(json_body);
        }

        let response: reqwest::Response = req.send().await.map_err(RetrieveError::from_middleware)?;
        let status = response.status();
        let resp_headers = response.headers().clone();
        let text = response.text().await.map_err(RetrieveError::from_reqwest)?;

        if status.is_success() {
            let data = serde_json::from_str::<T>(&text)?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers: resp_headers,
            })
        } else {
            Ok(ApiResponse {
                data: None,
                error_body: Some(text),
                status: status.as_u16(),
                success: false,
                headers: resp_headers,
            })
        }
    }

    /// Shorthand for a bodiless GET.
    pub async fn get<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiResponse<T>, RetrieveError>
    where
        T: DeserializeOwned,
    {
        self.request::<T, ()>(Method::GET, path, query, None).await
    }

    /// Shorthand for a JSON POST.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, RetrieveError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request::<T, B>(Method::POST, path, &[], Some(body)).await
    }
}
