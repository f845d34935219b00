use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{
    HeaderMap, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
};
use std::time::{Duration, Instant};
use thiserror::Error;

use super::cache::{cache_key, CacheEntry, CacheHandle};
use crate::config::{Config, Options};

const MAX_BODY_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching a document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded its timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Cache-only fetch and nothing is cached for this URL
    #[error("Not in cache")]
    NotCached,
}

/// How a fetch may use the shared cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Serve fresh cache entries, otherwise revalidate over the network.
    #[default]
    Default,
    /// Serve from cache only, never touch the network.
    Offline,
    /// Always go to the network.
    Refresh,
}

impl CachePolicy {
    /// `cache` wins over `force`; neither means [`CachePolicy::Default`].
    pub fn from_options(options: &Options) -> Self {
        if options.cache {
            CachePolicy::Offline
        } else if options.force {
            CachePolicy::Refresh
        } else {
            CachePolicy::Default
        }
    }
}

/// One document fetch.
#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    /// Form-encoded body; turns the request into a POST.
    pub post: Option<&'a str>,
    pub follow_redirects: bool,
    pub policy: CachePolicy,
    /// Cached responses younger than this are served as-is.
    pub min_freshness: Duration,
    /// On a live failure, cached responses younger than this are served instead.
    pub max_freshness: Option<Duration>,
    pub timeout: Duration,
}

impl<'a> FetchRequest<'a> {
    pub fn get(url: &'a str, policy: CachePolicy, timeout: Duration) -> Self {
        Self {
            url,
            post: None,
            follow_redirects: true,
            policy,
            min_freshness: Duration::ZERO,
            max_freshness: None,
            timeout,
        }
    }
}

/// A fetched document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// Final URL after redirects.
    pub url: String,
    pub body: Vec<u8>,
    /// `charset` parameter of the Content-Type header.
    pub encoding: Option<String>,
    /// Lowercased MIME type without parameters.
    pub content_type: String,
}

impl FetchResponse {
    /// Decodes the body as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// MIME types treated as HTML pages.
pub const HTML_MIME_TYPES: [&str; 3] = ["text/html", "application/xhtml+xml", "application/xml"];

/// Retrieves documents for the pipeline.
///
/// Implementations must return (or fail) within `request.timeout`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<FetchResponse, FetchError>;
}

/// reqwest-backed fetcher with a shared response cache and conditional requests.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    no_redirect_client: reqwest::Client,
    cache: CacheHandle,
}

impl HttpFetcher {
    pub fn new(config: &Config, cache: CacheHandle) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;
        let no_redirect_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            no_redirect_client,
            cache,
        })
    }

    async fn fetch_live(
        &self,
        request: &FetchRequest<'_>,
        key: &str,
        cached: Option<&CacheEntry>,
    ) -> Result<FetchResponse, FetchError> {
        let client = if request.follow_redirects {
            &self.client
        } else {
            &self.no_redirect_client
        };

        let mut builder = match request.post {
            Some(body) => client
                .post(request.url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body.to_owned()),
            None => client.get(request.url),
        };

        if request.policy != CachePolicy::Refresh {
            if let Some(entry) = cached {
                if let Some(etag) = &entry.etag {
                    builder = builder.header(IF_NONE_MATCH, etag.as_str());
                }
                if let Some(modified) = &entry.last_modified {
                    builder = builder.header(IF_MODIFIED_SINCE, modified.as_str());
                }
            }
        }

        let response = builder.send().await?;

        if response.status() == reqwest::StatusCode::NOT_MODIFIED {
            if let Some(entry) = cached {
                tracing::debug!(url = %request.url, "Not modified, serving cached copy");
                self.cache.touch(key);
                return Ok(entry.response.clone());
            }
        }

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let url = response.url().to_string();
        let headers = response.headers().clone();
        let (content_type, encoding) = parse_content_type(&headers);
        let body = read_limited_bytes(response, MAX_BODY_SIZE).await?;

        let fetched = FetchResponse {
            url,
            body,
            encoding,
            content_type,
        };

        self.cache.put(
            key.to_owned(),
            CacheEntry {
                response: fetched.clone(),
                etag: header_string(&headers, ETAG),
                last_modified: header_string(&headers, LAST_MODIFIED),
                stored_at: Instant::now(),
            },
        );

        Ok(fetched)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<FetchResponse, FetchError> {
        let key = cache_key(request.url, request.post);
        let cached = self.cache.get(&key);

        match request.policy {
            CachePolicy::Offline => {
                return cached.map(|entry| entry.response).ok_or(FetchError::NotCached);
            }
            CachePolicy::Default => {
                if let Some(entry) = cached.as_ref().filter(|e| e.age() < request.min_freshness) {
                    tracing::trace!(url = %request.url, "Serving fresh cached copy");
                    return Ok(entry.response.clone());
                }
            }
            CachePolicy::Refresh => {}
        }

        let result = tokio::time::timeout(
            request.timeout,
            self.fetch_live(request, &key, cached.as_ref()),
        )
        .await
        .unwrap_or(Err(FetchError::Timeout));

        match (result, cached, request.max_freshness) {
            (Err(e), Some(entry), Some(max_age))
                if request.policy == CachePolicy::Default && entry.age() < max_age =>
            {
                tracing::debug!(url = %request.url, error = %e, "Fetch failed, serving stale copy");
                Ok(entry.response)
            }
            (result, _, _) => result,
        }
    }
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Splits a Content-Type header into a lowercased MIME type and its charset.
fn parse_content_type(headers: &HeaderMap) -> (String, Option<String>) {
    let raw = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let mut parts = raw.split(';');
    let mime = parts.next().unwrap_or("").trim().to_lowercase();
    let charset = parts.find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_lowercase())
    });

    (mime, charset)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
