//! Remote fallback resolver.
//!
//! Used only when the local matcher finds nothing. One GET per query against an
//! encyclopedia summary endpoint; no retries and no caching. Every failure collapses into
//! [`LookupOutcome::NotFound`] or [`LookupOutcome::Error`], neither of which is fatal to
//! the caller.

use crate::config::CoreConfig;
use crate::{CoreResult, MedinfoError};
use async_trait::async_trait;
use medinfo_types::QueryText;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Summary projected from a remote encyclopedia page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteSummary {
    pub title: String,
    pub description: Option<String>,
    pub extract: String,
    pub thumbnail_url: Option<String>,
    pub page_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(RemoteSummary),
    /// The endpoint answered but has no usable page for the query.
    NotFound,
    /// Transport, status or decode failure. Logged by the caller, never shown as an error.
    Error(String),
}

#[async_trait]
pub trait SummaryLookup: Send + Sync {
    async fn lookup(&self, query: &QueryText) -> LookupOutcome;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SummaryKind {
    Standard,
    Disambiguation,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct SummaryDto {
    #[serde(rename = "type")]
    kind: SummaryKind,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    thumbnail: Option<ThumbnailDto>,
    #[serde(default)]
    content_urls: Option<ContentUrlsDto>,
}

#[derive(Debug, Deserialize)]
struct ThumbnailDto {
    source: String,
}

#[derive(Debug, Deserialize)]
struct ContentUrlsDto {
    desktop: PageUrlsDto,
}

#[derive(Debug, Deserialize)]
struct PageUrlsDto {
    page: String,
}

impl SummaryDto {
    fn into_outcome(self) -> LookupOutcome {
        if matches!(self.kind, SummaryKind::Other) {
            return LookupOutcome::NotFound;
        }

        let Some(title) = self.title else {
            return LookupOutcome::Error("summary response has no title".into());
        };
        let Some(content_urls) = self.content_urls else {
            return LookupOutcome::Error("summary response has no canonical page URL".into());
        };

        LookupOutcome::Found(RemoteSummary {
            title,
            description: self.description.filter(|d| !d.trim().is_empty()),
            extract: self.extract.unwrap_or_default(),
            thumbnail_url: self.thumbnail.map(|t| t.source),
            page_url: content_urls.desktop.page,
        })
    }
}

fn parse_summary(body: &[u8]) -> LookupOutcome {
    match serde_json::from_slice::<SummaryDto>(body) {
        Ok(dto) => dto.into_outcome(),
        Err(e) => LookupOutcome::Error(format!("invalid summary JSON payload: {e}")),
    }
}

/// Reqwest-backed summary lookup against one endpoint.
#[derive(Debug, Clone)]
pub struct HttpSummaryClient {
    client: Client,
    endpoint: Url,
}

impl HttpSummaryClient {
    /// Build a client for `endpoint`; `timeout` of `None` means wait indefinitely.
    ///
    /// # Errors
    ///
    /// Returns `MedinfoError::InvalidEndpoint` when the endpoint cannot take path segments,
    /// or `MedinfoError::HttpClient` when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Option<Duration>) -> CoreResult<Self> {
        if endpoint.cannot_be_a_base() {
            return Err(MedinfoError::InvalidEndpoint(endpoint.to_string()));
        }

        let mut builder = Client::builder().user_agent(concat!(
            "medinfo/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(MedinfoError::HttpClient)?;

        Ok(Self { client, endpoint })
    }

    pub fn from_config(cfg: &CoreConfig) -> CoreResult<Self> {
        Self::new(cfg.summary_endpoint().clone(), cfg.fallback_timeout())
    }

    /// Endpoint URL with the query appended as one percent-encoded path segment.
    pub fn summary_url(&self, query: &QueryText) -> Url {
        let mut url = self.endpoint.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(query.as_str());
        }
        url
    }
}

#[async_trait]
impl SummaryLookup for HttpSummaryClient {
    async fn lookup(&self, query: &QueryText) -> LookupOutcome {
        let url = self.summary_url(query);
        tracing::debug!("fallback lookup {}", url);

        let response = match self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return LookupOutcome::Error(transport_message(&e)),
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return LookupOutcome::NotFound;
        }
        if !status.is_success() {
            return LookupOutcome::Error(format!("status {}", status.as_u16()));
        }

        match response.bytes().await {
            Ok(body) => parse_summary(&body),
            Err(e) => LookupOutcome::Error(transport_message(&e)),
        }
    }
}

fn transport_message(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("timed out: {error}")
    } else {
        format!("transport: {error}")
    }
}
