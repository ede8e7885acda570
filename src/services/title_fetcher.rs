use std::time::Duration;

use regex::Regex;
use reqwest::{Client, StatusCode};
use thiserror::Error;

const USER_AGENT_STRING: &str = "lector/1.0";

/// Why a title could not be fetched. Callers substitute the raw URL on any
/// variant; none of these ever propagates past the aggregator.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("request failed with status {0}")]
    HttpStatus(StatusCode),
    #[error("failed to read or parse the page")]
    Parse,
    #[error("no title element in page")]
    NotFound,
}

/// Best-effort page title lookup for discovered articles that arrived
/// without one. Every fetch is bounded by its own timeout.
pub struct TitleFetcher {
    client: Client,
    timeout: Duration,
}

impl TitleFetcher {
    pub fn new(timeout_secs: u64) -> Self {
        let timeout = Duration::from_secs(timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT_STRING)
            .build()
            .expect("Failed to create HTTP client");
        Self { client, timeout }
    }

    pub async fn fetch_title(&self, url: &str) -> Result<String, FetchError> {
        // The client timeout covers the request; this one also bounds body
        // reads and parsing so a single unit of work can never hang.
        match tokio::time::timeout(self.timeout, self.fetch_inner(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        }
    }

    async fn fetch_inner(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Parse
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status));
        }

        let html = response.text().await.map_err(|_| FetchError::Parse)?;
        extract_title(&html).ok_or(FetchError::NotFound)
    }
}

/// Pull a usable title out of raw HTML: <title> first, then the first <h1>.
fn extract_title(html: &str) -> Option<String> {
    let title_re = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok()?;
    let h1_re = Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").ok()?;

    let raw = title_re
        .captures(html)
        .or_else(|| h1_re.captures(html))
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())?;

    // h1 content may itself contain markup
    let tag_re = Regex::new(r"<[^>]+>").ok()?;
    let cleaned = tag_re.replace_all(&raw, " ");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
