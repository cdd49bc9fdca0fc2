//! Best-effort companion video lookup.
//!
//! Queries a video search endpoint with the lesson title while the main
//! generation runs. Strictly optional: every failure mode (timeout, bad
//! status, unparseable body, empty result list) collapses to `None` and
//! the lesson ships without a video.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Where and how to search for companion videos.
#[derive(Debug, Clone)]
pub struct VideoLookup {
    /// Search endpoint; the query is appended as a `q` parameter.
    pub endpoint: String,
    /// Lookup budget. The pipeline never waits longer than this.
    pub timeout: Duration,
}

impl VideoLookup {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A video attached to a lesson.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VideoRef {
    pub video_id: String,
    pub name: String,
    pub channel: String,
    pub url: String,
    pub view_count_formatted: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    videos: Vec<VideoRef>,
}

/// Search for a video matching the lesson title. Returns the first hit,
/// or `None` on any failure.
pub async fn lookup_video(client: &Client, lookup: &VideoLookup, title: &str) -> Option<VideoRef> {
    let request = client
        .get(&lookup.endpoint)
        .query(&[("q", title)])
        .timeout(lookup.timeout)
        .send();

    let response = match tokio::time::timeout(lookup.timeout, request).await {
        Ok(Ok(response)) if response.status().is_success() => response,
        _ => return None,
    };

    let parsed: SearchResponse = match response.json().await {
        Ok(parsed) => parsed,
        Err(_) => return None,
    };

    if !parsed.success {
        return None;
    }
    parsed.videos.into_iter().next()
}
