//! Candidate discovery.
//!
//! A [`FeedSource`] lists candidate clips for a channel, newest-rated first.
//! The production implementation reads a subreddit's listing endpoint; tests
//! substitute in-memory fakes.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use rf_core::{Error, Result};

/// One candidate clip as reported by the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateItem {
    /// Feed-assigned post identifier.
    pub id: String,
    /// Source URL to hand to the downloader.
    pub url: String,
    /// Human title, carried into the caption manifest.
    pub title: String,
    /// Whether the feed flags this entry as a video.
    pub is_video: bool,
}

/// Lists candidate clips for a channel, best-rated first. The list is
/// finite; callers are free to stop early.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn list_ranked(&self, channel: &str) -> Result<Vec<CandidateItem>>;
}

/// Feed backed by a subreddit listing.
///
/// `mode` selects the listing: `"hot"` reads `/r/{channel}/hot.json`, any
/// other value reads `/r/{channel}/top.json?t={mode}`.
pub struct RedditFeed {
    client: reqwest::Client,
    base_url: String,
    mode: String,
}

const FEED_LIMIT: u32 = 100;
const USER_AGENT: &str = concat!("reelforged/", env!("CARGO_PKG_VERSION"));

impl RedditFeed {
    pub fn new(mode: impl Into<String>) -> Result<Self> {
        Self::with_base_url("https://www.reddit.com", mode)
    }

    pub fn with_base_url(base_url: impl Into<String>, mode: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            mode: mode.into(),
        })
    }

    fn listing_url(&self, channel: &str) -> String {
        if self.mode == "hot" {
            format!("{}/r/{}/hot.json?limit={}", self.base_url, channel, FEED_LIMIT)
        } else {
            format!(
                "{}/r/{}/top.json?t={}&limit={}",
                self.base_url, channel, self.mode, FEED_LIMIT
            )
        }
    }
}

#[async_trait]
impl FeedSource for RedditFeed {
    async fn list_ranked(&self, channel: &str) -> Result<Vec<CandidateItem>> {
        if channel.is_empty() {
            return Err(Error::invalid("channel name must not be empty"));
        }
        let url = self.listing_url(channel);
        tracing::debug!(%url, "fetching feed listing");

        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::not_found("channel", channel));
        }
        let response = response.error_for_status()?;
        let body = response.text().await?;
        parse_listing(&body)
    }
}

/// Parse a listing document into candidates, preserving feed order.
pub fn parse_listing(body: &str) -> Result<Vec<CandidateItem>> {
    let listing: Listing = serde_json::from_str(body)?;
    Ok(listing
        .data
        .children
        .into_iter()
        .map(|child| CandidateItem {
            id: child.data.id,
            url: child.data.url,
            title: child.data.title,
            is_video: child.data.is_video,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: PostData,
}

#[derive(Debug, Deserialize)]
struct PostData {
    #[serde(default)]
    id: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    is_video: bool,
}
