use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One fetched and parsed feed source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub title: String,
    pub description: Option<String>,
    /// Site link declared by the document itself.
    pub link: Option<String>,
    /// URL the feed was requested from. Set by the caller after parsing,
    /// never taken from the document.
    pub feed_link: String,
    pub language: Option<String>,
    pub updated: Option<DateTime<Utc>>,
    pub published: Option<DateTime<Utc>>,
    /// `rss`, `atom` or `json`.
    pub feed_type: String,
    pub items: Vec<Item>,
}

impl Feed {
    /// Stamp the URL this feed was fetched from.
    pub fn with_source(mut self, url: impl Into<String>) -> Self {
        self.feed_link = url.into();
        self
    }
}

/// A single entry of a [`Feed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub link: Option<String>,
    pub links: Vec<String>,
    pub guid: String,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
}

/// Response payload for a user's feeds: one entry per subscription that could
/// be fetched, in subscription order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedCollection {
    #[serde(rename = "Feeds")]
    pub feeds: Vec<Feed>,
}
