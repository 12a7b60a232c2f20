use feed_rs::model::{self, FeedType, Link};
use feed_rs::parser::{self, ParseFeedError};
use sha2::{Digest, Sha256};

use super::model::{Feed, Item};

/// Parse an RSS, Atom or JSON Feed document.
///
/// The returned feed has an empty `feed_link`; the caller knows where the
/// bytes came from and stamps it with [`Feed::with_source`].
pub fn parse_feed(bytes: &[u8]) -> Result<Feed, ParseFeedError> {
    let feed = parser::parse(bytes)?;

    let items = feed.entries.into_iter().map(convert_entry).collect();

    Ok(Feed {
        title: feed
            .title
            .map(|t| t.content)
            .unwrap_or_default(),
        description: feed.description.map(|d| d.content),
        link: site_link(&feed.links),
        feed_link: String::new(),
        language: feed.language,
        updated: feed.updated,
        published: feed.published,
        feed_type: feed_type_name(&feed.feed_type).to_string(),
        items,
    })
}

fn convert_entry(entry: model::Entry) -> Item {
    let link = site_link(&entry.links);
    let links = entry.links.into_iter().map(|l| l.href).collect();
    let published = entry.published.or(entry.updated);
    let title = entry
        .title
        .map(|t| t.content)
        .unwrap_or_else(|| "Untitled".to_string());

    let existing_id = if entry.id.is_empty() {
        None
    } else {
        Some(entry.id.as_str())
    };
    let guid = generate_guid(
        existing_id,
        link.as_deref(),
        &title,
        published.map(|p| p.timestamp()),
    );

    Item {
        title,
        description: entry.summary.map(|s| s.content),
        content: entry.content.and_then(|c| c.body),
        link,
        links,
        guid,
        published,
        updated: entry.updated,
        authors: entry.authors.into_iter().map(|p| p.name).collect(),
        categories: entry.categories.into_iter().map(|c| c.term).collect(),
    }
}

/// Prefer the `alternate` link (the HTML page), falling back to the first one.
fn site_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.clone())
}

fn feed_type_name(feed_type: &FeedType) -> &'static str {
    match feed_type {
        FeedType::Atom => "atom",
        FeedType::JSON => "json",
        FeedType::RSS0 | FeedType::RSS1 | FeedType::RSS2 => "rss",
    }
}

fn generate_guid(
    existing: Option<&str>,
    url: Option<&str>,
    title: &str,
    published: Option<i64>,
) -> String {
    if let Some(guid) = existing {
        let trimmed = guid.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let input = format!(
        "{}|{}|{}",
        url.unwrap_or(""),
        title,
        published.map(|p| p.to_string()).unwrap_or_default()
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}
