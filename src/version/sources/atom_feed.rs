//! Release feed (Atom) source, used when prereleases are allowed

use serde::Deserialize;
use tracing::{debug, warn};

use crate::version::error::ResolveError;
use crate::version::source::TagSource;
use crate::version::tag::TagName;

/// Atom feed document. Only the entry ids matter.
#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: String,
}

/// Tag source backed by a release feed.
///
/// Entries are assumed newest first; the tag is the last path segment of
/// the first entry's id, e.g. `tag:github.com,2008:Repository/123/v2.1.0`.
pub struct AtomFeedSource {
    client: reqwest::Client,
    url: String,
}

impl AtomFeedSource {
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

fn parse_first_tag(xml: &str) -> Result<TagName, ResolveError> {
    let feed: Feed = quick_xml::de::from_str(xml).map_err(|e| {
        warn!("Failed to parse release feed: {}", e);
        ResolveError::InvalidResponse(e.to_string())
    })?;

    let first = feed.entries.first().ok_or(ResolveError::EmptyFeed)?;
    let id = first.id.trim();

    match id.rsplit('/').next() {
        Some(tag) if !tag.is_empty() => Ok(TagName::new(tag)),
        _ => Err(ResolveError::InvalidResponse(format!(
            "Cannot derive a tag from entry id {:?}",
            id
        ))),
    }
}

#[async_trait::async_trait]
impl TagSource for AtomFeedSource {
    fn name(&self) -> &'static str {
        "release-feed"
    }

    async fn fetch_tag_name(&self) -> Result<TagName, ResolveError> {
        debug!("Fetching release feed: {}", self.url);

        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Release feed returned status {}: {}", status, self.url);
            return Err(ResolveError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let body = response.text().await?;
        parse_first_tag(&body)
    }
}
