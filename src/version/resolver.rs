//! Tag name resolution
//!
//! Consults the cache first, otherwise asks one of two remote sources
//! depending on the prerelease preference and caches the answer for an hour.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::config::{SourcesConfig, TAG_NAME_TTL_SECS};
use crate::version::cache::VersionCache;
use crate::version::error::ResolveError;
use crate::version::source::TagSource;
use crate::version::sources::{AtomFeedSource, LatestJsonSource};
use crate::version::tag::TagName;

pub struct TagResolver {
    cache: Arc<VersionCache>,
    prerelease_source: Arc<dyn TagSource>,
    stable_source: Arc<dyn TagSource>,
}

impl TagResolver {
    pub fn new(
        cache: Arc<VersionCache>,
        prerelease_source: Arc<dyn TagSource>,
        stable_source: Arc<dyn TagSource>,
    ) -> Self {
        Self {
            cache,
            prerelease_source,
            stable_source,
        }
    }

    /// Create a resolver backed by the configured feed and latest-release endpoints
    pub fn from_config(
        cache: Arc<VersionCache>,
        client: reqwest::Client,
        sources: &SourcesConfig,
    ) -> Self {
        Self::new(
            cache,
            Arc::new(AtomFeedSource::new(client.clone(), &sources.feed_url)),
            Arc::new(LatestJsonSource::new(client, &sources.latest_url)),
        )
    }

    /// Determine the tag name of the template release to install.
    ///
    /// A cached tag is returned without touching the network. Fetch or parse
    /// failures are returned as-is; no fallback tag is ever substituted.
    pub async fn resolve_tag_name(&self, allow_prerelease: bool) -> Result<TagName, ResolveError> {
        if let Some(tag_name) = self.cache.tag_name() {
            debug!("Using cached tag name {}", tag_name);
            return Ok(tag_name);
        }

        // The in-house endpoint only knows about stable releases
        let source = if allow_prerelease {
            &self.prerelease_source
        } else {
            &self.stable_source
        };

        let tag_name = source.fetch_tag_name().await.inspect_err(|e| {
            error!("Failed to resolve tag name from {}: {}", source.name(), e);
        })?;

        info!("Resolved tag name {} from {}", tag_name, source.name());
        self.cache
            .set_tag_name(tag_name.clone(), Duration::from_secs(TAG_NAME_TTL_SECS));

        Ok(tag_name)
    }
}
