//! In-house "latest release" endpoint, used for stable releases

use serde::Deserialize;
use tracing::{debug, warn};

use crate::version::error::ResolveError;
use crate::version::source::TagSource;
use crate::version::tag::TagName;

/// Response from the latest release endpoint
#[derive(Debug, Deserialize)]
struct LatestRelease {
    version: String,
}

/// Tag source backed by a `{"version": "..."}` document; the tag is `v` + version.
pub struct LatestJsonSource {
    client: reqwest::Client,
    url: String,
}

impl LatestJsonSource {
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl TagSource for LatestJsonSource {
    fn name(&self) -> &'static str {
        "latest-json"
    }

    async fn fetch_tag_name(&self) -> Result<TagName, ResolveError> {
        debug!("Fetching latest release: {}", self.url);

        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Latest release endpoint returned status {}: {}", status, self.url);
            return Err(ResolveError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let latest: LatestRelease = response.json().await.map_err(|e| {
            warn!("Failed to parse latest release response: {}", e);
            ResolveError::InvalidResponse(e.to_string())
        })?;

        let version = latest.version.trim();
        if version.is_empty() {
            return Err(ResolveError::InvalidResponse(
                "Latest release has an empty version".to_string(),
            ));
        }

        Ok(TagName::from_version(version))
    }
}
