//! Source trait for looking up the current release tag

#[cfg(test)]
use mockall::automock;

use crate::version::error::ResolveError;
use crate::version::tag::TagName;

/// Trait for fetching the current tag name from a remote source
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait TagSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Fetches the tag name of the newest release
    ///
    /// # Returns
    /// * `Ok(TagName)` - The tag of the newest release
    /// * `Err(ResolveError)` - If the fetch or the parse fails
    async fn fetch_tag_name(&self) -> Result<TagName, ResolveError>;
}
