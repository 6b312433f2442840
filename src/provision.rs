//! Provisioning entry point: resolve the tag name, then extract it

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::info;

use crate::config::{ProvisionConfig, build_http_client};
use crate::progress::{ProgressBus, ProgressEvent};
use crate::version::cache::VersionCache;
use crate::version::error::ResolveError;
use crate::version::resolver::TagResolver;
use crate::version::tag::TagName;
use crate::worker::error::ExtractionError;
use crate::worker::request::{ExtractionRequest, ProxyConfig, current_arch, current_platform};
use crate::worker::supervisor::Supervisor;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Failed to resolve template version: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Failed to extract template: {0}")]
    Extraction(#[from] ExtractionError),
}

/// What the caller knows before a tag name is resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionRequest {
    pub app_version: String,
    pub platform: String,
    pub arch: String,
    pub template_path: PathBuf,
    pub template_zip_path: PathBuf,
    pub proxy: ProxyConfig,
    pub app_data_dir: Option<PathBuf>,
}

impl ProvisionRequest {
    /// Request for the host platform with template paths under `user_data_dir`
    pub fn for_user_data_dir(
        app_version: &str,
        user_data_dir: &Path,
        config: &ProvisionConfig,
    ) -> Self {
        Self {
            app_version: app_version.to_string(),
            platform: current_platform().to_string(),
            arch: current_arch().to_string(),
            template_path: config.template_path(user_data_dir),
            template_zip_path: config.template_zip_path(user_data_dir),
            proxy: config.proxy.clone(),
            app_data_dir: Some(user_data_dir.to_path_buf()),
        }
    }

    fn into_extraction(
        self,
        tag_name: TagName,
        template_info_json: Option<String>,
        force_extract: bool,
    ) -> ExtractionRequest {
        ExtractionRequest {
            app_version: self.app_version,
            template_path: self.template_path,
            template_zip_path: self.template_zip_path,
            platform: self.platform,
            arch: self.arch,
            tag_name,
            template_info_json,
            proxy: self.proxy,
            force_extract,
            app_data_dir: self.app_data_dir,
        }
    }
}

/// Composes tag resolution and extraction.
///
/// Assumes at most one `provision` call in flight at a time: the tag cache
/// and the force-extract flag are shared across calls.
pub struct Provisioner {
    cache: Arc<VersionCache>,
    resolver: TagResolver,
    supervisor: Supervisor,
}

impl Provisioner {
    pub fn new(cache: Arc<VersionCache>, resolver: TagResolver, supervisor: Supervisor) -> Self {
        Self {
            cache,
            resolver,
            supervisor,
        }
    }

    /// Build a provisioner from configuration, spawning `worker_program` for extraction
    pub fn from_config(
        config: &ProvisionConfig,
        worker_program: PathBuf,
    ) -> Result<Self, ResolveError> {
        let cache = Arc::new(VersionCache::new());
        let client = build_http_client(&config.proxy)?;
        let resolver = TagResolver::from_config(cache.clone(), client, &config.sources);
        let supervisor = Supervisor::new(worker_program, cache.clone(), ProgressBus::new())
            .with_leading_args(&config.worker.args)
            .with_timeout(config.worker.timeout());

        Ok(Self::new(cache, resolver, supervisor))
    }

    /// Receive progress from every provisioning run started after this call
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.supervisor.progress().subscribe()
    }

    /// Whether the next run will force a clean extraction
    pub fn force_extract(&self) -> bool {
        self.supervisor.force_extract()
    }

    pub async fn resolve_tag_name(&self, allow_prerelease: bool) -> Result<TagName, ResolveError> {
        self.resolver.resolve_tag_name(allow_prerelease).await
    }

    /// Resolve the tag name and run one extraction for it.
    ///
    /// Returns the installed template version. Failures are returned
    /// unchanged; retrying is up to the caller, and a retry after a failure
    /// forces a clean extraction.
    pub async fn provision(
        &self,
        allow_prerelease: bool,
        request: ProvisionRequest,
    ) -> Result<String, ProvisionError> {
        let tag_name = self.resolver.resolve_tag_name(allow_prerelease).await?;
        let template_info_json = self.cache.template_info_json(&tag_name);

        info!(
            "Provisioning template {} (cached info: {})",
            tag_name,
            template_info_json.is_some()
        );

        let request = request.into_extraction(
            tag_name,
            template_info_json,
            self.supervisor.force_extract(),
        );

        Ok(self.supervisor.run_extraction(&request).await?)
    }
}
