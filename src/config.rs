use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::worker::request::{ProxyConfig, ProxyType};

// =============================================================================
// Time-related constants
// =============================================================================

/// Lifetime of the resolved tag name in seconds (1 hour)
pub const TAG_NAME_TTL_SECS: u64 = 60 * 60;

/// Timeout for fetch operations in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// Defaults
// =============================================================================

/// Release feed, consulted only when prereleases are allowed
pub const DEFAULT_FEED_URL: &str = "https://github.com/atomery/juli/releases.atom";

/// In-house "latest release" document. Used instead of the GitHub API,
/// which is limited to 60 unauthenticated requests per hour.
pub const DEFAULT_LATEST_URL: &str = "https://juli.webcatalogapp.com/releases/latest.json";

/// Version reported when a worker succeeds without sending template info
pub const DEFAULT_TEMPLATE_VERSION: &str = "0.0.0";

/// Buffered progress events per subscriber before it starts lagging
pub const PROGRESS_CHANNEL_CAPACITY: usize = 256;

/// How long to keep reading worker stdout after the worker has exited (500 ms).
/// Bounds the wait when a detached grandchild still holds the pipe open.
pub const STDOUT_DRAIN_GRACE_MS: u64 = 500;

const DEFAULT_TEMPLATE_DIR_NAME: &str = "template";
const DEFAULT_TEMPLATE_ZIP_NAME: &str = "template.zip";

const USER_AGENT: &str = concat!("template-provisioner/", env!("CARGO_PKG_VERSION"));

/// Provisioning configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProvisionConfig {
    pub allow_prerelease: bool,
    pub sources: SourcesConfig,
    pub worker: WorkerConfig,
    pub proxy: ProxyConfig,
    pub template_dir_name: String,
    pub template_zip_name: String,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            allow_prerelease: false,
            sources: SourcesConfig::default(),
            worker: WorkerConfig::default(),
            proxy: ProxyConfig::default(),
            template_dir_name: DEFAULT_TEMPLATE_DIR_NAME.to_string(),
            template_zip_name: DEFAULT_TEMPLATE_ZIP_NAME.to_string(),
        }
    }
}

impl ProvisionConfig {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Template storage directory under the given user data directory
    pub fn template_path(&self, user_data_dir: &Path) -> PathBuf {
        user_data_dir.join(&self.template_dir_name)
    }

    /// Archive staging path under the given user data directory
    pub fn template_zip_path(&self, user_data_dir: &Path) -> PathBuf {
        user_data_dir.join(&self.template_zip_name)
    }
}

/// Remote endpoints used to resolve the tag name
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SourcesConfig {
    pub feed_url: String,
    pub latest_url: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            latest_url: DEFAULT_LATEST_URL.to_string(),
        }
    }
}

/// Extraction worker configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkerConfig {
    /// Worker executable; `None` means the caller must supply one
    pub program: Option<PathBuf>,
    /// Arguments placed before the worker argument contract
    pub args: Vec<String>,
    /// Deadline for a single worker run in milliseconds
    pub timeout_ms: Option<u64>,
}

impl WorkerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Build the HTTP client used by the tag sources, honoring the proxy settings.
pub fn build_http_client(proxy: &ProxyConfig) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_millis(FETCH_TIMEOUT_MS));

    match proxy.proxy_type {
        ProxyType::None => builder = builder.no_proxy(),
        ProxyType::System => {}
        ProxyType::FixedServers => {
            for rule in parse_proxy_rules(&proxy.rules) {
                let url = rule.url();
                builder = builder.proxy(match rule.scheme {
                    Some(ProxyScheme::Http) => reqwest::Proxy::http(&url)?,
                    Some(ProxyScheme::Https) => reqwest::Proxy::https(&url)?,
                    None => reqwest::Proxy::all(&url)?,
                });
            }
        }
        ProxyType::PacScript => {
            tracing::warn!(
                "PAC scripts are not evaluated for version lookups; connecting directly"
            );
            builder = builder.no_proxy();
        }
    }

    builder.build()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProxyScheme {
    Http,
    Https,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProxyRule {
    scheme: Option<ProxyScheme>,
    server: String,
}

impl ProxyRule {
    fn url(&self) -> String {
        if self.server.contains("://") {
            self.server.clone()
        } else {
            format!("http://{}", self.server)
        }
    }
}

/// Parse `;`-separated proxy rules: `http=host:port`, `https=host:port` or bare `host:port`.
/// Rules for other schemes are skipped.
fn parse_proxy_rules(rules: &str) -> Vec<ProxyRule> {
    rules
        .split(';')
        .map(str::trim)
        .filter(|rule| !rule.is_empty())
        .filter_map(|rule| match rule.split_once('=') {
            Some((scheme, server)) => {
                let scheme = match scheme.trim() {
                    "http" => ProxyScheme::Http,
                    "https" => ProxyScheme::Https,
                    other => {
                        tracing::debug!("Ignoring proxy rule for scheme {}", other);
                        return None;
                    }
                };
                Some(ProxyRule {
                    scheme: Some(scheme),
                    server: server.trim().to_string(),
                })
            }
            None => Some(ProxyRule {
                scheme: None,
                server: rule.to_string(),
            }),
        })
        .collect()
}

/// Returns the path to the data directory for template-provisioner.
/// Uses $XDG_DATA_HOME/template-provisioner if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/template-provisioner,
/// or ./template-provisioner if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the default configuration file.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("template-provisioner.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("template-provisioner")
}
