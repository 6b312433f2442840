//! Input contract for a single extraction run
//!
//! Everything the worker needs is passed on spawn: paths, platform, tag name
//! and cached metadata as arguments; proxy settings and the force-extract
//! flag through the environment.

use std::ffi::OsString;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::version::tag::TagName;

pub const ENV_PROXY_PAC_SCRIPT: &str = "PROXY_PAC_SCRIPT";
pub const ENV_PROXY_RULES: &str = "PROXY_RULES";
pub const ENV_PROXY_TYPE: &str = "PROXY_TYPE";
pub const ENV_FORCE_EXTRACT: &str = "FORCE_EXTRACT";
pub const ENV_APP_DATA_DIR: &str = "APP_DATA_DIR";

/// How network requests should be proxied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyType {
    #[default]
    None,
    System,
    FixedServers,
    PacScript,
}

impl ProxyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyType::None => "none",
            ProxyType::System => "system",
            ProxyType::FixedServers => "fixed_servers",
            ProxyType::PacScript => "pac_script",
        }
    }

    /// Parse the environment representation; unknown values mean no proxy
    pub fn from_env_value(value: &str) -> Self {
        match value {
            "system" => ProxyType::System,
            "fixed_servers" => ProxyType::FixedServers,
            "pac_script" => ProxyType::PacScript,
            _ => ProxyType::None,
        }
    }
}

/// Proxy settings forwarded to the worker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProxyConfig {
    pub pac_script: String,
    pub rules: String,
    #[serde(rename = "type")]
    pub proxy_type: ProxyType,
}

/// Everything needed to spawn one worker
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    pub app_version: String,
    pub template_path: PathBuf,
    pub template_zip_path: PathBuf,
    pub platform: String,
    pub arch: String,
    pub tag_name: TagName,
    /// Serialized template info from a previous run for the same tag
    pub template_info_json: Option<String>,
    pub proxy: ProxyConfig,
    pub force_extract: bool,
    /// Application data directory exposed to the worker
    pub app_data_dir: Option<PathBuf>,
}

impl ExtractionRequest {
    /// Worker argument list
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--appVersion".into(),
            self.app_version.clone().into(),
            "--templatePath".into(),
            self.template_path.clone().into(),
            "--templateZipPath".into(),
            self.template_zip_path.clone().into(),
            "--platform".into(),
            self.platform.clone().into(),
            "--arch".into(),
            self.arch.clone().into(),
            "--tagName".into(),
            self.tag_name.as_str().into(),
        ];

        if let Some(json) = &self.template_info_json {
            args.push("--templateInfoJson".into());
            args.push(json.clone().into());
        }

        args
    }

    /// Worker environment variables
    pub fn envs(&self) -> Vec<(&'static str, OsString)> {
        let mut envs: Vec<(&'static str, OsString)> = vec![
            (ENV_PROXY_PAC_SCRIPT, self.proxy.pac_script.clone().into()),
            (ENV_PROXY_RULES, self.proxy.rules.clone().into()),
            (ENV_PROXY_TYPE, self.proxy.proxy_type.as_str().into()),
            (ENV_FORCE_EXTRACT, self.force_extract.to_string().into()),
        ];

        if let Some(dir) = &self.app_data_dir {
            envs.push((ENV_APP_DATA_DIR, dir.clone().into()));
        }

        envs
    }
}

/// Platform identifier of the host in the form the worker expects
pub fn current_platform() -> &'static str {
    platform_id(std::env::consts::OS)
}

/// CPU architecture identifier of the host in the form the worker expects
pub fn current_arch() -> &'static str {
    arch_id(std::env::consts::ARCH)
}

fn platform_id(os: &'static str) -> &'static str {
    match os {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

fn arch_id(arch: &'static str) -> &'static str {
    match arch {
        "x86_64" => "x64",
        "x86" => "ia32",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        other => other,
    }
}
