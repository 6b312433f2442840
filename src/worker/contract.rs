//! Worker-side view of the spawn contract
//!
//! A worker binary parses its arguments with [`WorkerArgs`], reads proxy
//! settings and the force flag with [`WorkerEnv::from_env`], and talks back
//! to the supervisor through a [`WorkerReporter`].

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use serde_json::Value;

use crate::worker::message::{TemplateInfo, WorkerError, WorkerMessage};
use crate::worker::request::{
    ENV_APP_DATA_DIR, ENV_FORCE_EXTRACT, ENV_PROXY_PAC_SCRIPT, ENV_PROXY_RULES, ENV_PROXY_TYPE,
    ProxyConfig, ProxyType,
};

/// Arguments every worker receives
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(name = "template-worker")]
pub struct WorkerArgs {
    #[arg(long = "appVersion")]
    pub app_version: String,
    #[arg(long = "templatePath")]
    pub template_path: PathBuf,
    #[arg(long = "templateZipPath")]
    pub template_zip_path: PathBuf,
    #[arg(long)]
    pub platform: String,
    #[arg(long)]
    pub arch: String,
    #[arg(long = "tagName")]
    pub tag_name: String,
    #[arg(long = "templateInfoJson")]
    pub template_info_json: Option<String>,
}

impl WorkerArgs {
    /// Cached template info passed by the supervisor, if it parses
    pub fn template_info(&self) -> Option<TemplateInfo> {
        self.template_info_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
    }
}

/// Settings passed to the worker through its environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEnv {
    pub proxy: ProxyConfig,
    pub force_extract: bool,
    pub app_data_dir: Option<PathBuf>,
}

impl WorkerEnv {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let string = |key: &str| {
            lookup(key)
                .map(|value| value.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        Self {
            proxy: ProxyConfig {
                pac_script: string(ENV_PROXY_PAC_SCRIPT),
                rules: string(ENV_PROXY_RULES),
                proxy_type: ProxyType::from_env_value(&string(ENV_PROXY_TYPE)),
            },
            force_extract: string(ENV_FORCE_EXTRACT) == "true",
            app_data_dir: lookup(ENV_APP_DATA_DIR).map(PathBuf::from),
        }
    }
}

/// Writes worker messages as NDJSON
pub struct WorkerReporter<W: Write> {
    out: W,
}

impl WorkerReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> WorkerReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn template_info(&mut self, info: TemplateInfo) -> io::Result<()> {
        self.send(&WorkerMessage::TemplateInfo(info))
    }

    pub fn progress(&mut self, payload: Value) -> io::Result<()> {
        self.send(&WorkerMessage::Progress(payload))
    }

    pub fn error(&mut self, error: WorkerError) -> io::Result<()> {
        self.send(&WorkerMessage::Error(error))
    }

    fn send(&mut self, message: &WorkerMessage) -> io::Result<()> {
        writeln!(self.out, "{}", message.to_line())?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
