//! Fake extraction workers backed by `sh` scripts

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use template_provisioner::progress::ProgressBus;
use template_provisioner::version::cache::VersionCache;
use template_provisioner::worker::supervisor::Supervisor;

/// A worker script that records its arguments and environment before running `body`.
///
/// `{dir}` in `body` is replaced with a scratch directory owned by the worker.
#[allow(dead_code)]
pub struct FakeWorker {
    dir: TempDir,
    body: String,
}

#[allow(dead_code)]
impl FakeWorker {
    pub fn new(body: &str) -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            body: body.to_string(),
        }
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn script(&self) -> String {
        let args = self.record_path("args");
        let force = self.record_path("force");
        let proxy = self.record_path("proxy");
        format!(
            "printf '%s\\n' \"$@\" >> '{args}'\n\
             echo \"$FORCE_EXTRACT\" >> '{force}'\n\
             echo \"$PROXY_TYPE|$PROXY_RULES|$PROXY_PAC_SCRIPT\" >> '{proxy}'\n\
             {body}\n",
            args = args.display(),
            force = force.display(),
            proxy = proxy.display(),
            body = self.body.replace("{dir}", &self.dir.path().display().to_string()),
        )
    }

    pub fn supervisor(&self, cache: Arc<VersionCache>, progress: ProgressBus) -> Supervisor {
        Supervisor::new("sh", cache, progress).with_leading_args([
            "-c".to_string(),
            self.script(),
            "template-worker".to_string(),
        ])
    }

    /// Arguments of every run, oldest first
    pub fn runs(&self) -> Vec<Vec<String>> {
        let raw = read_or_empty(&self.record_path("args"));
        let mut runs = Vec::new();
        let mut current: Vec<String> = Vec::new();
        for line in raw.lines() {
            if line == "--appVersion" && !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
            current.push(line.to_string());
        }
        if !current.is_empty() {
            runs.push(current);
        }
        runs
    }

    /// `FORCE_EXTRACT` of every run, oldest first
    pub fn force_flags(&self) -> Vec<String> {
        read_or_empty(&self.record_path("force"))
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// `PROXY_TYPE|PROXY_RULES|PROXY_PAC_SCRIPT` of every run, oldest first
    pub fn proxies(&self) -> Vec<String> {
        read_or_empty(&self.record_path("proxy"))
            .lines()
            .map(str::to_string)
            .collect()
    }
}

#[allow(dead_code)]
fn read_or_empty(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

/// Value following `flag` in an argument list
#[allow(dead_code)]
pub fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}
