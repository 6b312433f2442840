//! Extraction worker supervision
//!
//! One worker process is spawned per [`Supervisor::run_extraction`] call and
//! driven through `Spawned -> Running -> {Succeeded, Failed}`:
//!
//! - messages are read from the worker's stdout in emission order and applied
//!   to an [`ExtractionRun`]
//! - stdout is drained before the exit status is applied, so every progress
//!   event is published before the run resolves; output still arriving after
//!   the worker exited is read for a short grace period only
//! - stdout is read as raw bytes, so a line that is not UTF-8 is ignored
//!   like any other unrecognized message
//! - exit code 1 fails the run; any other exit code succeeds and clears the
//!   sticky force-extract flag
//!
//! No retries happen here. The worker is killed if the run is dropped or
//! exceeds the configured deadline.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStdout, Command};
use tracing::{debug, error, info, warn};

use crate::config::{DEFAULT_TEMPLATE_VERSION, STDOUT_DRAIN_GRACE_MS};
use crate::progress::{ProgressBus, ProgressEvent};
use crate::version::cache::VersionCache;
use crate::version::tag::TagName;
use crate::worker::error::ExtractionError;
use crate::worker::message::{WorkerError, WorkerMessage};
use crate::worker::request::ExtractionRequest;

/// Whether the next extraction must ignore an existing extracted template.
///
/// Starts set for the first attempt after process start, is cleared by a
/// successful run and stays set across failed runs.
#[derive(Debug)]
pub struct ForceExtract(AtomicBool);

impl ForceExtract {
    pub fn new() -> Self {
        Self(AtomicBool::new(true))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for ForceExtract {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionState {
    Spawned,
    Running,
    Succeeded,
    Failed,
}

/// State of a single worker run, fed by worker messages and finished by its exit status
#[derive(Debug)]
pub struct ExtractionRun {
    tag_name: TagName,
    state: ExtractionState,
    installed_version: Option<String>,
    pending_error: Option<WorkerError>,
}

impl ExtractionRun {
    pub fn new(tag_name: TagName) -> Self {
        Self {
            tag_name,
            state: ExtractionState::Spawned,
            installed_version: None,
            pending_error: None,
        }
    }

    pub fn state(&self) -> ExtractionState {
        self.state
    }

    /// Apply one worker message
    pub fn handle_message(
        &mut self,
        message: WorkerMessage,
        cache: &VersionCache,
        progress: &ProgressBus,
    ) {
        if self.state == ExtractionState::Spawned {
            self.state = ExtractionState::Running;
        }

        match message {
            WorkerMessage::TemplateInfo(info) => {
                debug!("Worker reported template version {}", info.version);
                match serde_json::to_string(&info) {
                    Ok(json) => cache.set_template_info_json(self.tag_name.clone(), json),
                    Err(e) => warn!("Failed to serialize template info: {}", e),
                }
                self.installed_version = Some(info.version);
            }
            WorkerMessage::Progress(payload) => {
                progress.publish(ProgressEvent(payload));
            }
            WorkerMessage::Error(error) => {
                debug!("Worker reported error {}: {}", error.name, error.message);
                self.pending_error = Some(error);
            }
            WorkerMessage::Unknown(raw) => {
                info!("Unrecognized worker message: {}", raw);
            }
        }
    }

    /// Resolve the run from the worker's exit code (`None` when killed by a signal)
    pub fn finish(&mut self, exit_code: Option<i32>) -> Result<String, ExtractionError> {
        let result = match exit_code {
            Some(1) => Err(self
                .pending_error
                .take()
                .map(ExtractionError::from)
                .unwrap_or(ExtractionError::UnexplainedFailure)),
            Some(_) => Ok(self
                .installed_version
                .take()
                .unwrap_or_else(|| DEFAULT_TEMPLATE_VERSION.to_string())),
            None => Err(ExtractionError::Terminated),
        };

        self.state = if result.is_ok() {
            ExtractionState::Succeeded
        } else {
            ExtractionState::Failed
        };
        debug!("Extraction run for {} ended as {:?}", self.tag_name, self.state);

        result
    }
}

pub struct Supervisor {
    program: PathBuf,
    leading_args: Vec<OsString>,
    timeout: Option<Duration>,
    cache: Arc<VersionCache>,
    progress: ProgressBus,
    force_extract: ForceExtract,
}

impl Supervisor {
    pub fn new(
        program: impl Into<PathBuf>,
        cache: Arc<VersionCache>,
        progress: ProgressBus,
    ) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            timeout: None,
            cache,
            progress,
            force_extract: ForceExtract::new(),
        }
    }

    /// Arguments placed before the worker argument contract (e.g. a script path)
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Kill the worker and fail the run if it takes longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Current value of the sticky force-extract flag
    pub fn force_extract(&self) -> bool {
        self.force_extract.get()
    }

    pub fn progress(&self) -> &ProgressBus {
        &self.progress
    }

    /// Spawn one worker for `request` and wait for it to finish.
    ///
    /// Returns the template version the worker installed.
    pub async fn run_extraction(
        &self,
        request: &ExtractionRequest,
    ) -> Result<String, ExtractionError> {
        info!(
            "Starting extraction of {} (force_extract={})",
            request.tag_name, request.force_extract
        );

        let result = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.drive_worker(request))
                .await
                .unwrap_or(Err(ExtractionError::TimedOut(timeout))),
            None => self.drive_worker(request).await,
        };

        match &result {
            Ok(version) => {
                self.force_extract.clear();
                info!("Extraction of {} finished, installed {}", request.tag_name, version);
            }
            Err(e) => error!("Extraction of {} failed: {}", request.tag_name, e),
        }

        result
    }

    async fn drive_worker(&self, request: &ExtractionRequest) -> Result<String, ExtractionError> {
        let mut child = Command::new(&self.program)
            .args(&self.leading_args)
            .args(request.args())
            .envs(request.envs())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ExtractionError::Spawn)?;

        let mut run = ExtractionRun::new(request.tag_name.clone());
        debug!("Spawned worker {:?} (pid {:?})", self.program, child.id());

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("worker stderr: {}", line);
                }
            });
        }

        let mut stdout = child.stdout.take().map(BufReader::new);
        let mut line = Vec::new();

        let status = match stdout.as_mut() {
            Some(reader) => loop {
                tokio::select! {
                    read = reader.read_until(b'\n', &mut line) => {
                        if read? == 0 {
                            // EOF: every message has been applied
                            break child.wait().await?;
                        }
                        self.apply_line(&mut run, &line);
                        line.clear();
                    }
                    status = child.wait() => {
                        let status = status?;
                        self.drain_stdout(reader, &mut line, &mut run).await?;
                        break status;
                    }
                }
            },
            None => child.wait().await?,
        };
        debug!("Worker exited with {}", status);

        run.finish(status.code())
    }

    /// Apply what is left on stdout after the worker exited.
    ///
    /// A detached grandchild may keep the pipe open, so reading stops after
    /// [`STDOUT_DRAIN_GRACE_MS`] even without EOF.
    async fn drain_stdout(
        &self,
        reader: &mut BufReader<ChildStdout>,
        line: &mut Vec<u8>,
        run: &mut ExtractionRun,
    ) -> Result<(), ExtractionError> {
        let drain = async {
            while reader.read_until(b'\n', line).await? > 0 {
                self.apply_line(run, line);
                line.clear();
            }
            Ok::<_, std::io::Error>(())
        };

        match tokio::time::timeout(Duration::from_millis(STDOUT_DRAIN_GRACE_MS), drain).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!("Worker exited but its stdout is still open; ignoring further output");
                Ok(())
            }
        }
    }

    /// Decode one raw stdout line and apply it. Invalid UTF-8 is replaced, so
    /// such a line ends up as an unknown message instead of failing the run.
    fn apply_line(&self, run: &mut ExtractionRun, raw: &[u8]) {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        run.handle_message(WorkerMessage::parse_line(line), &self.cache, &self.progress);
    }
}
