//! Console script runner.
//!
//! [`ScriptRunner::run`] validates the script, spawns it under tokio and
//! returns a [`RunHandle`] straight away. The caller decides how long to wait
//! and tells apart the three outcomes: completion, cancellation and
//! interruption of the wait.

mod ansi;

pub use ansi::strip_ansi;

use crate::errors::ConsoleError;
use crate::project::validate_script;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Per-line callback for [`OutputSink::Lines`].
pub type LineSink = Box<dyn FnMut(&str) + Send>;

/// Where a run's output goes.
pub enum OutputSink {
    /// Inherit the terminal, the interactive default.
    Console,
    /// Discard everything.
    Silent,
    /// Copy raw stdout into a file opened with create + truncate.
    File(PathBuf),
    /// Deliver each completed stdout line, ANSI sequences stripped.
    Lines(LineSink),
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputSink::Console => write!(f, "Console"),
            OutputSink::Silent => write!(f, "Silent"),
            OutputSink::File(path) => write!(f, "File({})", path.display()),
            OutputSink::Lines(_) => write!(f, "Lines(..)"),
        }
    }
}

/// Caller-owned buffer for [`OutputSink::Lines`] that keeps every line
/// followed by `\n`.
#[derive(Debug, Clone, Default)]
pub struct LineCollector {
    buf: Arc<Mutex<String>>,
}

impl LineCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(&self) -> OutputSink {
        let buf = Arc::clone(&self.buf);
        OutputSink::Lines(Box::new(move |line| {
            let mut buf = buf.lock().unwrap_or_else(|e| e.into_inner());
            buf.push_str(line);
            buf.push('\n');
        }))
    }

    pub fn contents(&self) -> String {
        self.buf.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Outcome of a finished (or abandoned) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub cancelled: bool,
}

impl ExecutionResult {
    pub fn completed(exit_code: i32) -> Self {
        Self {
            exit_code,
            cancelled: false,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            exit_code: -1,
            cancelled: true,
        }
    }

    /// Usable output means a completed run with exit code 0.
    pub fn check(&self) -> Result<(), ConsoleError> {
        if self.cancelled {
            Err(ConsoleError::ProcessCancelled)
        } else if self.exit_code != 0 {
            Err(ConsoleError::NonZeroExit {
                exit_code: self.exit_code,
            })
        } else {
            Ok(())
        }
    }
}

/// Sticky interrupt signal shared between a waiter and whoever interrupts it.
///
/// Once raised it stays raised, so every later wait fails fast with
/// [`ConsoleError::Interrupted`].
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    token: CancellationToken,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.token.cancel();
    }

    pub fn is_raised(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the interrupt is raised.
    pub async fn raised(&self) {
        self.token.cancelled().await;
    }
}

/// One invocation of the console script.
#[derive(Debug)]
pub struct RunRequest {
    pub arguments: Vec<String>,
    pub sink: OutputSink,
    pub display_name: String,
}

impl RunRequest {
    pub fn new<I, S>(arguments: I, sink: OutputSink) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let arguments: Vec<String> = arguments.into_iter().map(Into::into).collect();
        let display_name = arguments.first().cloned().unwrap_or_default();
        Self {
            arguments,
            sink,
            display_name,
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }
}

/// Launches the console script with a fixed working directory.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    script: PathBuf,
    working_dir: PathBuf,
    interpreter: Option<String>,
    default_params: Vec<String>,
}

impl ScriptRunner {
    pub fn new(script: impl AsRef<Path>, working_dir: impl AsRef<Path>) -> Self {
        Self {
            script: script.as_ref().to_path_buf(),
            working_dir: working_dir.as_ref().to_path_buf(),
            interpreter: None,
            default_params: Vec::new(),
        }
    }

    pub fn with_interpreter(mut self, interpreter: Option<String>) -> Self {
        self.interpreter = interpreter.filter(|i| !i.trim().is_empty());
        self
    }

    pub fn with_default_params(mut self, params: Vec<String>) -> Self {
        self.default_params = params;
        self
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn validate(&self) -> Result<(), ConsoleError> {
        validate_script(&self.script, self.interpreter.as_deref())
    }

    /// Full argument vector after the program: default params, then `arguments`.
    pub fn all_params(&self, arguments: &[String]) -> Vec<String> {
        self.default_params
            .iter()
            .chain(arguments.iter())
            .cloned()
            .collect()
    }

    fn command(&self, arguments: &[String]) -> Command {
        let mut cmd = match &self.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(&self.script);
                cmd
            }
            None => Command::new(&self.script),
        };
        cmd.args(self.all_params(arguments))
            .current_dir(&self.working_dir)
            .kill_on_drop(true);
        cmd
    }

    /// Spawn the script and return without waiting for it.
    pub fn run(&self, request: RunRequest) -> Result<RunHandle, ConsoleError> {
        self.validate()?;

        let RunRequest {
            arguments,
            sink,
            display_name,
        } = request;
        let mut cmd = self.command(&arguments);

        let mut line_sink = None;
        match sink {
            OutputSink::Console => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
            OutputSink::Silent => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null());
            }
            OutputSink::File(path) => {
                let file = std::fs::File::create(&path)
                    .map_err(|source| ConsoleError::OutputFile { path, source })?;
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::from(file))
                    .stderr(Stdio::null());
            }
            OutputSink::Lines(sink) => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::null());
                line_sink = Some(sink);
            }
        }

        tracing::debug!(
            script = %self.script.display(),
            args = ?self.all_params(&arguments),
            "Running {}",
            display_name
        );

        let mut child = cmd.spawn().map_err(ConsoleError::SpawnFailed)?;
        let lines = match line_sink {
            Some(sink) => child.stdout.take().map(|stdout| (stdout, sink)),
            None => None,
        };

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(supervise(child, lines, cancel_rx));

        Ok(RunHandle {
            display_name,
            cancel_tx: Some(cancel_tx),
            task,
        })
    }
}

async fn forward_lines(stdout: ChildStdout, mut sink: LineSink) -> std::io::Result<()> {
    let mut segments = BufReader::new(stdout).split(b'\n');
    while let Some(segment) = segments.next_segment().await? {
        let raw = String::from_utf8_lossy(&segment);
        let line = raw.strip_suffix('\r').unwrap_or(&raw);
        sink(&*strip_ansi(line));
    }
    Ok(())
}

enum Supervised {
    Exited(std::io::Result<std::process::ExitStatus>),
    Cancelled,
}

async fn supervise(
    mut child: Child,
    lines: Option<(ChildStdout, LineSink)>,
    cancel_rx: oneshot::Receiver<()>,
) -> Result<ExecutionResult, ConsoleError> {
    let supervised = {
        let work = async {
            if let Some((stdout, sink)) = lines {
                forward_lines(stdout, sink).await?;
            }
            child.wait().await
        };
        tokio::select! {
            status = work => Supervised::Exited(status),
            // A dropped handle counts as cancellation too.
            _ = cancel_rx => Supervised::Cancelled,
        }
    };

    match supervised {
        Supervised::Exited(status) => {
            let status = status.map_err(ConsoleError::SpawnFailed)?;
            Ok(ExecutionResult::completed(status.code().unwrap_or(-1)))
        }
        Supervised::Cancelled => {
            if let Err(e) = child.start_kill() {
                tracing::debug!("Failed to kill cancelled cake script: {}", e);
            }
            Ok(ExecutionResult::cancelled())
        }
    }
}

enum Waited {
    Finished(Result<Result<ExecutionResult, ConsoleError>, tokio::task::JoinError>),
    Interrupted,
    TimedOut,
}

/// Handle to a running console script.
#[derive(Debug)]
pub struct RunHandle {
    display_name: String,
    cancel_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<ExecutionResult, ConsoleError>>,
}

impl RunHandle {
    /// Ask the process to stop. Termination is not awaited.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Wait for the run with an optional upper bound.
    ///
    /// A wait that times out cancels the run and reports it as cancelled. An
    /// interrupt abandons the run and returns [`ConsoleError::Interrupted`],
    /// leaving `interrupt` raised.
    pub async fn wait(
        mut self,
        timeout: Option<Duration>,
        interrupt: &Interrupt,
    ) -> Result<ExecutionResult, ConsoleError> {
        if interrupt.is_raised() {
            self.cancel();
            return Err(ConsoleError::Interrupted);
        }

        let deadline = async {
            match timeout {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        let waited = tokio::select! {
            res = &mut self.task => Waited::Finished(res),
            _ = interrupt.raised() => Waited::Interrupted,
            _ = deadline => Waited::TimedOut,
        };

        match waited {
            Waited::Finished(Ok(result)) => {
                if let Ok(r) = &result {
                    tracing::debug!(
                        exit_code = r.exit_code,
                        cancelled = r.cancelled,
                        "{} finished",
                        self.display_name
                    );
                }
                result
            }
            Waited::Finished(Err(e)) => {
                tracing::warn!("{} supervisor task failed: {}", self.display_name, e);
                Ok(ExecutionResult::cancelled())
            }
            Waited::Interrupted => {
                self.cancel();
                Err(ConsoleError::Interrupted)
            }
            Waited::TimedOut => {
                tracing::info!("{} timed out, cancelling", self.display_name);
                self.cancel();
                Ok(ExecutionResult::cancelled())
            }
        }
    }
}
