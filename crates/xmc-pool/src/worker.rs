use std::io::{BufRead, BufReader, Write};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use ndarray::ArrayView2;
use xmc_core::errors::ErrorInfo;
use xmc_core::XmcError;

/// Target name that runs the worker command on this machine.
pub const LOCAL_TARGET: &str = "localhost";

/// How long a dropped worker gets to exit on EOF before it is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// A single evaluation endpoint able to score a chunk of parameter vectors.
pub trait Worker {
    /// Human readable name of the endpoint (host or label).
    fn target(&self) -> &str;

    /// Returns one log-probability per row of `chunk`, in row order.
    fn evaluate_chunk(&mut self, chunk: ArrayView2<'_, f64>) -> Result<Vec<f64>, XmcError>;
}

/// Settings shared by every worker process of a pool.
#[derive(Debug, Clone, Default)]
pub struct WorkerOptions {
    /// Command line started on each target.
    pub command: String,
    /// Directory the command runs in; `None` keeps the caller's directory.
    pub working_dir: Option<PathBuf>,
    /// Pass worker stderr through to the terminal.
    pub debug: bool,
}

/// Long-lived worker process speaking a line protocol over stdin/stdout.
///
/// Each parameter vector is written as one line of whitespace separated
/// values; the process answers with one log-probability per line, in order.
/// `localhost` targets run through `sh -c`, any other target through
/// `ssh <target>`.
///
/// Workers run in their own process group, so a terminal interrupt reaches
/// only the driver and the in-flight chunk can still be answered.
#[derive(Debug)]
pub struct CommandWorker {
    target: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl CommandWorker {
    /// Starts the worker process for `target`.
    pub fn spawn(target: &str, options: &WorkerOptions) -> Result<Self, XmcError> {
        let mut command = if target == LOCAL_TARGET {
            let mut command = Command::new("sh");
            command.arg("-c").arg(&options.command);
            if let Some(dir) = &options.working_dir {
                command.current_dir(dir);
            }
            command
        } else {
            let remote = match &options.working_dir {
                Some(dir) => format!("cd '{}' && {}", dir.display(), options.command),
                None => options.command.clone(),
            };
            let mut command = Command::new("ssh");
            command.arg(target).arg(remote);
            command
        };
        command
            .process_group(0)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(if options.debug {
                Stdio::inherit()
            } else {
                Stdio::null()
            });

        let mut child = command.spawn().map_err(|err| {
            XmcError::Pool(
                ErrorInfo::new("worker-spawn", err.to_string())
                    .with_context("target", target)
                    .with_context("command", options.command.clone()),
            )
        })?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take().ok_or_else(|| {
            XmcError::Pool(
                ErrorInfo::new("worker-stdout", "worker stdout was not captured")
                    .with_context("target", target),
            )
        })?;
        tracing::debug!(target_host = target, pid = child.id(), "started worker");
        Ok(Self {
            target: target.to_string(),
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    fn io_error(&self, code: &str, message: impl Into<String>) -> XmcError {
        XmcError::Pool(ErrorInfo::new(code, message).with_context("target", self.target.clone()))
    }
}

impl Worker for CommandWorker {
    fn target(&self) -> &str {
        &self.target
    }

    fn evaluate_chunk(&mut self, chunk: ArrayView2<'_, f64>) -> Result<Vec<f64>, XmcError> {
        let mut request = String::new();
        for row in chunk.rows() {
            let line: Vec<String> = row.iter().map(|value| value.to_string()).collect();
            request.push_str(&line.join(" "));
            request.push('\n');
        }
        let stdin = match self.stdin.as_mut() {
            Some(stdin) => stdin,
            None => return Err(self.io_error("worker-closed", "worker stdin already closed")),
        };
        if let Err(err) = stdin.write_all(request.as_bytes()).and_then(|_| stdin.flush()) {
            return Err(self.io_error("worker-write", err.to_string()));
        }

        let mut values = Vec::with_capacity(chunk.nrows());
        let mut line = String::new();
        while values.len() < chunk.nrows() {
            line.clear();
            let read = self
                .stdout
                .read_line(&mut line)
                .map_err(|err| self.io_error("worker-read", err.to_string()))?;
            if read == 0 {
                return Err(self.io_error("worker-exited", "worker closed its output mid-chunk"));
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let value: f64 = trimmed.parse().map_err(|_| {
                XmcError::Pool(
                    ErrorInfo::new("worker-response", "worker returned a non-numeric line")
                        .with_context("target", self.target.clone())
                        .with_context("line", trimmed.to_string()),
                )
            })?;
            values.push(value);
        }
        Ok(values)
    }
}

impl Drop for CommandWorker {
    fn drop(&mut self) {
        // closing stdin lets well-behaved workers exit on EOF
        drop(self.stdin.take());
        let deadline = Instant::now() + SHUTDOWN_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(10)),
                _ => break,
            }
        }
        tracing::debug!(target_host = %self.target, "worker ignored EOF, killing it");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
