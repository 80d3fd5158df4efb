//! Sandboxed evaluation of untrusted snippets

use std::io::{Seek, SeekFrom, Write};
use std::process::Stdio;
use std::time::Duration;

use evalbot_common::{EvalOptions, EvalOutcome, EvalRequest};
use uuid::Uuid;

use crate::invoker::{InvokeError, TimedInvoker, WorkerOutput};
use crate::worker::WorkerCommand;
use crate::{blacklist, normalize, output};

/// Stderr lines that are interpreter start-up noise, never the real error.
const STDERR_NOISE: &[&str] = &["", "'import site' failed"];

/// Prepares a snippet, runs it in the isolated worker, and classifies the
/// result. Every failure mode is folded into an [`EvalOutcome`]; this type
/// never returns an error to its caller.
#[derive(Debug, Clone)]
pub struct SandboxRunner {
    invoker: TimedInvoker,
    worker: WorkerCommand,
    default_timeout: Duration,
    blacklist_enabled: bool,
    stringmode: bool,
    /// Bounds for the chat-safe form (0 disables either).
    max_lines: usize,
    max_length: usize,
}

impl SandboxRunner {
    pub fn new(worker: WorkerCommand) -> Self {
        Self {
            invoker: TimedInvoker::new(),
            worker,
            default_timeout: Duration::from_secs(5),
            blacklist_enabled: false,
            stringmode: true,
            max_lines: 0,
            max_length: 0,
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_blacklist(mut self, enabled: bool) -> Self {
        self.blacklist_enabled = enabled;
        self
    }

    /// Disable the chat newline convention (input came from a file).
    pub fn with_stringmode(mut self, enabled: bool) -> Self {
        self.stringmode = enabled;
        self
    }

    /// Bounds applied when the caller asks for chat-safe output.
    pub fn with_output_limits(mut self, max_lines: usize, max_length: usize) -> Self {
        self.max_lines = max_lines;
        self.max_length = max_length;
        self
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Evaluate a full request, attributing log output to its identity.
    pub async fn run_request(&self, request: &EvalRequest) -> EvalOutcome {
        tracing::debug!(
            identity = %request.identity,
            code_len = request.code.len(),
            "evaluation requested"
        );
        self.run(&request.code, &request.options).await
    }

    /// Evaluate one snippet.
    ///
    /// Returns the raw outcome when `options.raw_output` is set, else the
    /// chat-safe reduction of it.
    pub async fn run(&self, code: &str, options: &EvalOptions) -> EvalOutcome {
        let outcome = self.run_raw(code, options).await;
        if options.raw_output {
            outcome
        } else {
            let safe = output::reduce(
                &outcome.payload,
                outcome.is_error(),
                self.max_lines,
                self.max_length,
            );
            EvalOutcome {
                status: outcome.status,
                payload: safe,
            }
        }
    }

    async fn run_raw(&self, code: &str, options: &EvalOptions) -> EvalOutcome {
        if code.is_empty() {
            return EvalOutcome::rejected("no input.");
        }
        let stripped = normalize::strip_whitespace(code);
        if stripped.trim().is_empty() {
            return EvalOutcome::rejected("only whitespace found.");
        }

        if options.use_blacklist.unwrap_or(self.blacklist_enabled) {
            if let Some(message) = blacklist::find(&stripped) {
                tracing::info!(reason = message, "input rejected by pre-filter");
                return EvalOutcome::rejected(message);
            }
        }

        let timeout = options.timeout.unwrap_or(self.default_timeout);
        if timeout.is_zero() {
            // A missing deadline for untrusted code is a caller bug, not a
            // supported mode.
            return EvalOutcome::runtime_error(
                "unlimited execution is not allowed for sandboxed code.",
            );
        }

        let run_id = Uuid::new_v4();
        let prepared = normalize::prepare(code, self.stringmode);

        let stdin = match self.spool_input(&prepared) {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!(%run_id, error = %err, "failed to spool worker input");
                return EvalOutcome::runtime_error(format!("evaluation failed to start: {}", err));
            }
        };

        let mut command = self.worker.build(Some(timeout));
        command.stdin(Stdio::from(stdin));

        tracing::debug!(
            %run_id,
            worker = %self.worker.program.display(),
            timeout_secs = timeout.as_secs(),
            code_len = prepared.len(),
            "starting worker"
        );

        match self.invoker.run(command, Some(timeout)).await {
            Ok(output) => self.classify(run_id, output),
            Err(InvokeError::TimedOut(limit)) => {
                tracing::info!(%run_id, limit_secs = limit.as_secs(), "worker exceeded deadline");
                EvalOutcome::timed_out()
            }
            Err(err) => {
                tracing::warn!(%run_id, error = %err, "worker failed");
                EvalOutcome::runtime_error(format!("evaluation failed: {}", err))
            }
        }
    }

    /// Write the prepared snippet to a caller-invisible temporary file and
    /// hand back a read handle positioned at the start. The path is unlinked
    /// immediately; the worker reads through the inherited descriptor.
    fn spool_input(&self, prepared: &str) -> std::io::Result<std::fs::File> {
        let builder_dir = self.worker.temp_dir.clone();
        let mut spool = match builder_dir {
            Some(dir) => tempfile::Builder::new()
                .prefix("evalbot-input")
                .tempfile_in(dir)?,
            None => tempfile::Builder::new().prefix("evalbot-input").tempfile()?,
        };
        spool.write_all(prepared.as_bytes())?;
        spool.seek(SeekFrom::Start(0))?;
        spool.reopen()
    }

    /// Pick stdout if any lines were produced, else the tail of stderr.
    ///
    /// The worker framework emits verbose diagnostics before the actual
    /// error on some failure paths, so only the last non-noise stderr line
    /// is meaningful. A couple of known internal markers are remapped to
    /// fixed user-facing phrases.
    fn classify(&self, run_id: Uuid, output: WorkerOutput) -> EvalOutcome {
        if !output.stdout.is_empty() {
            return EvalOutcome::ok(output.stdout.join("\n"));
        }

        let tail = output
            .stderr
            .iter()
            .map(String::as_str)
            .filter(|line| !STDERR_NOISE.contains(line))
            .last();

        if let Some(line) = tail {
            let text = match line {
                "RuntimeError" => "operation not permitted in the sandbox.",
                "[Subprocess killed by SIGIOT]" => "crash! the interpreter choked.",
                other => other,
            };
            return EvalOutcome::ok(text);
        }

        if !output.exited_cleanly() {
            tracing::warn!(%run_id, status = ?output.status, "worker exited silently with failure");
            return EvalOutcome::runtime_error("the worker crashed without output.");
        }

        EvalOutcome::ok("No output.")
    }
}
