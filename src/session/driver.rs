use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::common::config::{ProtocolConfig, TargetConfig};
use crate::common::{Error, Result};
use crate::fixture::Scenario;

use super::process::{spawn_drain, take_text, write_script, EngineProcess};
use super::script::build_script;
use super::{ErrorReason, ExitDisposition, SessionFault, Transcript};

/// How long readers may keep draining after the engine is gone
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Runs scenarios against fresh engine processes
#[derive(Debug, Clone)]
pub struct SessionDriver {
    program: PathBuf,
    args: Vec<String>,
    workdir: Option<PathBuf>,
    quit_command: String,
}

impl SessionDriver {
    pub fn new(target: &TargetConfig, protocol: &ProtocolConfig) -> Self {
        Self {
            program: target.program.clone(),
            args: target.args.clone(),
            workdir: target.workdir.clone(),
            quit_command: protocol.quit_command.clone(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Locate the engine binary without starting it
    ///
    /// Paths with a directory component are used as-is; bare names are
    /// looked up in PATH.
    pub fn resolve_program(&self) -> Result<PathBuf> {
        let display = self.program.display().to_string();
        let has_dir = self
            .program
            .parent()
            .is_some_and(|p| !p.as_os_str().is_empty());

        let resolved = if has_dir {
            let base = match &self.workdir {
                Some(dir) if self.program.is_relative() => dir.join(&self.program),
                _ => self.program.clone(),
            };
            if !base.is_file() {
                return Err(Error::launch_failed(&display, "program not found"));
            }
            base.canonicalize()
                .map_err(|e| Error::launch_failed(&display, &e.to_string()))?
        } else {
            which::which(&self.program)
                .map_err(|e| Error::launch_failed(&display, &e.to_string()))?
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&resolved)
                .map_err(|e| Error::launch_failed(&display, &e.to_string()))?
                .permissions()
                .mode();
            if mode & 0o111 == 0 {
                return Err(Error::launch_failed(&display, "program is not executable"));
            }
        }

        Ok(resolved)
    }

    /// Run one scenario against a fresh engine process
    ///
    /// Always resolves within `budget` plus a short drain grace period, and
    /// never returns while the engine is still alive.
    pub async fn run(&self, scenario: &Scenario, budget: Duration) -> Transcript {
        let started = Instant::now();

        let program = match self.resolve_program() {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(scenario = %scenario.id, "Launch failed: {}", e);
                return Transcript::launch_failure(e.to_string(), started.elapsed());
            }
        };

        let (mut engine, streams) =
            match EngineProcess::spawn(&program, &self.args, self.workdir.as_deref()) {
                Ok(spawned) => spawned,
                Err(e) => {
                    tracing::debug!(scenario = %scenario.id, "Launch failed: {}", e);
                    return Transcript::launch_failure(e.to_string(), started.elapsed());
                }
            };

        let script = build_script(scenario, &self.quit_command);
        tracing::debug!(scenario = %scenario.id, script = ?script, "Writing script");

        let (stdout_buf, stdout_task) = spawn_drain(streams.stdout);
        let (stderr_buf, stderr_task) = spawn_drain(streams.stderr);

        let session = async {
            write_script(streams.stdin, &script).await?;
            engine.wait().await
        };

        let outcome = timeout(budget, session).await;
        let (exit, mut fault) = match outcome {
            Ok(Ok(status)) => (ExitDisposition::Exited { code: status.code() }, None),
            Ok(Err(e)) => {
                tracing::warn!(scenario = %scenario.id, "Stream failure: {}", e);
                engine.terminate().await;
                (
                    ExitDisposition::Killed,
                    Some(SessionFault {
                        reason: ErrorReason::IoFailure,
                        message: format!("I/O error while driving engine: {}", e),
                    }),
                )
            }
            Err(_) => {
                tracing::warn!(
                    scenario = %scenario.id,
                    budget_ms = budget.as_millis() as u64,
                    "Engine exceeded its budget, killing it"
                );
                engine.terminate().await;
                (
                    ExitDisposition::KilledOnTimeout,
                    Some(SessionFault {
                        reason: ErrorReason::Timeout,
                        message: Error::Timeout(budget).to_string(),
                    }),
                )
            }
        };

        // The engine is gone; anything it left running in its group goes too.
        engine.kill_group();

        for (name, task) in [("stdout", stdout_task), ("stderr", stderr_task)] {
            let read_fault = finish_drain(name, task, DRAIN_GRACE).await;
            if fault.is_none() {
                fault = read_fault;
            }
        }

        let transcript = Transcript {
            stdout: take_text(&stdout_buf),
            stderr: take_text(&stderr_buf),
            exit,
            fault,
            elapsed: started.elapsed(),
        };

        tracing::debug!(
            scenario = %scenario.id,
            exit = %transcript.exit,
            elapsed_ms = transcript.elapsed.as_millis() as u64,
            stdout_bytes = transcript.stdout.len(),
            "Session finished"
        );

        transcript
    }
}

/// Wait briefly for a stream reader, aborting it if the stream stays open
///
/// A read error becomes an `io_failure` fault; whatever was read before it
/// stays in the shared buffer.
async fn finish_drain(
    name: &str,
    mut task: JoinHandle<std::io::Result<()>>,
    grace: Duration,
) -> Option<SessionFault> {
    match timeout(grace, &mut task).await {
        Ok(Ok(Ok(()))) => None,
        Ok(Ok(Err(e))) => Some(SessionFault {
            reason: ErrorReason::IoFailure,
            message: format!("I/O error reading engine {}: {}", name, e),
        }),
        Ok(Err(join_err)) => {
            tracing::warn!("Reader for engine {} failed: {}", name, join_err);
            None
        }
        Err(_) => {
            tracing::debug!("Engine {} still open after exit, keeping partial output", name);
            task.abort();
            None
        }
    }
}
