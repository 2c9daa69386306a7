//! Scoped engine process handle
//!
//! Spawning yields an `EngineProcess`. The engine leads its own process
//! group; the group is killed once the session is over, even after a clean
//! exit, and dropping the handle does the same, so nothing the engine
//! started can leak into the next session.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::common::{Error, Result};

/// Output collected by a background reader, readable even if the reader never finishes
pub type SharedBuffer = Arc<Mutex<Vec<u8>>>;

/// A running engine with piped stdio
pub struct EngineProcess {
    child: Child,
    pid: Option<u32>,
    reaped: bool,
    group_killed: bool,
}

/// The three stdio ends, taken from the child right after spawn
pub struct EngineStreams {
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

impl EngineProcess {
    /// Spawn the engine in its own process group
    pub fn spawn(
        program: &Path,
        args: &[String],
        workdir: Option<&Path>,
    ) -> Result<(Self, EngineStreams)> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = workdir {
            cmd.current_dir(dir);
        }

        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::launch_failed(&program.display().to_string(), &e.to_string()))?;

        let missing = |stream: &str| {
            Error::launch_failed(
                &program.display().to_string(),
                &format!("failed to get engine {}", stream),
            )
        };
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

        let pid = child.id();
        tracing::debug!(program = %program.display(), ?pid, "Spawned engine");

        Ok((
            Self {
                child,
                pid,
                reaped: false,
                group_killed: false,
            },
            EngineStreams {
                stdin,
                stdout,
                stderr,
            },
        ))
    }

    /// Wait for the engine to exit on its own
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        let status = self.child.wait().await?;
        self.reaped = true;
        Ok(status)
    }

    /// Kill whatever is left in the engine's process group
    ///
    /// After a clean exit this only reaches processes the engine started
    /// and left behind.
    pub fn kill_group(&mut self) {
        if !self.group_killed {
            self.signal_group();
            self.group_killed = true;
        }
    }

    /// Kill the engine and everything it started, then reap it
    pub async fn terminate(&mut self) {
        self.kill_group();
        if self.reaped {
            return;
        }
        // Kills the direct child if the group signal missed it, then waits.
        let _ = self.child.kill().await;
        self.reaped = true;
        tracing::debug!(pid = ?self.pid, "Engine terminated");
    }

    #[cfg(unix)]
    fn signal_group(&self) {
        if let Some(pid) = self.pid {
            // The child leads its own group, so the group id equals its pid.
            unsafe {
                libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
            }
        }
    }

    #[cfg(not(unix))]
    fn signal_group(&self) {}
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        self.kill_group();
        if !self.reaped {
            let _ = self.child.start_kill();
        }
    }
}

/// Write the whole script, then close stdin
///
/// A broken pipe means the engine stopped reading and exited early; that is
/// its own business and shows up in the output, not as a stream failure.
pub async fn write_script(mut stdin: ChildStdin, script: &str) -> std::io::Result<()> {
    let result = async {
        stdin.write_all(script.as_bytes()).await?;
        stdin.flush().await
    }
    .await;

    match result {
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
            tracing::debug!("Engine closed stdin before the script was fully written");
            Ok(())
        }
        other => other,
    }
}

/// Drain a stream into a shared buffer on a background task
pub fn spawn_drain<R>(mut reader: R) -> (SharedBuffer, JoinHandle<std::io::Result<()>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buffer: SharedBuffer = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&buffer);

    let handle = tokio::spawn(async move {
        let mut chunk = [0u8; 4096];
        loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                return Ok(());
            }
            match sink.lock() {
                Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                Err(poisoned) => poisoned.into_inner().extend_from_slice(&chunk[..n]),
            }
        }
    });

    (buffer, handle)
}

/// Decode whatever a drain has collected so far
pub fn take_text(buffer: &SharedBuffer) -> String {
    let bytes = match buffer.lock() {
        Ok(buf) => buf.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };
    String::from_utf8_lossy(&bytes).into_owned()
}
