//! Lifecycle of the generator process.
//!
//! The [`ProcessController`] runs at most one generation session at a time. A session is a
//! child process executing the stream writer; callers only ever see an opaque
//! [`GenerationHandle`], never the OS process id.
//!
//! Status is the controller's own bookkeeping. It is not a liveness check: a generator that died
//! on its own is still reported active until it is stopped.

use crate::config::CoreConfig;
use crate::constants::GENERATOR_STOP_GRACE_SECS;
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Program and arguments used to launch a generator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl GeneratorCommand {
    pub fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self { program, args }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Opaque identity of a generation session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GenerationHandle(Uuid);

impl GenerationHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for GenerationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationStatus {
    Active,
    Inactive,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Active => "active",
            GenerationStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public view of the active session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionInfo {
    pub handle: GenerationHandle,
    pub started_at: DateTime<Utc>,
}

/// A spawned generator child process.
pub struct GeneratorProcess {
    child: Child,
}

impl GeneratorProcess {
    fn spawn(command: &GeneratorCommand) -> io::Result<Self> {
        let child = Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .spawn()?;
        Ok(Self { child })
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Asks the process to exit, then kills it if it is still running after `grace`.
    ///
    /// A process that has already exited is only reaped.
    pub fn terminate(mut self, grace: Duration) -> io::Result<()> {
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }

        self.request_exit()?;

        let deadline = Instant::now() + grace;
        loop {
            if self.child.try_wait()?.is_some() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                break;
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }

        tracing::warn!(
            "generator pid {} did not exit within {:?}; killing it",
            self.child.id(),
            grace
        );
        match self.child.kill() {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e),
        }
        self.child.wait()?;
        Ok(())
    }

    #[cfg(unix)]
    fn request_exit(&mut self) -> io::Result<()> {
        let pid = libc::pid_t::try_from(self.child.id())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
        // SAFETY: `pid` belongs to a child we have not reaped yet, so it cannot have been reused.
        let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            Ok(())
        } else {
            Err(err)
        }
    }

    #[cfg(not(unix))]
    fn request_exit(&mut self) -> io::Result<()> {
        match self.child.kill() {
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }
}

struct ActiveSession {
    info: SessionInfo,
    process: GeneratorProcess,
}

/// Starts, stops and reports on the single generation session.
///
/// Operations take `&mut self`; callers sharing a controller serialize access themselves.
pub struct ProcessController {
    command: GeneratorCommand,
    grace: Duration,
    active: Option<ActiveSession>,
}

impl ProcessController {
    pub fn new(command: GeneratorCommand) -> Self {
        Self {
            command,
            grace: Duration::from_secs(GENERATOR_STOP_GRACE_SECS),
            active: None,
        }
    }

    pub fn from_config(cfg: &CoreConfig) -> Self {
        Self::new(cfg.generator_command())
    }

    /// Overrides how long a stopped generator may take to exit before it is killed.
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn command(&self) -> &GeneratorCommand {
        &self.command
    }

    /// Launches a generator and makes it the active session.
    ///
    /// # Errors
    ///
    /// - `CoreError::GeneratorAlreadyActive` if a session is already active.
    /// - `CoreError::GeneratorSpawn` if the program cannot be started; the status stays inactive.
    pub fn start(&mut self) -> CoreResult<GenerationHandle> {
        if self.active.is_some() {
            return Err(CoreError::GeneratorAlreadyActive);
        }

        let process = GeneratorProcess::spawn(&self.command).map_err(|e| {
            tracing::error!(
                "failed to spawn generator {}: {}",
                self.command.program().display(),
                e
            );
            CoreError::GeneratorSpawn(e)
        })?;

        let info = SessionInfo {
            handle: GenerationHandle::new(),
            started_at: Utc::now(),
        };
        tracing::info!(
            "generation session {} started (pid {})",
            info.handle,
            process.id()
        );
        self.active = Some(ActiveSession { info, process });
        Ok(info.handle)
    }

    /// Stops the session identified by `handle`.
    ///
    /// A handle that does not name the active session changes nothing. Failures while
    /// terminating the process are logged and otherwise ignored; local state is cleared either
    /// way.
    pub fn stop(&mut self, handle: &GenerationHandle) -> GenerationStatus {
        let is_active = self.active.as_ref().map(|s| s.info.handle == *handle);
        match is_active {
            Some(true) => self.stop_active(),
            Some(false) => {
                tracing::warn!("ignoring stop for unknown generation session {}", handle);
                GenerationStatus::Active
            }
            None => GenerationStatus::Inactive,
        }
    }

    /// Stops the active session, if there is one.
    pub fn stop_active(&mut self) -> GenerationStatus {
        if let Some(session) = self.active.take() {
            let pid = session.process.id();
            match session.process.terminate(self.grace) {
                Ok(()) => tracing::info!(
                    "generation session {} stopped (pid {})",
                    session.info.handle,
                    pid
                ),
                Err(e) => tracing::warn!(
                    "error while stopping generation session {} (pid {}): {}",
                    session.info.handle,
                    pid,
                    e
                ),
            }
        }
        GenerationStatus::Inactive
    }

    pub fn status(&self) -> GenerationStatus {
        if self.active.is_some() {
            GenerationStatus::Active
        } else {
            GenerationStatus::Inactive
        }
    }

    pub fn active_session(&self) -> Option<SessionInfo> {
        self.active.as_ref().map(|s| s.info)
    }
}

impl Drop for ProcessController {
    fn drop(&mut self) {
        self.stop_active();
    }
}
