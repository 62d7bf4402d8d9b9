//! Supervised nats-server process
//!
//! [`NatsServer`] owns one server process from launch to teardown. Start and
//! stop block the calling thread: test setup needs the server accepting
//! clients before it continues, and teardown needs it gone.

use shared::{process_debug, process_error, process_info, process_warn, OsType};
use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};
use url::Url;

use super::command::ServerCommand;
use super::readiness::{port_accepts_connections, OutputWatcher, Readiness};
use super::state::ServerState;
use crate::config::embedded::{DEFAULT_STARTUP_TIMEOUT, DEFAULT_TIMEOUT};
use crate::config::{ConfigMap, ConfigOption, DEFAULT_PORT};
use crate::error::{NatsServerError, NatsServerResult};
use crate::traits::BinaryResolver;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How long reader threads get to collect output of an exited process
const OUTPUT_DRAIN: Duration = Duration::from_millis(500);

/// How long the OS gets to confirm a forced kill
const KILL_GRACE: Duration = Duration::from_secs(5);

pub struct NatsServer {
    config: ConfigMap,
    source_url: Option<Url>,
    resolver: Box<dyn BinaryResolver>,
    os: OsType,
    readiness: Readiness,
    startup_timeout: Duration,
    teardown_timeout: Duration,
    state: ServerState,
    executable: Option<PathBuf>,
    child: Option<Child>,
    output: Option<OutputWatcher>,
}

impl NatsServer {
    pub fn new(config: ConfigMap, resolver: impl BinaryResolver + 'static) -> Self {
        Self::with_boxed_resolver(config, Box::new(resolver))
    }

    pub fn with_boxed_resolver(config: ConfigMap, resolver: Box<dyn BinaryResolver>) -> Self {
        Self {
            config,
            source_url: None,
            resolver,
            os: OsType::current(),
            readiness: Readiness::default(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            teardown_timeout: DEFAULT_TIMEOUT,
            state: ServerState::Created,
            executable: None,
            child: None,
            output: None,
        }
    }

    /// Configure source url handed to the resolver (fluent API)
    pub fn with_source_url(mut self, source_url: Option<Url>) -> Self {
        self.source_url = source_url;
        self
    }

    /// Configure platform (fluent API)
    pub fn with_os(mut self, os: OsType) -> Self {
        self.os = os;
        self
    }

    /// Configure readiness signal (fluent API)
    pub fn with_readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }

    /// Configure startup timeout (fluent API)
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Configure teardown timeout (fluent API)
    pub fn with_teardown_timeout(mut self, timeout: Duration) -> Self {
        self.teardown_timeout = timeout;
        self
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Effective configuration; the launch snapshot once started
    pub fn config(&self) -> &ConfigMap {
        &self.config
    }

    pub fn source_url(&self) -> Option<&Url> {
        self.source_url.as_ref()
    }

    pub fn executable(&self) -> Option<&Path> {
        self.executable.as_deref()
    }

    pub fn teardown_timeout(&self) -> Duration {
        self.teardown_timeout
    }

    /// Process id, present only while the process is owned
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Configured client port
    ///
    /// Reports the configuration, not what the process actually bound.
    pub fn port(&self) -> Option<u16> {
        self.config.port().and_then(|port| u16::try_from(port).ok())
    }

    /// Client url, e.g. `nats://127.0.0.1:4222`
    pub fn url(&self) -> Option<String> {
        self.port().map(|port| format!("nats://{}:{}", self.client_host(), port))
    }

    /// Recent output lines of the process
    pub fn recent_output(&self) -> Vec<String> {
        self.output
            .as_ref()
            .map(OutputWatcher::recent_output)
            .unwrap_or_default()
    }

    /// Set a single option before launch
    pub fn set_option(&mut self, option: ConfigOption, value: impl Into<String>) -> NatsServerResult<()> {
        self.ensure_state("set_option", ServerState::Created)?;
        self.config.insert(option, value);
        Ok(())
    }

    /// Launch the server and block until it is ready
    ///
    /// A handle starts once: any state other than `Created` is rejected.
    /// On failure the process (if any) is killed and the state is `Failed`.
    pub fn start(&mut self) -> NatsServerResult<()> {
        self.ensure_state("start", ServerState::Created)?;
        self.transition(ServerState::Starting);

        match self.launch() {
            Ok(()) => {
                self.transition(ServerState::Running);
                process_info!(
                    self.label(),
                    "✅ nats-server ready (PID: {}) at {}",
                    self.pid().unwrap_or_default(),
                    self.url().unwrap_or_default()
                );
                Ok(())
            }
            Err(e) => {
                self.abort_launch();
                self.transition(ServerState::Failed);
                process_error!(self.label(), "❌ nats-server failed to start: {}", e);
                Err(e)
            }
        }
    }

    /// Stop the server, waiting up to `timeout` for a graceful exit
    ///
    /// A no-op unless the server is running. When the graceful window runs
    /// out (immediately for a zero timeout) the process is killed. Failing
    /// to confirm the kill is an error and leaves the state `Failed`.
    pub fn stop(&mut self, timeout: Duration) -> NatsServerResult<()> {
        if matches!(
            self.state,
            ServerState::Created | ServerState::Stopped | ServerState::Failed
        ) {
            process_debug!(self.label(), "Stop ignored in state {}", self.state);
            return Ok(());
        }

        self.transition(ServerState::Stopping);
        let Some(mut child) = self.child.take() else {
            self.transition(ServerState::Stopped);
            return Ok(());
        };

        let pid = child.id();
        process_info!(self.label(), "🛑 Stopping nats-server (PID: {})", pid);

        if !timeout.is_zero() && request_termination(&child) {
            match wait_for_exit(&mut child, timeout) {
                Ok(Some(status)) => {
                    process_debug!(self.label(), "nats-server exited gracefully: {}", status);
                    self.transition(ServerState::Stopped);
                    return Ok(());
                }
                Ok(None) => {
                    process_warn!(
                        self.label(),
                        "🔨 nats-server (PID: {}) still running after {:?}, killing",
                        pid,
                        timeout
                    );
                }
                Err(e) => {
                    process_warn!(self.label(), "⚠️ Error waiting for nats-server: {}", e);
                }
            }
        }

        match force_kill(&mut child, KILL_GRACE) {
            Ok(status) => {
                process_debug!(self.label(), "nats-server killed: {}", status);
                self.transition(ServerState::Stopped);
                Ok(())
            }
            Err(reason) => {
                self.transition(ServerState::Failed);
                process_error!(self.label(), "❌ nats-server (PID: {}) refused to die: {}", pid, reason);
                Err(NatsServerError::StopFailed { pid, reason })
            }
        }
    }

    /// Stop with the teardown timeout given at construction
    pub fn shutdown(&mut self) -> NatsServerResult<()> {
        self.stop(self.teardown_timeout)
    }

    /// Check whether the process is still alive without blocking
    ///
    /// A process found dead while it should be running moves the handle to
    /// `Failed`.
    pub fn is_running(&mut self) -> bool {
        let exited = match self.child.as_mut() {
            Some(child) => match child.try_wait() {
                Ok(None) => return true,
                Ok(Some(status)) => status.to_string(),
                Err(e) => e.to_string(),
            },
            None => return false,
        };

        process_warn!(self.label(), "⚠️ nats-server exited unexpectedly: {}", exited);
        self.child = None;
        if self.state == ServerState::Running {
            self.transition(ServerState::Failed);
        }
        false
    }

    fn launch(&mut self) -> NatsServerResult<()> {
        let port = self.resolve_port()?;

        let executable = self.resolver.resolve(self.os, self.source_url.clone())?;
        self.executable = Some(executable.clone());

        let command = ServerCommand::new(&executable, &self.config);
        process_debug!(
            self.label(),
            "Launching {} {}",
            command.program.display(),
            command.args.join(" ")
        );

        let mut child = command
            .to_command()
            .spawn()
            .map_err(|source| NatsServerError::SpawnFailed {
                path: executable.clone(),
                source,
            })?;

        let mut watcher = OutputWatcher::new(self.label());
        let marker = self.readiness.marker().map(str::to_string);
        if let Some(stdout) = child.stdout.take() {
            watcher.watch(stdout, "stdout", marker.clone())?;
        }
        if let Some(stderr) = child.stderr.take() {
            watcher.watch(stderr, "stderr", marker)?;
        }

        process_info!(self.label(), "🚀 Spawned nats-server (PID: {})", child.id());
        self.child = Some(child);
        self.output = Some(watcher);

        self.wait_until_ready(port)
    }

    /// Make sure a concrete port is configured, picking a free one for `-1`/`0`
    fn resolve_port(&mut self) -> NatsServerResult<u16> {
        let Some(value) = self.config.get(ConfigOption::Port).map(str::to_string) else {
            self.config.insert(ConfigOption::Port, DEFAULT_PORT.to_string());
            return Ok(DEFAULT_PORT);
        };

        let invalid = || NatsServerError::InvalidConfigEntry {
            entry: format!("port:{value}"),
            reason: "port must be -1, 0 or 1-65535".to_string(),
        };
        let port: i32 = value.trim().parse().map_err(|_| invalid())?;

        match port {
            -1 | 0 => {
                let port = free_port()?;
                self.config.insert(ConfigOption::Port, port.to_string());
                process_debug!(self.label(), "Assigned free port {}", port);
                Ok(port)
            }
            1..=65535 => Ok(port as u16),
            _ => Err(invalid()),
        }
    }

    fn wait_until_ready(&mut self, port: u16) -> NatsServerResult<()> {
        let deadline = deadline_after(self.startup_timeout);
        let probe_addr = SocketAddr::new(self.client_host().into(), port);

        loop {
            if let Some(status) = self.exited()? {
                if let Some(output) = &self.output {
                    output.wait_for_eof(OUTPUT_DRAIN);
                }
                return Err(NatsServerError::ProcessExitedEarly {
                    status: status.to_string(),
                    output: self.recent_output().join("\n"),
                });
            }

            let marker_seen = self.output.as_ref().is_some_and(OutputWatcher::marker_seen);
            if marker_seen || (self.readiness.probes_port() && port_accepts_connections(probe_addr)) {
                return Ok(());
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(NatsServerError::StartupTimeout {
                    port,
                    timeout: self.startup_timeout,
                });
            }

            thread::sleep(POLL_INTERVAL);
        }
    }

    fn exited(&mut self) -> NatsServerResult<Option<ExitStatus>> {
        match self.child.as_mut() {
            Some(child) => Ok(child.try_wait()?),
            None => Ok(None),
        }
    }

    /// Kill whatever a failed launch left behind
    fn abort_launch(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(reason) = force_kill(&mut child, KILL_GRACE) {
                process_error!(self.label(), "❌ Failed to kill nats-server after failed start: {}", reason);
            }
        }
    }

    fn ensure_state(&self, operation: &'static str, expected: ServerState) -> NatsServerResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(NatsServerError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn transition(&mut self, next: ServerState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        process_debug!(self.label(), "State {} -> {}", self.state, next);
        self.state = next;
    }

    /// Address clients (and the port probe) connect to
    fn client_host(&self) -> Ipv4Addr {
        self.config
            .get(ConfigOption::Addr)
            .and_then(|addr| addr.parse::<Ipv4Addr>().ok())
            .filter(|addr| !addr.is_unspecified())
            .unwrap_or(Ipv4Addr::LOCALHOST)
    }

    fn label(&self) -> String {
        match self.config.get(ConfigOption::Port) {
            Some(port) => format!("nats-server:{port}"),
            None => "nats-server".to_string(),
        }
    }
}

impl Drop for NatsServer {
    fn drop(&mut self) {
        // Emergency cleanup - force kill a process nobody stopped
        if let Some(mut child) = self.child.take() {
            process_warn!(self.label(), "🚨 Emergency cleanup: force killing nats-server");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Ask the process to terminate; `false` when no graceful request exists
#[cfg(unix)]
fn request_termination(child: &Child) -> bool {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    match signal::kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => true,
        Err(e) => {
            tracing::warn!("⚠️ Failed to send SIGTERM to {}: {}", child.id(), e);
            false
        }
    }
}

#[cfg(not(unix))]
fn request_termination(_child: &Child) -> bool {
    false
}

/// Deadline `timeout` from now; `None` when it lies beyond what `Instant`
/// can represent, which callers treat as no deadline
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// The parts of a child process the stop path relies on
#[cfg_attr(test, mockall::automock)]
trait ProcessHandle {
    fn kill(&mut self) -> std::io::Result<()>;
    fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>>;
}

impl ProcessHandle for Child {
    fn kill(&mut self) -> std::io::Result<()> {
        Child::kill(self)
    }

    fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        Child::try_wait(self)
    }
}

/// Poll for exit until `timeout` elapses
fn wait_for_exit<P: ProcessHandle>(child: &mut P, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = deadline_after(timeout);
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the process and wait up to `grace` for the OS to confirm it is gone
fn force_kill<P: ProcessHandle>(child: &mut P, grace: Duration) -> Result<ExitStatus, String> {
    if let Err(e) = child.kill() {
        // Already reaped or exited between checks
        if let Ok(Some(status)) = child.try_wait() {
            return Ok(status);
        }
        return Err(format!("kill failed: {e}"));
    }

    match wait_for_exit(child, grace) {
        Ok(Some(status)) => Ok(status),
        Ok(None) => Err(format!("no exit reported within {grace:?} of SIGKILL")),
        Err(e) => Err(format!("wait failed: {e}")),
    }
}

/// Pick a currently free local TCP port
fn free_port() -> NatsServerResult<u16> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    Ok(listener.local_addr()?.port())
}
