//! Readiness detection and process output capture

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Line nats-server logs once every listener is up
pub const READY_MARKER: &str = "Server is ready";

/// Number of output lines kept for error reports
const OUTPUT_HISTORY: usize = 50;

const PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Event taken as proof the server accepts clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// A line of process output contains the text
    LogMarker(String),
    /// A TCP connection to the client port succeeds
    PortOpen,
    /// Whichever of the log marker and the open port comes first
    Either(String),
}

impl Default for Readiness {
    fn default() -> Self {
        Readiness::LogMarker(READY_MARKER.to_string())
    }
}

impl Readiness {
    pub fn marker(&self) -> Option<&str> {
        match self {
            Readiness::LogMarker(marker) | Readiness::Either(marker) => Some(marker),
            Readiness::PortOpen => None,
        }
    }

    pub fn probes_port(&self) -> bool {
        matches!(self, Readiness::PortOpen | Readiness::Either(_))
    }
}

/// Whether something accepts TCP connections on `addr`
pub fn port_accepts_connections(addr: SocketAddr) -> bool {
    TcpStream::connect_timeout(&addr, PROBE_TIMEOUT).is_ok()
}

/// Collects the output of a supervised process
///
/// One reader thread per stream forwards each line to tracing, keeps the
/// most recent lines and raises a flag once the readiness marker shows up.
/// Threads end when the process closes its end of the pipe.
pub struct OutputWatcher {
    label: String,
    recent: Arc<Mutex<VecDeque<String>>>,
    marker_seen: Arc<AtomicBool>,
    readers: Vec<JoinHandle<()>>,
}

impl OutputWatcher {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            recent: Arc::new(Mutex::new(VecDeque::with_capacity(OUTPUT_HISTORY))),
            marker_seen: Arc::new(AtomicBool::new(false)),
            readers: Vec::new(),
        }
    }

    /// Start a reader thread for one output stream
    pub fn watch<R>(&mut self, stream: R, stream_name: &'static str, marker: Option<String>) -> std::io::Result<()>
    where
        R: Read + Send + 'static,
    {
        let label = self.label.clone();
        let recent = Arc::clone(&self.recent);
        let marker_seen = Arc::clone(&self.marker_seen);

        let reader = thread::Builder::new()
            .name(format!("{label}-{stream_name}"))
            .spawn(move || {
                for line in BufReader::new(stream).lines() {
                    let Ok(line) = line else { break };
                    shared::process_debug!(label, stream = stream_name, "{}", line);

                    let is_marker = marker.as_deref().is_some_and(|marker| line.contains(marker));
                    {
                        let mut recent = recent.lock().unwrap_or_else(|e| e.into_inner());
                        if recent.len() == OUTPUT_HISTORY {
                            recent.pop_front();
                        }
                        recent.push_back(line);
                    }

                    // Only after the line is in the history
                    if is_marker {
                        marker_seen.store(true, Ordering::SeqCst);
                    }
                }
            })?;

        self.readers.push(reader);
        Ok(())
    }

    /// Wait up to `timeout` for every stream to reach end of file
    ///
    /// Returns whether all readers finished. Only meaningful once the
    /// process has exited; a live process keeps its pipes open.
    pub fn wait_for_eof(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if self.readers.iter().all(JoinHandle::is_finished) {
                return true;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    pub fn marker_seen(&self) -> bool {
        self.marker_seen.load(Ordering::SeqCst)
    }

    /// Most recent output lines, oldest first
    pub fn recent_output(&self) -> Vec<String> {
        let recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());
        recent.iter().cloned().collect()
    }
}
