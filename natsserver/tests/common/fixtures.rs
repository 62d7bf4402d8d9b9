//! Test fixtures for natsserver tests
//!
//! [`FakeBroker`] writes an executable script into a temporary directory
//! that behaves like nats-server as far as the supervisor can tell: it
//! records its pid and arguments, prints log lines and stays alive (or not).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Standard test data
pub struct TestFixtures;

impl TestFixtures {
    pub const USER: &'static str = "admin";
    pub const PASS: &'static str = "s3cret";
    pub const NAMESPACE: &'static str = "nats";

    /// Fixed port that is not the nats-server default
    pub const FIXED_PORT: i32 = 4555;

    pub const SOURCE_URL: &'static str = "https://mirror.example.org/nats-server.zip";
    pub const LINUX_SOURCE_URL: &'static str = "https://mirror.example.org/nats-server-linux.zip";

    pub const FAILURE_LINE: &'static str = "[FTL] Error listening on port: 0.0.0.0:4555, \"address already in use\"";

    pub fn credentials() -> Vec<String> {
        vec![format!("user:{}", Self::USER), format!("pass:{}", Self::PASS)]
    }
}

/// Behaviour of a fake nats-server script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerBehaviour {
    /// Logs the ready line and sleeps; exits on SIGTERM
    Ready,
    /// Never logs the ready line
    Silent,
    /// Logs a fatal error and exits with status 1
    Crashing,
    /// Logs the ready line and ignores SIGTERM
    Stubborn,
    /// Logs the ready line and exits on its own shortly after
    ShortLived,
}

/// An executable script standing in for nats-server
pub struct FakeBroker {
    dir: TempDir,
    script: PathBuf,
}

impl FakeBroker {
    pub fn new(behaviour: BrokerBehaviour) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let script = dir.path().join("nats-server");
        let pid_file = dir.path().join("pid");
        let args_file = dir.path().join("args");

        let preamble = format!(
            "#!/bin/sh\necho $$ > \"{}\"\necho \"$@\" > \"{}\"\necho \"[$$] [INF] Starting nats-server\" >&2\n",
            pid_file.display(),
            args_file.display()
        );
        let body = match behaviour {
            BrokerBehaviour::Ready => "echo \"[$$] [INF] Server is ready\" >&2\nexec sleep 30\n".to_string(),
            BrokerBehaviour::Silent => "exec sleep 30\n".to_string(),
            BrokerBehaviour::Crashing => format!("echo '{}' >&2\nexit 1\n", TestFixtures::FAILURE_LINE),
            BrokerBehaviour::Stubborn => {
                "trap '' TERM\necho \"[$$] [INF] Server is ready\" >&2\nwhile true; do sleep 1; done\n".to_string()
            }
            BrokerBehaviour::ShortLived => "echo \"[$$] [INF] Server is ready\" >&2\nsleep 1\nexit 0\n".to_string(),
        };

        write_script(&script, &format!("{preamble}{body}"));
        Self { dir, script }
    }

    pub fn ready() -> Self {
        Self::new(BrokerBehaviour::Ready)
    }

    pub fn silent() -> Self {
        Self::new(BrokerBehaviour::Silent)
    }

    pub fn crashing() -> Self {
        Self::new(BrokerBehaviour::Crashing)
    }

    pub fn stubborn() -> Self {
        Self::new(BrokerBehaviour::Stubborn)
    }

    pub fn short_lived() -> Self {
        Self::new(BrokerBehaviour::ShortLived)
    }

    pub fn path(&self) -> &Path {
        &self.script
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Arguments the script was launched with, space separated
    pub fn recorded_args(&self) -> String {
        read_when_present(&self.dir.path().join("args"))
            .trim_end()
            .to_string()
    }

    /// Pid the script recorded for itself
    pub fn recorded_pid(&self) -> i32 {
        read_when_present(&self.dir.path().join("pid"))
            .trim()
            .parse()
            .expect("pid file holds a number")
    }
}

fn write_script(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write fake nats-server");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("make script executable");
    }
}

fn read_when_present(path: &Path) -> String {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if let Ok(contents) = fs::read_to_string(path) {
            if contents.ends_with('\n') {
                return contents;
            }
        }
        assert!(Instant::now() < deadline, "{} was never written", path.display());
        std::thread::sleep(Duration::from_millis(10));
    }
}
