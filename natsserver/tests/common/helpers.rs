//! Test helpers and builder patterns for natsserver tests

use natsserver::*;
use shared::OsType;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::fixtures::{FakeBroker, TestFixtures};

/// Serialises tests that write and then execute scripts
///
/// Executing a script while another thread of this process still holds a
/// write handle to it (inherited across fork) fails with ETXTBSY.
static PROCESS_LOCK: Mutex<()> = Mutex::new(());

/// Builder for supervisors running a fake broker
pub struct ServerBuilder {
    config: ConfigMap,
    readiness: Readiness,
    startup_timeout: Duration,
    teardown_timeout: Duration,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ConfigMap::from([(ConfigOption::Port, "-1")]),
            readiness: Readiness::default(),
            startup_timeout: Duration::from_secs(5),
            teardown_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_option(mut self, option: ConfigOption, value: &str) -> Self {
        self.config.insert(option, value);
        self
    }

    pub fn with_readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn with_teardown_timeout(mut self, timeout: Duration) -> Self {
        self.teardown_timeout = timeout;
        self
    }

    pub fn build(self, broker: &FakeBroker) -> NatsServer {
        NatsServer::new(self.config, TestHelpers::resolver_for(broker))
            .with_readiness(self.readiness)
            .with_startup_timeout(self.startup_timeout)
            .with_teardown_timeout(self.teardown_timeout)
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper functions for common test operations
pub struct TestHelpers;

impl TestHelpers {
    pub fn serial() -> MutexGuard<'static, ()> {
        PROCESS_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Resolver that only ever finds the fake broker
    pub fn resolver_for(broker: &FakeBroker) -> LocalBinaryResolver {
        LocalBinaryResolver::new()
            .with_explicit_path(Some(broker.path().to_path_buf()))
            .with_install_dir(broker.dir())
            .with_path_search(false)
    }

    /// Embedded server for `config` running the fake broker
    pub fn embedded(broker: &FakeBroker, config: EmbeddedConfig, env: &dyn PropertySource) -> EmbeddedNatsServer {
        EmbeddedNatsServer::with_resolver(
            Some(config),
            env,
            Box::new(Self::resolver_for(broker)),
            OsType::current(),
        )
        .expect("configuration resolves")
    }

    /// Embedded configuration with credentials and an automatic port
    pub fn credentials_config() -> EmbeddedConfig {
        EmbeddedConfig::builder()
            .entries(TestFixtures::credentials())
            .port(-1)
            .timeout_ms(2000)
            .startup_timeout(Duration::from_secs(5))
            .build()
    }

    /// Whether a process with `pid` still exists (zombies included)
    #[cfg(unix)]
    pub fn process_exists(pid: i32) -> bool {
        use nix::sys::signal;
        use nix::unistd::Pid;

        signal::kill(Pid::from_raw(pid), None).is_ok()
    }

    /// Poll `condition` until it holds or `timeout` elapses
    pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        condition()
    }
}
