//! Embedded nats-server runner
//!
//! Runs a supervised nats-server in the foreground with the same
//! configuration merge test harnesses get, until Ctrl+C.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use shared::OsType;
use std::path::PathBuf;
use std::time::Duration;

use natsserver::config::resolve_config;
use natsserver::{EmbeddedConfig, EmbeddedNatsServer, EnvPropertySource, Readiness};

#[derive(Parser)]
#[command(name = "natsserver")]
#[command(about = "Run a supervised nats-server with merged configuration")]
struct Args {
    /// Server option as name:value (repeatable), e.g. --entry user:admin
    #[arg(long = "entry", value_name = "NAME:VALUE")]
    entries: Vec<String>,

    /// Client port (-1 picks a free port)
    #[arg(long, allow_hyphen_values = true)]
    port: Option<i32>,

    /// Url the server executable is obtained from
    #[arg(long)]
    source_url: Option<String>,

    /// nats-server executable to use
    #[arg(long)]
    binary: Option<PathBuf>,

    /// Teardown timeout in milliseconds
    #[arg(long, default_value = "10000")]
    timeout_ms: u64,

    /// Readiness timeout in milliseconds
    #[arg(long, default_value = "10000")]
    startup_timeout_ms: u64,

    /// Signal taken as proof the server is ready
    #[arg(long, value_enum, default_value = "marker")]
    readiness: ReadinessArg,

    /// Environment property namespace
    #[arg(long, default_value = "nats")]
    namespace: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the merged configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReadinessArg {
    Marker,
    Port,
    Either,
}

impl Args {
    fn to_config(&self) -> EmbeddedConfig {
        let readiness = match self.readiness {
            ReadinessArg::Marker => Readiness::default(),
            ReadinessArg::Port => Readiness::PortOpen,
            ReadinessArg::Either => Readiness::Either(natsserver::core::READY_MARKER.to_string()),
        };

        let mut builder = EmbeddedConfig::builder()
            .entries(self.entries.iter().cloned())
            .timeout_ms(self.timeout_ms)
            .startup_timeout(Duration::from_millis(self.startup_timeout_ms))
            .readiness(readiness)
            .namespace(self.namespace.clone());

        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if let Some(url) = &self.source_url {
            builder = builder.source_url(url.clone());
        }
        if let Some(binary) = &self.binary {
            builder = builder.binary_path(binary.clone());
        }
        builder.build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    shared::logging::init_tracing_with_level(Some(&args.log_level));

    let config = args.to_config();
    let env = EnvPropertySource::load();

    if args.print_config {
        let resolved = resolve_config(&config, &env, OsType::current())?;
        println!("{}", resolved.config.to_json());
        if let Some(url) = resolved.source_url {
            eprintln!("source: {url}");
        }
        return Ok(());
    }

    let mut nats = tokio::task::spawn_blocking(move || {
        let mut nats = EmbeddedNatsServer::new(Some(config), &env)?;
        nats.start()?;
        Ok::<_, natsserver::NatsServerError>(nats)
    })
    .await
    .context("startup task panicked")??;

    tracing::info!(
        "📡 nats-server listening on {} (press Ctrl+C to stop)",
        nats.url().unwrap_or_default()
    );

    let mut health = tokio::time::interval(Duration::from_secs(1));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let exited_unexpectedly = loop {
        tokio::select! {
            _ = &mut ctrl_c => break false,
            _ = health.tick() => {
                if !nats.is_running() {
                    break true;
                }
            }
        }
    };

    tokio::task::spawn_blocking(move || nats.destroy())
        .await
        .context("shutdown task panicked")??;

    if exited_unexpectedly {
        anyhow::bail!("nats-server exited unexpectedly");
    }

    tracing::info!("🏁 nats-server stopped");
    Ok(())
}
