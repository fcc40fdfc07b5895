//! Wiring: configuration, credentials, sink, transport, session, signals.

use std::fmt;
use std::future::Future;
use std::io;

use anyhow::{anyhow, Context};
use capture_sink::SinkHandle;
use credential_store::load_from_path;
use grabber_config_and_utils::{init_logging, Config, Paths};
use reconnect_policy::ReconnectPolicy;
use stream_session::{
    FilterSpec, HttpStreamTransport, HttpTransportConfig, SessionConfig, SessionReport,
    StreamSession,
};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::Cli;

/// A failed run: which stage failed and why.
#[derive(Debug)]
pub struct Failure {
    pub stage: &'static str,
    pub error: anyhow::Error,
}

impl Failure {
    fn at(stage: &'static str) -> impl FnOnce(anyhow::Error) -> Failure {
        move |error| Failure { stage, error }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {:#}", self.stage, self.error)
    }
}

/// Resolve configuration, honoring CLI overrides.
pub fn load_config(cli: &Cli) -> anyhow::Result<(Paths, Config)> {
    let paths = match &cli.config_dir {
        Some(dir) => Paths::with_base_dir(dir.clone()),
        None => Paths::new()?,
    };
    let mut config = Config::load(&paths)
        .with_context(|| format!("loading {}", paths.config_file().display()))?;

    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(max) = cli.max_retries {
        config.backoff.max_retries = Some(max);
    }
    Ok((paths, config))
}

/// Run one capture until shutdown or a fatal error.
pub async fn run(cli: Cli) -> Result<SessionReport, Failure> {
    let (paths, config) = load_config(&cli).map_err(Failure::at("configuration"))?;
    init_logging(&config.log_level, &paths);

    let credentials = load_from_path(&cli.credentials)
        .with_context(|| format!("reading {}", cli.credentials.display()))
        .map_err(Failure::at("credential parse"))?;

    let filter = FilterSpec::parse(&cli.keywords)
        .map_err(anyhow::Error::from)
        .map_err(Failure::at("filter"))?;

    let transport = HttpStreamTransport::new(HttpTransportConfig {
        url: config.stream_url.clone(),
        connect_timeout: config.connect_timeout(),
        user_agent: config.user_agent.clone(),
    })
    .map_err(anyhow::Error::from)
    .map_err(Failure::at("configuration"))?;

    let mut sink = SinkHandle::open(&cli.file)
        .map_err(anyhow::Error::from)
        .map_err(Failure::at("persistence"))?;

    info!(
        keywords = filter.keywords().len(),
        output = %cli.file.display(),
        stream_url = %config.stream_url,
        "Starting capture"
    );

    let mut session = StreamSession::with_config(
        credentials,
        filter,
        transport,
        ReconnectPolicy::new(config.backoff.clone()),
        SessionConfig {
            stall_timeout: config.stall_timeout(),
            connect_timeout: config.connect_timeout(),
        },
    );

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
    let signals = tokio::spawn(forward_signals(shutdown_tx));

    let result = session.run(&mut sink, &mut shutdown_rx).await;
    signals.abort();

    let report = result.map_err(|e| Failure {
        stage: e.stage(),
        error: anyhow!(e),
    })?;

    sink.close()
        .map_err(anyhow::Error::from)
        .map_err(Failure::at("persistence"))?;
    Ok(report)
}

/// Send one shutdown message on SIGINT or SIGTERM.
async fn forward_signals(shutdown: broadcast::Sender<()>) {
    wait_for_signal().await;
    info!("Received shutdown signal");
    if shutdown.send(()).is_err() {
        warn!("Session already stopped");
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl-C only");
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    until_signal("Ctrl-C", tokio::signal::ctrl_c()).await;
}

/// Resolve when `listener` reports a signal. A listener that failed to
/// install never resolves, so the capture keeps running.
async fn until_signal(name: &str, listener: impl Future<Output = io::Result<()>>) {
    if let Err(e) = listener.await {
        warn!(signal = name, error = %e, "Signal handler unavailable");
        std::future::pending::<()>().await;
    }
}
