mod cli;
mod error;

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use antenne_config::Resolved;
use antenne_core::LivestreamProbe;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let settings = antenne_config::load(cli.config.as_deref(), &cli.overrides())?;

    if cli.check_config {
        let rendered = settings.redacted()?;
        settings.resolve()?;
        print!("{rendered}");
        return Ok(());
    }

    let resolved = settings.resolve()?;
    antenne_config::ensure_audio_dir(&resolved.relay)?;

    let probe = LivestreamProbe::new(&resolved.probe).map_err(|source| CliError::Probe { source })?;

    info!(
        channel = %resolved.probe.channel,
        guild_id = %resolved.relay.target.community,
        voice_channel_id = %resolved.relay.target.room,
        user_id = %resolved.relay.target.user,
        audio_dir = %resolved.relay.audio_dir.display(),
        interval = %humantime::format_duration(resolved.relay.check_interval),
        "starting relay"
    );

    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone());

    serve(resolved, Arc::new(probe), cancel).await
}

#[cfg(feature = "discord")]
async fn serve(
    resolved: Resolved,
    probe: Arc<LivestreamProbe>,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    use antenne_core::{AudioRelay, ConditionEvaluator, Scheduler};
    use antenne_discord::DiscordBot;

    const READY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);

    let bot = DiscordBot::start(&resolved.token, READY_TIMEOUT).await?;

    let interval = resolved.relay.check_interval;
    let relay = AudioRelay::new(bot.platform(), bot.output(), resolved.relay);
    let evaluator = Arc::new(ConditionEvaluator::new(bot.platform(), probe, relay));

    Scheduler::new(evaluator, interval, cancel).run().await;
    bot.shutdown().await;
    Ok(())
}

#[cfg(not(feature = "discord"))]
#[allow(clippy::unused_async, clippy::needless_pass_by_value)]
async fn serve(
    _resolved: Resolved,
    _probe: Arc<LivestreamProbe>,
    _cancel: CancellationToken,
) -> Result<(), CliError> {
    Err(CliError::NoBackend)
}

// ── Shutdown signals ────────────────────────────────────────────────

fn spawn_signal_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received, cleaning up");
        cancel.cancel();
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
