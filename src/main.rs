//! Conduit HTTP event forwarder.
//!
//! Reads newline-delimited JSON objects from stdin and hands each one to the
//! HTTP output, which POSTs it to the configured collectors. Stops on end of
//! input once every event has been signaled, or on Ctrl+C / SIGTERM.

mod config;

use std::{future::Future, time::Duration};

use anyhow::{Context, Result};
use conduit_core::{oneshot_signal, Event, Signal};
use conduit_output::{DeliveryOptions, HttpOutput, OutputStats};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    sync::oneshot,
    task::JoinSet,
};
use tracing::{debug, error, info, warn};

use crate::config::Config;

/// Terminal signals observed for submitted events.
#[derive(Debug, Default)]
struct Outcomes {
    completed: u64,
    canceled: u64,
    lost: u64,
}

impl Outcomes {
    fn record(&mut self, outcome: Result<Signal, oneshot::error::RecvError>) {
        match outcome {
            Ok(Signal::Completed) => self.completed += 1,
            Ok(Signal::Canceled) => self.canceled += 1,
            Err(_) => self.lost += 1,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    info!("starting conduit");

    let config = Config::load()?;
    info!(
        uri = %config.uri,
        addresses = ?config.addresses,
        worker_count = config.worker_count,
        max_retries = config.max_retries,
        "configuration loaded"
    );

    let output =
        HttpOutput::start(config.to_output_config()).await.context("failed to start http output")?;
    let report = run(
        output,
        config.delivery_options(),
        config.shutdown_timeout(),
        BufReader::new(tokio::io::stdin()),
        shutdown_signal,
    )
    .await;

    info!(
        submitted = report.stats.events_submitted,
        delivered = report.stats.events_delivered,
        dropped = report.stats.events_dropped,
        finished = report.stats.events_finished(),
        send_failures = report.stats.send_failures,
        bytes_written = report.stats.bytes_written,
        completed = report.outcomes.completed,
        canceled = report.outcomes.canceled,
        lost = report.outcomes.lost,
        "conduit shutdown complete"
    );

    match report.input_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// What a run left behind once the output has shut down.
#[derive(Debug)]
struct RunReport {
    stats: OutputStats,
    outcomes: Outcomes,
    input_error: Option<anyhow::Error>,
}

/// Forwards `input` to `output` until end of input or `shutdown` fires,
/// then shuts the output down gracefully and collects every signal.
///
/// An input read error ends forwarding like a shutdown request does; it is
/// reported back instead of skipping the graceful shutdown.
async fn run<R, F, Fut>(
    output: HttpOutput,
    options: DeliveryOptions,
    shutdown_timeout: Duration,
    input: R,
    shutdown: F,
) -> RunReport
where
    R: AsyncBufRead + Unpin,
    F: Fn() -> Fut,
    Fut: Future<Output = ()>,
{
    let stats = output.stats_handle();
    let mut pending = JoinSet::new();
    let mut outcomes = Outcomes::default();
    let mut input_error = None;

    let interrupted = tokio::select! {
        result = forward_lines(input, &output, options, &mut pending) => {
            if let Err(e) = result {
                error!(error = %e, "input failed, shutting down");
                input_error = Some(e);
            }
            false
        },
        () = shutdown() => true,
    };

    let interrupted = interrupted
        || (input_error.is_none() && {
            info!(
                pending = pending.len(),
                queued = output.queue_len(),
                "end of input, waiting for outstanding events"
            );
            tokio::select! {
                () = drain(&mut pending, &mut outcomes) => false,
                () = shutdown() => true,
            }
        });

    if interrupted {
        info!("shutdown signal received, starting graceful shutdown");
    }

    if let Err(e) = output.shutdown_graceful(shutdown_timeout).await {
        error!(error = %e, "http output did not shut down cleanly");
    }

    drain(&mut pending, &mut outcomes).await;

    RunReport { stats: stats.snapshot().await, outcomes, input_error }
}

/// Submits every JSON object read from `input`.
///
/// Lines that are blank or not JSON objects are logged and skipped.
async fn forward_lines<R: AsyncBufRead + Unpin>(
    input: R,
    output: &HttpOutput,
    options: DeliveryOptions,
    pending: &mut JoinSet<Result<Signal, oneshot::error::RecvError>>,
) -> Result<()> {
    let mut lines = input.lines();
    let mut line_number = 0u64;

    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event = match parse_event(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line_number, error = %e, "skipping invalid input line");
                continue;
            },
        };

        let (signaler, done) = oneshot_signal();
        if let Err(e) = output.submit(event, signaler, options).await {
            warn!(line_number, error = %e, "output stopped accepting events");
            break;
        }
        debug!(line_number, "event submitted");
        pending.spawn(done);
    }

    Ok(())
}

fn parse_event(line: &str) -> Result<Event> {
    let value: serde_json::Value = serde_json::from_str(line).context("not valid JSON")?;
    Ok(Event::try_from(value)?)
}

/// Waits for every outstanding signal and tallies them.
async fn drain(
    pending: &mut JoinSet<Result<Signal, oneshot::error::RecvError>>,
    outcomes: &mut Outcomes,
) {
    while let Some(joined) = pending.join_next().await {
        match joined {
            Ok(outcome) => outcomes.record(outcome),
            Err(e) => {
                error!(error = %e, "signal waiter failed");
                outcomes.lost += 1;
            },
        }
    }
}

/// Initializes tracing with environment-based configuration.
fn init_tracing() -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,conduit=debug"))
        .context("invalid RUST_LOG environment variable")?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    Ok(())
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("received CTRL+C signal");
        },
        () = terminate => {
            info!("received SIGTERM signal");
        },
    }
}
