//! Zigbee Adapter Probe
//!
//! Probes a single serial device for a Zigbee radio adapter and reports the
//! result as one JSON document: the detection result on stdout when
//! detection ran to completion, an error report on stderr otherwise. Exits
//! 0 only when an adapter was confirmed.

mod classify;
mod cli;
mod detect;
mod guard;
mod report;
#[cfg(test)]
mod testing;

use std::time::Instant;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use cli::Cli;
use report::{ErrorReport, Outcome};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zb_detect::SerialAutoDetect;

fn main() {
    // The watchdog counts from here, not from when the runtime is up
    let started = Instant::now();
    guard::install_panic_hook();

    let outcome = guard::guarded(move || run(started));
    guard::finish(&outcome)
}

fn run(started: Instant) -> anyhow::Result<Outcome> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            return Ok(Outcome::from_error(&ErrorReport::usage(
                cli::parse_error_message(&e),
            )))
        }
    };

    init_tracing(cli.verbose);

    let Some(port) = cli.port.clone() else {
        return Ok(Outcome::from_error(&ErrorReport::usage(
            "No serial port specified",
        )));
    };

    let watchdog = cli.watchdog();
    guard::arm_watchdog(started, watchdog, |outcome| guard::finish(&outcome))
        .context("starting watchdog thread")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    let deadline = tokio::time::Instant::from_std(started + watchdog);
    let config = cli.detect_config();
    tracing::info!("Probing {} with {:?}", port.display(), config);

    let task = detect::probe_port(SerialAutoDetect::new(), port, config);
    let outcome = runtime.block_on(guard::supervise(task, deadline, watchdog));

    runtime.shutdown_background();
    Ok(outcome)
}

fn init_tracing(verbose: bool) {
    // stderr carries the JSON report, so logging stays off unless asked for
    let default_filter = if verbose {
        "zb_probe=debug,zb_detect=debug"
    } else {
        "off"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
