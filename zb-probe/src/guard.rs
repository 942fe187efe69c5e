//! Top-level safety net: watchdog deadline and panic capture
//!
//! Everything that can go wrong after argument parsing ends up here and is
//! turned into an [`Outcome`], so the process always finishes with exactly
//! one JSON document.

use std::any::Any;
use std::backtrace::Backtrace;
use std::future::Future;
use std::io;
use std::panic::{self, UnwindSafe};
use std::process;
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle as ThreadHandle};
use std::time::{Duration, Instant as StdInstant};

use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::report::{ErrorReport, Outcome};

/// Details of the most recent panic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicReport {
    pub message: String,
    pub stack: String,
}

static LAST_PANIC: Mutex<Option<PanicReport>> = Mutex::new(None);

/// Held by whoever writes the final document; never released before exit
static FINISHING: Mutex<()> = Mutex::new(());

/// Replace the default panic output with a recorder
///
/// The default hook prints free text to stderr, which would corrupt the JSON
/// document callers parse. The recorded report is picked up by
/// [`take_panic`] once the panic reaches the guarded scope.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let message = payload_message(info.payload());
        let location = info
            .location()
            .map(ToString::to_string)
            .unwrap_or_else(|| "<unknown>".to_string());
        let stack = format!(
            "panicked at {location}: {message}\n{}",
            Backtrace::force_capture()
        );

        *LAST_PANIC.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(PanicReport { message, stack });
    }));
}

/// Report for a caught panic, preferring what the hook recorded
pub fn take_panic(payload: &(dyn Any + Send)) -> PanicReport {
    LAST_PANIC
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
        .unwrap_or_else(|| {
            let message = payload_message(payload);
            PanicReport {
                stack: format!("panicked: {message}"),
                message,
            }
        })
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Run `body`, turning a returned error or a panic into a report
pub fn guarded<F>(body: F) -> Outcome
where
    F: FnOnce() -> anyhow::Result<Outcome> + UnwindSafe,
{
    match panic::catch_unwind(body) {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => Outcome::from_error(&ErrorReport::unexpected(&err)),
        Err(payload) => Outcome::from_error(&ErrorReport::uncaught(take_panic(&*payload))),
    }
}

/// Write `outcome` and exit with its code
///
/// Only the first caller gets to write; a racing caller blocks until the
/// process is gone.
pub fn finish(outcome: &Outcome) -> ! {
    let _finishing = FINISHING.lock().unwrap_or_else(PoisonError::into_inner);

    if let Err(e) = outcome.emit() {
        debug!("Failed to write result: {}", e);
    }

    // Exit without waiting on anything the detection task left behind
    process::exit(outcome.exit_code)
}

/// Start a plain OS thread that calls `on_expire` at `started + limit`
///
/// The thread is not a runtime worker, so detection code that blocks every
/// worker cannot hold it back.
pub fn arm_watchdog<F>(
    started: StdInstant,
    limit: Duration,
    on_expire: F,
) -> io::Result<ThreadHandle<()>>
where
    F: FnOnce(Outcome) + Send + 'static,
{
    thread::Builder::new()
        .name("zb-probe-watchdog".to_string())
        .spawn(move || {
            let deadline = started + limit;
            let now = StdInstant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            }

            warn!("Watchdog expired after {:?}, terminating", limit);
            on_expire(Outcome::from_error(&ErrorReport::watchdog(limit)));
        })
}

/// Run `task` on its own tokio task and wait for it until `deadline`
///
/// `limit` is only used for the watchdog message.
pub async fn supervise<F>(task: F, deadline: Instant, limit: Duration) -> Outcome
where
    F: Future<Output = anyhow::Result<Outcome>> + Send + 'static,
{
    supervise_handle(tokio::spawn(task), deadline, limit).await
}

/// Wait for an already spawned task until `deadline`
pub async fn supervise_handle(
    mut handle: JoinHandle<anyhow::Result<Outcome>>,
    deadline: Instant,
    limit: Duration,
) -> Outcome {
    match timeout_at(deadline, &mut handle).await {
        Ok(Ok(Ok(outcome))) => outcome,
        Ok(Ok(Err(err))) => Outcome::from_error(&ErrorReport::unexpected(&err)),
        Ok(Err(join_err)) if join_err.is_panic() => {
            let payload = join_err.into_panic();
            Outcome::from_error(&ErrorReport::uncaught(take_panic(&*payload)))
        }
        Ok(Err(join_err)) => Outcome::from_error(&ErrorReport::rejected(&join_err.to_string())),
        Err(_) => {
            warn!("Watchdog expired after {:?}, abandoning detection", limit);
            handle.abort();
            Outcome::from_error(&ErrorReport::watchdog(limit))
        }
    }
}
