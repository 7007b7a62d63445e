use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, filter::EnvFilter, fmt};

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::{Location, PanicHookInfo};

const ENV_DEBUG: &str = "OFFSETGEN_DEBUG";

/// `OFFSETGEN_DEBUG=true` (any case) switches to text logs at debug level.
fn debug_mode(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

fn default_level(debug_mode: bool) -> Level {
    if debug_mode { Level::DEBUG } else { Level::INFO }
}

/// Panic payloads are a `&str` for `panic!("literal")` and a `String` when formatted.
fn payload_str(payload: &(dyn Any + Send)) -> Option<&str> {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
}

/// `file:line:column: payload`, the single line a panic is logged as.
fn panic_line(location: &Location<'_>, payload: &str) -> String {
    format!(
        "{}:{}:{}: {}",
        location.file(),
        location.line(),
        location.column(),
        payload
    )
}

/// Panic hook to send panic info to `tracing` instead of stderr.
/// Without this, a panic in the planner is written to stderr as a separate block, outside of the
/// JSON log stream:
/// ```text
/// {"timestamp":"2026-10-19T08:12:03.410Z","level":"INFO","message":"Planning next cycle","topic":"orders"}
///
/// thread 'main' panicked at offsetgen-core/src/planner.rs:120:9:
/// called `Option::unwrap()` on a `None` value
/// ```
///
/// With the panic hook, the same is logged as one more JSON event:
/// ```text
/// {"timestamp":"2026-10-19T08:12:03.410Z","level":"INFO","message":"Planning next cycle","topic":"orders"}
/// {"timestamp":"2026-10-19T08:12:03.411Z","level":"ERROR","message":"offsetgen-core/src/planner.rs:120:9: called `Option::unwrap()` on a `None` value"}
/// ```
///
/// When a backtrace was captured (RUST_BACKTRACE or RUST_LIB_BACKTRACE set) the full panic info
/// and the backtrace are logged instead.
fn report_panic(panic_info: &PanicHookInfo<'_>) {
    let backtrace = Backtrace::capture();
    let backtrace_captured = backtrace.status() == BacktraceStatus::Captured;

    // location() always returns Some today, the signature allows None
    match (
        panic_info.location(),
        payload_str(panic_info.payload()),
        backtrace_captured,
    ) {
        (Some(location), Some(payload), false) => {
            tracing::error!("{}", panic_line(location, payload));
        }
        _ => {
            tracing::error!("{}\n{}", panic_info, backtrace);
        }
    };
}

/// Sets up the tracing subscriber. RUST_LOG can be used to set the log level, the default is
/// `info`, or `debug` with text output when OFFSETGEN_DEBUG is `true`. Logs go to stderr, stdout
/// only carries the plan.
pub fn register() {
    let debug_mode = debug_mode(std::env::var(ENV_DEBUG).ok().as_deref());

    let filter = EnvFilter::builder()
        .with_default_directive(default_level(debug_mode).into())
        .from_env_lossy();

    let layer = if debug_mode {
        fmt::layer().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .flatten_event(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .init();

    std::panic::set_hook(Box::new(report_panic));
}
