//! Tracing setup for the `verdant` binary.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Respects `VERDANT_LOG` (e.g. `VERDANT_LOG=verdant_eval=debug`) and
/// defaults to `warn`, or `error` under `--quiet`. Logs go to stderr so
/// stdout stays parseable; colour is only used when stderr is a terminal.
pub(crate) fn init_tracing(quiet: bool) {
    let default = if quiet { "error" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("VERDANT_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();
}
