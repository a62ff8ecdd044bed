//! Diagnostic logging to stderr.
//!
//! `RUST_LOG` takes precedence; otherwise only warnings are shown, or
//! everything from debug up with `--verbose`.

use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .try_init();
}
