//! Tracing setup for the CLI.
//!
//! Logs go to stderr so report output on stdout stays machine-readable.

use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Default filter directive for a `-v` count.
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Initialize the global tracing subscriber. `RUST_LOG` takes precedence
/// over `verbosity`. Subsequent calls are ignored.
pub fn init_tracing(verbosity: u8) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)));

        let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

        let _ = tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init();
    });
}
