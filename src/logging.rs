//! Diagnostic logging setup.
//!
//! Output goes to stderr so streamed answers on stdout stay clean. The filter
//! comes from `KBCHAT_LOG`, then `RUST_LOG`, and defaults to `warn`.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "KBCHAT_LOG";

static INIT: OnceLock<()> = OnceLock::new();

fn resolve_filter(verbose: bool) -> EnvFilter {
    if let Ok(directives) = std::env::var(LOG_ENV) {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return filter;
        }
    }
    if verbose {
        return EnvFilter::new("kbchat=debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber once per process; later calls are no-ops.
pub fn init(verbose: bool) {
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(resolve_filter(verbose))
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .try_init();
    });
}
