//! Tracing setup for the binary

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "retrace=info,retrace_cli=info,retrace_core=info";
const VERBOSE_FILTER: &str = "retrace=debug,retrace_cli=debug,retrace_core=debug";

/// Install the global subscriber; `RUST_LOG` wins over the flags
///
/// Logs go to stderr so command output on stdout stays parseable.
pub fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
