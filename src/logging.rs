use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the `tracing` filter directives.
pub const LOG_ENV_VAR: &str = "SCISSORS_LOG";

/// Install a JSON `tracing` subscriber, defaulting to `error`.
///
/// The filter comes from `SCISSORS_LOG` (e.g. `SCISSORS_LOG=scissors=debug`). Calling this
/// more than once is harmless; only the first call installs.
pub fn init() {
    init_with_default(LevelFilter::ERROR);
}

/// Like [`init`], with a different level for when `SCISSORS_LOG` is unset.
pub fn init_with_default(default_level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_env_var(LOG_ENV_VAR)
        .with_default_directive(default_level.into())
        .from_env_lossy();

    // JSON lines on stderr keep stdout free for piping.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_span_list(true),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init_with_default(LevelFilter::DEBUG);
        tracing::info!("second install was ignored");
    }
}
