use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter, e.g. `LEADCAL_LOG=leadcal_core=debug`.
pub const LOG_ENV: &str = "LEADCAL_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Install the stderr subscriber. Stdout stays reserved for command output.
pub fn init_subscriber() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let formatter = fmt::layer().with_writer(std::io::stderr).with_target(false);

    // A second init (tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(formatter)
        .try_init();
}
