use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber at `level`, an `EnvFilter` directive
/// such as `info` or `ferrum_a2c=debug`. `RUST_LOG`, when set, wins.
///
/// Returns false if a subscriber was already installed.
pub fn init(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
