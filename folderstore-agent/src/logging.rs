use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Output goes to stderr without colour:
/// stdout carries the transfer protocol and git-lfs relays stderr verbatim.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second call (as in tests) leaves the first subscriber in place.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}
