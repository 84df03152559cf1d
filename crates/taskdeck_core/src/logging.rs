use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "TASKDECK_LOG";
const DEFAULT_DIRECTIVE: &str = "warn";

/// Installs the global subscriber. Output goes to stderr so it never mixes
/// with command output; a second call is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
