// Diagnostics go to stderr: stdout is the resolver's answer and is captured by the wrapper.
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "NAVIGATE_LOG";

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
