// Log subscriber setup for the report binary.
use tracing_subscriber::{fmt, EnvFilter};

// `RUST_LOG` overrides the configured level.
fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,pdi_model={level},pdi_report={level}")))
}

/// Install a stderr `fmt` subscriber. Calling it again is a no-op.
pub fn init(level: &str) {
    let _ = fmt()
        .with_env_filter(build_env_filter(level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
