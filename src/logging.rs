use tracing_subscriber::EnvFilter;

/// Console diagnostics go to stderr so stdout stays clean for reports.
/// `RUST_LOG` overrides the default `info` level; silent mode turns it off.
pub(crate) fn init(silent: bool) {
    let filter = if silent {
        EnvFilter::new("off")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
