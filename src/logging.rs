use tracing_subscriber::{fmt, EnvFilter};

/// Log to stderr; stdout is reserved for the console target.
///
/// `RUST_LOG` wins when set, otherwise `verbosity` picks the level.
pub fn init(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
