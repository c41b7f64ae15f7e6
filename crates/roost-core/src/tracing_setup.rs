use std::fs::OpenOptions;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize tracing for a binary: env-filtered stderr output, plus an
/// optional append-only file layer when `ROOST_LOG_FILE` is set.
pub fn init_tracing() {
    let file_logging = std::env::var("ROOST_LOG_FILE").ok();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer);

    if let Some(log_path) = file_logging {
        match OpenOptions::new().create(true).append(true).open(&log_path) {
            Ok(file) => {
                let file_layer = fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG);
                registry.with(file_layer).init();
                eprintln!("File logging enabled: {log_path}");
            }
            Err(err) => {
                registry.init();
                tracing::warn!(error = %err, log_path, "could not open log file");
            }
        }
    } else {
        registry.init();
    }
}
