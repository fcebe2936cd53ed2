/// Logging and tracing initialization.

use crate::config::LoggingConfig;

/// Crates that log every frame or shader compile at the editor's levels
const QUIET_TARGETS: &[&str] = &[
    "wgpu_core",
    "wgpu_hal",
    "naga",
    "iced_wgpu",
    "iced_winit",
    "cosmic_text",
];

/// Filter directives for `level`, with the GPU and windowing stack held at `warn`.
pub fn filter_directives(level: &str) -> String {
    let level = match level.trim() {
        "" => "info",
        level => level,
    };
    std::iter::once(level.to_string())
        .chain(QUIET_TARGETS.iter().map(|target| format!("{}=warn", target)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the tracing subscriber with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level. A level that does
/// not parse falls back to the default one.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directives(&config.level)))
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&LoggingConfig::default().level)));

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}
