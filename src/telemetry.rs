use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Подключает глобальный subscriber. Логи идут в stderr,
/// чтобы вывод CLI в stdout оставался чистым.
pub fn init(rust_log: &str, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(EnvFilter::new(rust_log));

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}
