use std::env;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_PREFIX: &str = "battery-dashboard-api.log";

/// Installs the global tracing subscriber.
///
/// Console output is always on. When `LOG_DIR` is set, a daily rolling file is
/// written as well; the returned guard must live as long as the process so the
/// background writer flushes.
pub fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true));

    match env::var("LOG_DIR").ok().filter(|dir| !dir.trim().is_empty()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}
