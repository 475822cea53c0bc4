use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn logging_enabled() -> bool {
    for key in ["STREAMKIT_OBSERVABILITY_ENABLED", "STREAMKIT_OBSERVABILITY"] {
        if let Ok(value) = std::env::var(key) {
            return parse_bool(&value).unwrap_or(true);
        }
    }
    true
}

fn env_filter() -> tracing_subscriber::EnvFilter {
    if let Ok(level) = std::env::var("STREAMKIT_LOG_LEVEL")
        && let Ok(filter) = tracing_subscriber::EnvFilter::try_new(level)
    {
        return filter;
    }
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `STREAMKIT_OBSERVABILITY_ENABLED` / `STREAMKIT_OBSERVABILITY`: optional
///   enable/disable flag (default enabled).
/// - `STREAMKIT_LOG_LEVEL`: optional level/filter override (`info`, `debug`,
///   or a full filter directive).
/// - `STREAMKIT_JSON_LOG_PATH`: optional log file path. If set, logs are
///   JSONL in that file; otherwise a compact console format goes to stdout.
/// - `RUST_LOG`: optional filter override.
pub fn init_observability() {
    INIT.get_or_init(|| {
        if !logging_enabled() {
            return;
        }

        let filter = env_filter();
        if let Ok(path_raw) = std::env::var("STREAMKIT_JSON_LOG_PATH") {
            let path = std::path::PathBuf::from(path_raw);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                let _ = std::fs::create_dir_all(parent);
            }
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("streamkit.logs.jsonl");
            let writer = tracing_appender::rolling::never(dir, file_name);
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(false)
                .with_writer(writer);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .try_init();
        } else {
            let console_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stdout);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(console_layer)
                .try_init();
        }
    });
}
