use std::{fs, path::Path};

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, time::LocalTime},
    prelude::*,
};

use crate::configs::LoggingConfig;

pub mod writer;

pub use writer::*;

/// Builds the `EnvFilter` directive string: base level followed by any
/// extra per-target directives.
pub fn filter_directives(config: Option<&LoggingConfig>) -> String {
    let level = config.and_then(|l| l.level.as_deref()).unwrap_or("info");
    let filters = config.and_then(|l| l.filters.as_deref()).unwrap_or("");

    if filters.is_empty() {
        level.to_string()
    } else {
        format!("{},{}", level, filters)
    }
}

pub fn init(config: Option<&LoggingConfig>) {
    // RUST_LOG wins over the config file
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    let stdout_layer = fmt::layer()
        .with_timer(LocalTime::rfc_3339())
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(false);

    let file_layer = config.and_then(|l| l.file.as_ref()).map(|file_config| {
        if let Some(parent) = Path::new(&file_config.path).parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Failed to create log directory: {}", e);
            }
        }

        fmt::layer()
            .with_writer(BoundedLogFile::new(&file_config.path, file_config.max_lines))
            .with_timer(LocalTime::rfc_3339())
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(false)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives_default() {
        assert_eq!(filter_directives(None), "info");
    }

    #[test]
    fn test_filter_directives_with_extra_targets() {
        let config = LoggingConfig {
            level: Some("debug".into()),
            filters: Some("hyper=warn,tower_http=info".into()),
            file: None,
        };
        assert_eq!(
            filter_directives(Some(&config)),
            "debug,hyper=warn,tower_http=info"
        );
    }
}
