use std::io;

/// Map a verbosity count to an `EnvFilter` directive. `RUST_LOG` takes precedence.
pub fn filter_directive(verbose_level: u8) -> &'static str {
    match verbose_level {
        0 => "warn,analysis_workspace=info",
        1 => "info,analysis_workspace=debug",
        _ => "debug,analysis_workspace=trace",
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for the transcript.
pub fn setup_logging(verbose_level: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        tracing_subscriber::EnvFilter::new(filter_directive(verbose_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .with_writer(|| Box::new(io::stderr()) as Box<dyn io::Write + Send>)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(filter_directive(0), "warn,analysis_workspace=info");
        assert_eq!(filter_directive(1), "info,analysis_workspace=debug");
        assert_eq!(filter_directive(2), "debug,analysis_workspace=trace");
        assert_eq!(filter_directive(7), "debug,analysis_workspace=trace");
    }
}
