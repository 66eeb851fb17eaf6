use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

const CRATE_TARGETS: [&str; 5] = [
    "subprims",
    "subprims_broker",
    "subprims_consumer",
    "subprims_envelope",
    "subprims_schema",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Our crates log at `level`; everything else is capped at warnings.
pub fn log_targets(level: LogLevel) -> Targets {
    let level = LevelFilter::from(level);
    CRATE_TARGETS.iter().fold(
        Targets::new().with_default(level.min(LevelFilter::WARN)),
        |targets, target| targets.with_target(*target, level),
    )
}

/// Install the stderr subscriber. Dispatch and acknowledgment events from the
/// library crates surface here.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let layer = match format {
        LogFormat::Text => fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(false)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed(),
    };

    let installed = tracing_subscriber::registry()
        .with(log_targets(level))
        .with(layer)
        .try_init();
    if let Err(err) = installed {
        eprintln!("warning: logging not initialized: {err}");
    }
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn crate_events_follow_the_requested_level() {
        let targets = log_targets(LogLevel::Debug);
        assert!(targets.would_enable("subprims_consumer::ack", &Level::DEBUG));
        assert!(targets.would_enable("subprims_envelope::codec", &Level::DEBUG));
        assert!(!targets.would_enable("subprims_consumer::ack", &Level::TRACE));
    }

    #[test]
    fn dependency_events_are_capped_at_warn() {
        let verbose = log_targets(LogLevel::Trace);
        assert!(verbose.would_enable("jsonschema::validator", &Level::WARN));
        assert!(!verbose.would_enable("jsonschema::validator", &Level::INFO));

        let quiet = log_targets(LogLevel::Error);
        assert!(!quiet.would_enable("jsonschema::validator", &Level::WARN));
        assert!(quiet.would_enable("subprims_consumer::ack", &Level::ERROR));
    }
}
