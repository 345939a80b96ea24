//! Logging configuration with file-based output and size-based rotation.
//!
//! Writes logs to `~/.config/stashbuff/stashbuff.log` (or platform equivalent)
//! with 5 MB size-based rotation. Debug output for the stashbuff crates is
//! enabled by `DEBUG_LOGGING=1` or by `debug_mode` in the buff mapping file.
//!
//! Logging starts before any config is read, so the filter sits behind a
//! reload handle and follows `debug_mode` once the mapping is loaded.

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    reload,
    util::SubscriberInitExt,
};

const LOG_FILE_MAX_BYTES: u64 = 5 * 1024 * 1024;

type FilterLayer = reload::Layer<EnvFilter, Registry>;

/// Installed logging. Hold it for the lifetime of the REPL: dropping it
/// flushes and closes the log file.
pub struct LogHandle {
    _guard: Option<WorkerGuard>,
    filter: reload::Handle<EnvFilter, Registry>,
    env_debug: bool,
    debug_logging: bool,
}

impl LogHandle {
    /// Follow the `debug_mode` setting of the loaded mapping.
    /// `DEBUG_LOGGING` keeps debug output on regardless.
    pub fn set_debug_mode(&mut self, debug_mode: bool) {
        let debug_logging = debug_mode || self.env_debug;
        if debug_logging == self.debug_logging {
            return;
        }
        match self.filter.reload(filter(debug_logging)) {
            Ok(()) => {
                self.debug_logging = debug_logging;
                tracing::info!(debug_logging, "Log filter updated");
            }
            Err(e) => tracing::warn!(error = %e, "Failed to update log filter"),
        }
    }
}

/// Initialize logging to the log file and stdout, falling back to stdout
/// only when the log file cannot be opened.
pub fn init() -> LogHandle {
    let env_debug = std::env::var("DEBUG_LOGGING").is_ok();
    let (filter_layer, filter_handle) = reload::Layer::new(filter(env_debug));
    let guard = install(filter_layer, env_debug);
    LogHandle {
        _guard: guard,
        filter: filter_handle,
        env_debug,
        debug_logging: env_debug,
    }
}

fn install(filter_layer: FilterLayer, debug_logging: bool) -> Option<WorkerGuard> {
    let Some(log_dir) = dirs::config_dir().map(|config| config.join("stashbuff")) else {
        init_stdout_only(filter_layer, debug_logging);
        return None;
    };

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        // Subscriber not installed yet
        eprintln!(
            "Failed to create log directory {:?}: {}, using stdout only",
            log_dir, e
        );
        init_stdout_only(filter_layer, debug_logging);
        return None;
    }

    let log_path = log_dir.join("stashbuff.log");
    let file_appender = match BasicRollingFileAppender::new(
        &log_path,
        RollingConditionBasic::new().max_size(LOG_FILE_MAX_BYTES),
        1,
    ) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Failed to create log file at {:?}: {}", log_path, e);
            init_stdout_only(filter_layer, debug_logging);
            return None;
        }
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    tracing::info!(log_file = ?log_path, debug_logging, "stashbuff logging initialized");
    Some(guard)
}

fn init_stdout_only(filter_layer: FilterLayer, debug_logging: bool) {
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .init();

    tracing::info!(debug_logging, "stashbuff logging initialized (stdout only)");
}

fn filter(debug_logging: bool) -> EnvFilter {
    if debug_logging {
        EnvFilter::new("info,stashbuff_core=debug,stashbuff_cli=debug")
    } else {
        EnvFilter::new("info")
    }
}
