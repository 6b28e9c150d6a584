//! Process-wide logging bootstrap.
//!
//! # Responsibility
//! - Start size-rotated file logging once per process.
//! - Capture panics into the log with a sanitized payload.
//!
//! # Invariants
//! - Repeating init with identical settings is a no-op.
//! - Init with different settings after a successful init is rejected.
//! - Init never panics.
//! - Log lines carry metadata only (`event=... module=... status=...`);
//!   credentials and note text are never logged.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::PathBuf;

const LOG_BASENAME: &str = "notesapp";
const ROTATE_AT_BYTES: u64 = 5 * 1024 * 1024;
const KEEP_LOG_FILES: usize = 3;
const PANIC_PAYLOAD_LIMIT: usize = 160;
const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq)]
struct LogSettings {
    level: &'static str,
    dir: PathBuf,
}

impl LogSettings {
    fn parse(level: &str, log_dir: &str) -> Result<Self, String> {
        let wanted = level.trim().to_ascii_lowercase();
        let wanted = if wanted == "warning" { "warn".to_string() } else { wanted };
        let level = LEVELS
            .iter()
            .copied()
            .find(|known| *known == wanted)
            .ok_or_else(|| {
                format!("unsupported log level `{wanted}`; expected one of {}", LEVELS.join("|"))
            })?;

        let dir = PathBuf::from(log_dir.trim());
        if dir.as_os_str().is_empty() {
            return Err("log directory is empty".to_string());
        }
        if !dir.is_absolute() {
            return Err(format!("log directory must be absolute, got `{}`", dir.display()));
        }
        Ok(Self { level, dir })
    }
}

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

/// Starts file logging at `level` into `log_dir`.
///
/// # Errors
/// - Unknown level, or an empty/relative directory.
/// - The directory cannot be created or the logger fails to start.
/// - Logging is already active with different settings.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let wanted = LogSettings::parse(level, log_dir)?;
    let active = ACTIVE.get_or_try_init(|| start(wanted.clone()))?;
    if active.settings != wanted {
        return Err(format!(
            "logging already active (level `{}`, dir `{}`); refusing to switch to level `{}`, dir `{}`",
            active.settings.level,
            active.settings.dir.display(),
            wanted.level,
            wanted.dir.display()
        ));
    }
    Ok(())
}

/// Active `(level, dir)`, or `None` before init.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (active.settings.level, active.settings.dir.clone()))
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start(settings: LogSettings) -> Result<ActiveLogger, String> {
    std::fs::create_dir_all(&settings.dir).map_err(|err| {
        format!("cannot create log directory `{}`: {err}", settings.dir.display())
    })?;

    let handle = Logger::try_with_str(settings.level)
        .map_err(|err| format!("invalid log level `{}`: {err}", settings.level))?
        .log_to_file(
            FileSpec::default()
                .directory(settings.dir.as_path())
                .basename(LOG_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("logger failed to start: {err}"))?;

    install_panic_hook();
    info!(
        "event=app_start module=core status=ok platform={} version={} level={}",
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION"),
        settings.level
    );

    Ok(ActiveLogger {
        settings,
        _handle: handle,
    })
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location,
            single_line(&payload, PANIC_PAYLOAD_LIMIT)
        );
        previous(info);
    }));
}

/// Flattens newlines and caps length; panic text may carry user input.
fn single_line(value: &str, limit: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    if flat.chars().count() <= limit {
        return flat;
    }
    let mut capped: String = flat.chars().take(limit).collect();
    capped.push_str("...");
    capped
}
