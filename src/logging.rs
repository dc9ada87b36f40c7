// src/logging.rs
//
// Timestamped stderr logging with an optional per-device log file.
//
// Each bridge process writes `<dir>/<YYYYmmdd-HHMMSS>-<stem>.log`, where the
// stem is derived from the monitor's identity, and keeps `<dir>/<stem>.log`
// pointing at the newest file (Unix only).

use chrono::{DateTime, Local};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::device::DeviceInfo;
use crate::io::IoError;

/// Open log file plus the path it was created at
pub(crate) struct ActiveLog {
    pub(crate) file: File,
    path: PathBuf,
}

/// When `Some`, `tlog!` writes to both stderr and this file.
pub(crate) static LOG_FILE: Mutex<Option<ActiveLog>> = Mutex::new(None);

/// Stem used when a device label has no usable characters
const FALLBACK_STEM: &str = "pulseox";

fn stamp() -> String {
    Local::now().format("%H:%M:%S%.3f").to_string()
}

// ============================================================================
// Log target
// ============================================================================

/// Directory and file stem for a bridge's log files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogTarget {
    dir: PathBuf,
    stem: String,
}

impl LogTarget {
    /// `stem` is reduced to `[A-Za-z0-9_-]`, anything else becomes `_`.
    pub fn new(dir: impl Into<PathBuf>, stem: &str) -> Self {
        let cleaned: String = stem
            .trim()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let stem = if cleaned.trim_matches('_').is_empty() {
            FALLBACK_STEM.to_string()
        } else {
            cleaned
        };
        Self { dir: dir.into(), stem }
    }

    /// Log files named after the device ("Bed 4" -> `pulseox-Bed_4`).
    pub fn for_device(dir: impl Into<PathBuf>, device: &DeviceInfo) -> Self {
        Self::new(dir, &format!("{}-{}", FALLBACK_STEM, device.label()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// File name for a log started at `at`
    pub fn file_name(&self, at: DateTime<Local>) -> String {
        format!("{}-{}.log", at.format("%Y%m%d-%H%M%S"), self.stem)
    }

    /// Symlink that follows the newest log file
    pub fn latest_link(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.stem))
    }
}

// ============================================================================
// File logging
// ============================================================================

/// Start writing `tlog!` output to a new file under `target`.
/// Replaces any file already in use. Returns the path of the new file.
pub fn init_file_logging(target: &LogTarget) -> Result<PathBuf, IoError> {
    std::fs::create_dir_all(target.dir()).map_err(|e| {
        IoError::config(format!("Failed to create log dir {}: {}", target.dir().display(), e))
    })?;

    let filename = target.file_name(Local::now());
    let path = target.dir().join(&filename);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| IoError::config(format!("Failed to create log file {}: {}", path.display(), e)))?;

    #[cfg(unix)]
    {
        let link = target.latest_link();
        let _ = std::fs::remove_file(&link);
        if let Err(e) = std::os::unix::fs::symlink(&filename, &link) {
            eprintln!("{} [logging] Failed to link {}: {}", stamp(), link.display(), e);
        }
    }

    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = Some(ActiveLog {
            file,
            path: path.clone(),
        });
    }

    // tlog! locks LOG_FILE, write directly
    eprintln!("{} [logging] File logging started: {}", stamp(), path.display());
    Ok(path)
}

/// Path of the file `tlog!` currently writes to
pub fn current_log_file() -> Option<PathBuf> {
    LOG_FILE
        .lock()
        .ok()
        .and_then(|guard| guard.as_ref().map(|log| log.path.clone()))
}

/// Close the log file. Returns its path if one was open.
pub fn stop_file_logging() -> Option<PathBuf> {
    let closed = LOG_FILE.lock().ok()?.take()?;
    eprintln!("{} [logging] File logging stopped: {}", stamp(), closed.path.display());
    Some(closed.path)
}

/// Timestamped logging macro.
/// Prepends `HH:MM:SS.mmm` local time to every message written to stderr.
/// Also writes to the log file when file logging is enabled.
macro_rules! tlog {
    ($($arg:tt)*) => {{
        use std::io::Write as _;
        let msg = format!("{} {}", chrono::Local::now().format("%H:%M:%S%.3f"), format_args!($($arg)*));
        eprintln!("{}", msg);
        if let Ok(mut guard) = $crate::logging::LOG_FILE.lock() {
            if let Some(ref mut log) = *guard {
                let _ = writeln!(log.file, "{}", msg);
            }
        }
    }};
}
