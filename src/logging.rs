//! Logging.
//!
//! Two separate channels:
//!
//! - **Diagnostics**: framework messages (module lookups, warnings about
//!   unknown keys) go through the `log` facade. The binary installs
//!   `env_logger` for them via [`init`]; `RUST_LOG` controls the level.
//!
//! - **Run log**: the [`RunLogger`] built once per run from the `logging`
//!   and `logging_file` options and attached to the [`State`]. Modules write
//!   their progress there. It is never installed as the global logger, so
//!   consecutive runs in one process do not interfere.
//!
//! [`State`]: crate::core::state::State

use crate::params::set::ParameterSet;
use env_logger::{Builder, Target, WriteStyle};
use log::{Level, LevelFilter, Log, Record};
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const RUN_TARGET: &str = "icesheet::run";

/// Initialize the global diagnostics logger.
///
/// Reads `RUST_LOG`. Defaults to `warn` if unset.
pub fn init() {
    let _ = Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(Target::Stderr)
        .try_init();
}

/// Logger handle for one run.
///
/// Writes `<timestamp> - <LEVEL> - <message>` lines to stderr or to a file.
/// Flushed when dropped, so a run that aborts early still leaves a complete
/// log behind.
pub struct RunLogger {
    inner: Option<env_logger::Logger>,
    path: Option<PathBuf>,
}

impl RunLogger {
    /// A logger that discards everything.
    pub fn disabled() -> Self {
        Self {
            inner: None,
            path: None,
        }
    }

    /// Log to stderr at `level` and above.
    pub fn console(level: LevelFilter) -> Self {
        let logger = base_builder(level).target(Target::Stderr).build();
        Self {
            inner: Some(logger),
            path: None,
        }
    }

    /// Log to a file, truncating it.
    pub fn to_file(path: impl AsRef<Path>, level: LevelFilter) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let logger = base_builder(level)
            .target(Target::Pipe(Box::new(file)))
            .write_style(WriteStyle::Never)
            .build();
        Ok(Self {
            inner: Some(logger),
            path: Some(path.to_path_buf()),
        })
    }

    /// Build the run logger from the `logging`, `logging_file` and
    /// `working_dir` options.
    ///
    /// With logging off the logger discards everything. An empty
    /// `logging_file` means stderr; otherwise the file is created under the
    /// working directory.
    pub fn from_params(params: &ParameterSet) -> io::Result<Self> {
        let enabled = params.get_bool("logging").unwrap_or(false);
        if !enabled {
            return Ok(Self::disabled());
        }
        let file = params.get_string("logging_file").unwrap_or("");
        if file.is_empty() {
            Ok(Self::console(LevelFilter::Info))
        } else {
            Self::to_file(params.working_dir().join(file), LevelFilter::Info)
        }
    }

    /// File this logger writes to, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether anything will be written at `level`.
    pub fn is_enabled(&self, level: Level) -> bool {
        self.inner
            .as_ref()
            .map(|l| level <= l.filter())
            .unwrap_or(false)
    }

    /// Write one record.
    pub fn log_args(&self, level: Level, args: fmt::Arguments<'_>) {
        if let Some(logger) = &self.inner {
            logger.log(
                &Record::builder()
                    .args(args)
                    .level(level)
                    .target(RUN_TARGET)
                    .build(),
            );
        }
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log_args(Level::Info, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log_args(Level::Warn, args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log_args(Level::Debug, args);
    }

    /// Flush buffered output.
    pub fn flush(&self) {
        if let Some(logger) = &self.inner {
            logger.flush();
        }
    }
}

impl Log for RunLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.inner
            .as_ref()
            .map(|l| l.enabled(metadata))
            .unwrap_or(false)
    }

    fn log(&self, record: &Record<'_>) {
        if let Some(logger) = &self.inner {
            logger.log(record);
        }
    }

    fn flush(&self) {
        RunLogger::flush(self);
    }
}

impl Drop for RunLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

impl fmt::Debug for RunLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLogger")
            .field("enabled", &self.inner.is_some())
            .field("path", &self.path)
            .finish()
    }
}

fn base_builder(level: LevelFilter) -> Builder {
    let mut builder = Builder::new();
    builder
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                buf.timestamp(),
                record.level(),
                record.args()
            )
        });
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_disabled_logger_is_silent() {
        let logger = RunLogger::disabled();
        assert!(!logger.is_enabled(Level::Error));
        logger.info(format_args!("nothing happens"));
        assert!(logger.path().is_none());
    }

    #[test]
    fn test_file_logger_writes_and_flushes() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("run.log");
        {
            let logger = RunLogger::to_file(&path, LevelFilter::Info).unwrap();
            assert!(logger.is_enabled(Level::Info));
            assert!(!logger.is_enabled(Level::Debug));
            logger.info(format_args!("t = {}", 2000));
            logger.debug(format_args!("filtered out"));
        }
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains(" - INFO - t = 2000"));
        assert!(!contents.contains("filtered out"));
    }

    #[test]
    fn test_file_logger_truncates() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("run.log");
        fs::write(&path, "stale line\n").unwrap();
        drop(RunLogger::to_file(&path, LevelFilter::Info).unwrap());
        assert!(!fs::read_to_string(&path).unwrap().contains("stale"));
    }
}
