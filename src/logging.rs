//! Console + size-rotated file logging.
//!
//! The console layer level is reloadable so the level from the settings file
//! can take over once settings are loaded. The file layer always records
//! DEBUG into logs/joke_generator.log, rotated by size.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Layer, Registry};

use crate::settings::Settings;

pub const LOG_DIR: &str = "logs";
pub const LOG_FILE: &str = "joke_generator.log";

/// Rotation thresholds, adjustable after the writer has been handed off.
#[derive(Debug)]
pub struct RotationLimits {
    max_bytes: AtomicU64,
    backups: AtomicUsize,
}

impl RotationLimits {
    pub fn new(max_bytes: u64, backups: usize) -> Self {
        Self {
            max_bytes: AtomicU64::new(max_bytes),
            backups: AtomicUsize::new(backups),
        }
    }

    pub fn set(&self, max_bytes: u64, backups: usize) {
        self.max_bytes.store(max_bytes, Ordering::Relaxed);
        self.backups.store(backups, Ordering::Relaxed);
    }
}

/// Append-only log file that rolls over to `<name>.1 .. <name>.N` once it
/// would exceed the size limit. A limit of 0 disables rotation.
pub struct RotatingFile {
    path: PathBuf,
    file: Option<File>,
    written: u64,
    limits: Arc<RotationLimits>,
}

impl RotatingFile {
    pub fn open(path: impl Into<PathBuf>, limits: Arc<RotationLimits>) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            file: Some(file),
            written,
            limits,
        })
    }

    fn backup_path(&self, n: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file = None;
        let backups = self.limits.backups.load(Ordering::Relaxed);

        if backups > 0 {
            let oldest = self.backup_path(backups);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for n in (1..backups).rev() {
                let from = self.backup_path(n);
                if from.exists() {
                    fs::rename(&from, self.backup_path(n + 1))?;
                }
            }
            fs::rename(&self.path, self.backup_path(1))?;
            self.file = Some(OpenOptions::new().create(true).append(true).open(&self.path)?);
        } else {
            self.file = Some(
                OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&self.path)?,
            );
        }
        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let max = self.limits.max_bytes.load(Ordering::Relaxed);
        if max > 0 && self.written > 0 && self.written + buf.len() as u64 > max {
            self.rotate()?;
        }
        if self.file.is_none() {
            self.file = Some(OpenOptions::new().create(true).append(true).open(&self.path)?);
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("log file unavailable"))?;
        let n = file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

/// Handle kept by `main` for the lifetime of the process.
pub struct LogControl {
    console: reload::Handle<EnvFilter, Registry>,
    limits: Arc<RotationLimits>,
    verbose: bool,
    _guard: Option<WorkerGuard>,
}

impl LogControl {
    /// Switch to the level and rotation limits from `settings`. `--verbose`
    /// keeps the console at debug.
    pub fn apply(&self, settings: &Settings) {
        self.limits
            .set(settings.max_log_size_bytes, settings.log_backup_count);
        if self.verbose {
            return;
        }
        if let Err(e) = self
            .console
            .reload(console_filter(settings.log_level.directive()))
        {
            eprintln!("Failed to apply log level {}: {e}", settings.log_level);
        }
    }
}

fn console_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},reqwest=warn,hyper=warn")))
}

/// Install the global subscriber: console at INFO (DEBUG with `verbose`) and
/// a DEBUG file layer under `log_dir` when it can be opened.
pub fn init(log_dir: &Path, verbose: bool) -> LogControl {
    let defaults = Settings::default();
    let limits = Arc::new(RotationLimits::new(
        defaults.max_log_size_bytes,
        defaults.log_backup_count,
    ));

    let level = if verbose { "debug" } else { defaults.log_level.directive() };
    let (console_level, console) = reload::Layer::new(console_filter(level));

    let file = fs::create_dir_all(log_dir)
        .and_then(|()| RotatingFile::open(log_dir.join(LOG_FILE), limits.clone()));
    let (file_layer, guard) = match file {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(LevelFilter::DEBUG);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("Failed to open log file in {}: {e}", log_dir.display());
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(console_level))
        .with(file_layer)
        .try_init()
        .ok();

    LogControl {
        console,
        limits,
        verbose,
        _guard: guard,
    }
}
