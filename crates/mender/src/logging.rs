//! Logging initialization and the per-run log file.
//!
//! Uses the `tracing` ecosystem. Console output goes to stderr (pretty or
//! JSON) through a [`Console`] handle that can hold a progress bar; a `run`
//! additionally writes plain-text events to a timestamped file under the
//! configured log directory.

use indicatif::ProgressBar;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_subscriber::{filter::LevelFilter, fmt, fmt::MakeWriter, prelude::*, EnvFilter};

/// Initialize the logging subsystem.
///
/// # Arguments
///
/// * `console_level` - Default level for stderr when RUST_LOG is not set.
/// * `json_format` - If true, stderr gets structured JSON logs; otherwise pretty-printed.
/// * `run_log` - Optional run log file, with the level it records at.
///
/// # Notes
///
/// - Log output goes to stderr (stdout is reserved for the summary)
/// - The RUST_LOG environment variable can override the console level
/// - Attach a progress bar to the returned [`Console`] and log lines are
///   printed above it instead of through it
pub fn init(
    console_level: &str,
    json_format: bool,
    run_log: Option<(&RunLog, LevelFilter)>,
) -> Console {
    let console = Console::default();
    let console_filter =
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(console_level));

    let json_layer = json_format.then(|| {
        fmt::layer()
            .json()
            .with_writer(console.clone())
            .with_filter(console_filter())
    });
    let pretty_layer = (!json_format).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(console.clone())
            .with_ansi(true)
            .with_filter(console_filter())
    });
    let file_layer = run_log.map(|(log, level)| {
        fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(log.writer())
            .with_filter(level)
    });

    tracing_subscriber::registry()
        .with(json_layer)
        .with(pretty_layer)
        .with(file_layer)
        .init();
    console
}

/// Stderr writer that steps around an attached progress bar.
#[derive(Clone, Default)]
pub struct Console {
    bar: Arc<Mutex<Option<ProgressBar>>>,
}

impl Console {
    /// Route console output around `bar` until [`detach`](Self::detach).
    pub fn attach(&self, bar: &ProgressBar) {
        *self.slot() = Some(bar.clone());
    }

    pub fn detach(&self) {
        *self.slot() = None;
    }

    fn slot(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Write for Console {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let bar = self.slot().clone();
        match bar {
            Some(bar) => bar.suspend(|| io::stderr().write(buf)),
            None => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for Console {
    type Writer = Console;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Parse a config log level, falling back to INFO for unknown values.
pub fn level_from_str(level: &str) -> LevelFilter {
    level.trim().parse().unwrap_or(LevelFilter::INFO)
}

/// File name for a run started at `stamp`.
pub fn run_log_name(stamp: chrono::DateTime<chrono::Local>) -> String {
    format!("mender_{}.txt", stamp.format("%Y-%m-%d_%H-%M-%S"))
}

/// The log file for one run. Flushed when dropped, on every exit path of `run`.
pub struct RunLog {
    path: PathBuf,
    writer: RunLogWriter,
}

impl RunLog {
    /// Create `{dir}/mender_YYYY-MM-DD_HH-MM-SS.txt`, creating `dir` if needed.
    pub fn create(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(run_log_name(chrono::Local::now()));
        let file = File::options().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: RunLogWriter(Arc::new(Mutex::new(BufWriter::new(file)))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn writer(&self) -> RunLogWriter {
        self.writer.clone()
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Shared handle to the buffered run log file.
#[derive(Clone)]
pub struct RunLogWriter(Arc<Mutex<BufWriter<File>>>);

impl Write for RunLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.0.lock() {
            Ok(mut file) => file.write(buf),
            Err(poisoned) => poisoned.into_inner().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.0.lock() {
            Ok(mut file) => file.flush(),
            Err(poisoned) => poisoned.into_inner().flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for RunLogWriter {
    type Writer = RunLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
