//! Process logging
//!
//! All code logs through the standard `log` macros; this module only wires the
//! backend. `env_logger` writes to stdout, and when file logging is enabled each
//! line is also appended to `<log_dir>/server_YYYYMMDD.log` (date taken at
//! startup).

use crate::config::IngestdConfig;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Initialize logging from configuration.
///
/// Safe to call more than once; only the first call installs a logger.
/// `RUST_LOG` still overrides the configured level.
pub fn init_logging(config: &IngestdConfig) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder
        .parse_filters(&config.logging.level)
        .parse_env("RUST_LOG")
        .format_timestamp_millis()
        .format_module_path(false);

    if config.logging.file_enabled {
        let path = daily_log_path(&config.log_dir(), chrono::Local::now().date_naive());
        let tee = TeeWriter::open(&path)?;
        builder.target(env_logger::Target::Pipe(Box::new(tee)));
    }

    // Use try_init to avoid panic if already initialized
    let _ = builder.try_init();
    Ok(())
}

/// `server_YYYYMMDD.log` under `log_dir`
pub fn daily_log_path(log_dir: &Path, date: chrono::NaiveDate) -> PathBuf {
    log_dir.join(format!("server_{}.log", date.format("%Y%m%d")))
}

/// Writes every log line to stdout and to an append-mode file
struct TeeWriter {
    file: File,
}

impl TeeWriter {
    fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        Ok(Self { file })
    }
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        self.file.flush()
    }
}
