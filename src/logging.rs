use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug)]
struct FileLogger {
    log_dir: PathBuf,
}

static LOGGER: OnceCell<FileLogger> = OnceCell::new();

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let entry = format!(
                "{} {} [{}] {}\n",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            );
            let log_file = self.log_dir.join("wicketwire.log");

            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_file) {
                let _ = file.write_all(entry.as_bytes());
            }

            // Warnings and errors are mirrored to the console.
            if record.level() <= Level::Warn {
                eprint!("{entry}");
            }
        }
    }

    fn flush(&self) {}
}

pub fn init(log_dir: PathBuf) -> Result<(), SetLoggerError> {
    let _ = create_dir_all(&log_dir);
    let logger = LOGGER.get_or_init(|| FileLogger { log_dir });
    log::set_logger(logger)?;
    log::set_max_level(LevelFilter::Debug);
    Ok(())
}
