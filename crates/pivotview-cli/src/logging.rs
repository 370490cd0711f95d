// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! File-backed `log` sink. The terminal UI owns stdout, so records go to a file.

use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub struct FileLogger {
    level: LevelFilter,
    seq: AtomicU64,
    file: Mutex<Option<File>>,
}

impl FileLogger {
    pub fn open(path: &Path, level: LevelFilter) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| {
                format!(
                    "open log file {} -- set [log].path to a writable location",
                    path.display()
                )
            })?;
        Ok(Self {
            level,
            seq: AtomicU64::new(0),
            file: Mutex::new(Some(file)),
        })
    }

    fn line(&self, record: &Record<'_>) -> String {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let stamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "-".to_owned());
        format!(
            "{stamp}|{seq}|{}|{}|{}\n",
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = self.line(record);
        if let Ok(mut guard) = self.file.lock()
            && let Some(file) = guard.as_mut()
        {
            let _ = file.write_all(line.as_bytes());
        }
    }

    fn flush(&self) {
        if let Ok(mut guard) = self.file.lock()
            && let Some(file) = guard.as_mut()
        {
            let _ = file.flush();
        }
    }
}

/// Installs the file logger as the process-wide `log` backend.
pub fn init(path: &Path, level: LevelFilter) -> Result<()> {
    if level == LevelFilter::Off {
        return Ok(());
    }
    let logger = FileLogger::open(path, level)?;
    log::set_boxed_logger(Box::new(logger))
        .map_err(|error| anyhow!("install logger: {error}"))?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::FileLogger;
    use anyhow::Result;
    use log::{Level, LevelFilter, Log, Record};

    #[test]
    fn writes_records_at_or_above_level() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("pivotview.log");
        let logger = FileLogger::open(&path, LevelFilter::Warn)?;

        logger.log(
            &Record::builder()
                .level(Level::Error)
                .target("pivotview_app::widget")
                .args(format_args!("pivot reload failed"))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .target("pivotview_client")
                .args(format_args!("GET http://host/p.json"))
                .build(),
        );
        logger.flush();

        let written = std::fs::read_to_string(&path)?;
        let lines = written.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("|1|ERROR|pivotview_app::widget|pivot reload failed"));
        Ok(())
    }

    #[test]
    fn appends_to_existing_file() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("pivotview.log");
        std::fs::write(&path, "earlier\n")?;
        let logger = FileLogger::open(&path, LevelFilter::Info)?;
        logger.log(
            &Record::builder()
                .level(Level::Info)
                .target("pivotview")
                .args(format_args!("started"))
                .build(),
        );
        logger.flush();
        let written = std::fs::read_to_string(&path)?;
        assert!(written.starts_with("earlier\n"));
        assert!(written.trim_end().ends_with("|INFO|pivotview|started"));
        Ok(())
    }
}
