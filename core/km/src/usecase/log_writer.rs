//! アクティブログへの追記

use super::rotator::LogRotator;
use common::error::Error;
use common::ports::outbound::{FileSystem, Log, LogRecord};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct LogWriter {
    fs: Arc<dyn FileSystem>,
    log: Arc<dyn Log>,
    active_log: PathBuf,
    rotator: Arc<LogRotator>,
}

impl LogWriter {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        log: Arc<dyn Log>,
        active_log: PathBuf,
        rotator: Arc<LogRotator>,
    ) -> Self {
        Self {
            fs,
            log,
            active_log,
            rotator,
        }
    }

    pub fn active_log(&self) -> &Path {
        &self.active_log
    }

    /// 1 行追記する（改行・CR は取り除く）。再試行はしない。
    /// `skip_rotate` が false なら追記後にローテート判定を行い、その失敗はログに記録するだけ
    pub fn append(&self, line: &str, skip_rotate: bool) -> Result<(), Error> {
        let mut clean: String = line.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
        clean.push('\n');
        if let Some(parent) = self.active_log.parent() {
            if !parent.as_os_str().is_empty() && !self.fs.is_dir(parent) {
                self.fs.create_dir_all(parent)?;
            }
        }
        let mut w = self.fs.open_append(&self.active_log)?;
        w.write_all(clean.as_bytes())
            .and_then(|_| w.flush())
            .map_err(|e| {
                Error::io_msg(format!(
                    "Failed to append to '{}': {}",
                    self.active_log.display(),
                    e
                ))
            })?;
        drop(w);

        if !skip_rotate {
            if let Err(e) = self.rotator.maybe_rotate(false) {
                let _ = self.log.log(
                    &LogRecord::error(e.to_string())
                        .layer("writer")
                        .kind("rotate")
                        .field("active_log", self.active_log.display().to_string()),
                );
            }
        }
        Ok(())
    }
}
