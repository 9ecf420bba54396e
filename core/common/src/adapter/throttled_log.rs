//! 書き込み間隔で間引く Log デコレータ
//!
//! 失敗がループしてもエラーログが溢れないよう、前回の書き込みから
//! `min_interval_secs` 未満の通常レコードは捨てる。`log_urgent` は常に書く。
//! 前回の書き込み時刻は初回だけログファイルの mtime から読み、以後はメモリで追う。

use crate::error::Error;
use crate::ports::outbound::{Clock, FileSystem, Log, LogRecord};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub struct ThrottledLog {
    inner: Arc<dyn Log>,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    path: PathBuf,
    min_interval_secs: u64,
    /// 最後に書いた時刻（Unix 秒）。None は未取得
    last_write: Mutex<Option<u64>>,
}

impl ThrottledLog {
    pub fn new(
        inner: Arc<dyn Log>,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
        path: impl AsRef<Path>,
        min_interval_secs: u64,
    ) -> Self {
        Self {
            inner,
            fs,
            clock,
            path: path.as_ref().to_path_buf(),
            min_interval_secs,
            last_write: Mutex::new(None),
        }
    }

    fn write_and_mark(&self, record: &LogRecord, last: &mut Option<u64>) -> Result<(), Error> {
        self.inner.log(record)?;
        *last = Some(self.clock.now_secs());
        Ok(())
    }
}

impl Log for ThrottledLog {
    fn log(&self, record: &LogRecord) -> Result<(), Error> {
        let mut last = self
            .last_write
            .lock()
            .map_err(|_| Error::system("throttled log lock poisoned"))?;
        let previous = match *last {
            Some(t) => t,
            None => self
                .fs
                .metadata(&self.path)
                .ok()
                .and_then(|m| m.modified_secs())
                .unwrap_or(0),
        };
        if self.clock.now_secs().saturating_sub(previous) < self.min_interval_secs {
            *last = Some(previous);
            return Ok(());
        }
        self.write_and_mark(record, &mut last)
    }

    fn log_urgent(&self, record: &LogRecord) -> Result<(), Error> {
        let mut last = self
            .last_write
            .lock()
            .map_err(|_| Error::system("throttled log lock poisoned"))?;
        self.write_and_mark(record, &mut last)
    }
}
