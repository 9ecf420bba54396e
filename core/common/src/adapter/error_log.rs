//! 設定からエラーログ（Log 実装）を組み立てる

use crate::adapter::{FileJsonLog, NoopLog, ThrottledLog};
use crate::config::KmConfig;
use crate::ports::outbound::{Clock, FileSystem, Log};
use std::sync::Arc;

/// エラーログ無効なら NoopLog、間隔指定があれば ThrottledLog で包んだ FileJsonLog
pub fn build_error_log(
    config: &KmConfig,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
) -> Arc<dyn Log> {
    let Some(path) = config.error_log_path() else {
        return Arc::new(NoopLog);
    };
    let file: Arc<dyn Log> = Arc::new(FileJsonLog::new(Arc::clone(&fs), &path));
    match config.error_log_min_interval_secs {
        Some(secs) if secs > 0 => Arc::new(ThrottledLog::new(file, fs, clock, &path, secs)),
        _ => file,
    }
}
