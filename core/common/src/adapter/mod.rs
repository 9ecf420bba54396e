//! アダプター（ポートの標準実装）
//!
//! usecase は ports の trait 経由でのみファイル・時刻・ログに触れる。
//! 実装は標準実装（Std*）やテスト用のモックを注入する。

pub mod error_log;
pub mod file_json_log;
pub mod std_clock;
pub mod std_fs;
pub mod throttled_log;

pub use error_log::build_error_log;
pub use file_json_log::{FileJsonLog, NoopLog};
pub use std_clock::{FixedClock, StdClock};
pub use std_fs::StdFileSystem;
pub use throttled_log::ThrottledLog;
