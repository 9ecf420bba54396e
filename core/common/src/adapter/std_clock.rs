//! 標準時刻実装（SystemTime を委譲）

use crate::ports::outbound::Clock;
use std::time::{SystemTime, UNIX_EPOCH};

/// 標準ライブラリの SystemTime を使う Clock 実装
#[derive(Debug, Clone, Default)]
pub struct StdClock;

impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// 固定時刻を返す Clock 実装（テスト・再現用）
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl FixedClock {
    /// Unix 秒から作る
    pub fn at_secs(secs: u64) -> Self {
        Self(secs * 1000)
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> u64 {
        self.0
    }
}
