//! ログローテートユースケース
//!
//! アクティブログの先頭 10 バイト（開始時刻）とサイズから期限切れを判定し、
//! 転送ディレクトリへ rename で引き渡す。成功したらデーモンを起動する。

use super::launcher::DaemonLauncher;
use common::error::Error;
use common::ports::outbound::{Clock, FileSystem, Log, LogRecord};
use common::segment::{SegmentId, TransferDir};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 開始時刻の桁数（続く 1 バイトは `|`）
pub const START_PREFIX_LEN: usize = 10;

/// 同じミリ秒・同じサイズのローテートでも名前が衝突しないようにする連番
static ROTATE_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotateOutcome {
    NotNeeded,
    Rotated(SegmentId),
}

/// ローテートの閾値
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotatePolicy {
    pub period_secs: u64,
    pub size_bytes: u64,
}

impl RotatePolicy {
    /// 経過時間が期間以上、またはサイズが上限超過なら true
    pub fn is_due(&self, age_secs: u64, size: u64) -> bool {
        age_secs >= self.period_secs || size > self.size_bytes
    }
}

pub struct LogRotator {
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    log: Arc<dyn Log>,
    active_log: PathBuf,
    transfer_dir: TransferDir,
    policy: RotatePolicy,
    launcher: Option<Arc<DaemonLauncher>>,
}

impl LogRotator {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
        log: Arc<dyn Log>,
        active_log: PathBuf,
        transfer_dir: TransferDir,
        policy: RotatePolicy,
        launcher: Option<Arc<DaemonLauncher>>,
    ) -> Self {
        Self {
            fs,
            clock,
            log,
            active_log,
            transfer_dir,
            policy,
            launcher,
        }
    }

    /// アクティブログの開始時刻。11 バイト未満か `<10桁>|` で始まらなければ None
    pub fn start_time(&self) -> Option<u64> {
        let prefix = self
            .fs
            .read_prefix(&self.active_log, START_PREFIX_LEN + 1)
            .ok()?;
        parse_start_prefix(&prefix)
    }

    pub fn maybe_rotate(&self, force: bool) -> Result<RotateOutcome, Error> {
        let size = match self.fs.metadata(&self.active_log) {
            Ok(m) if m.is_file() => m.len(),
            _ => return Ok(RotateOutcome::NotNeeded),
        };
        if size == 0 {
            return Ok(RotateOutcome::NotNeeded);
        }
        let now_ms = self.clock.now_ms();
        let now = now_ms / 1000;
        let start = self.start_time();
        if !force {
            match start {
                Some(s) if self.policy.is_due(now.saturating_sub(s), size) => {}
                _ => return Ok(RotateOutcome::NotNeeded),
            }
        }
        let id = SegmentId::compose(
            &segment_digest(
                now_ms,
                size,
                std::process::id(),
                ROTATE_SEQ.fetch_add(1, Ordering::Relaxed),
            ),
            start.unwrap_or(now),
            now,
        )?;
        self.fs.create_dir_all(&self.transfer_dir)?;
        let target = self.transfer_dir.log_path(&id);
        self.fs.rename(&self.active_log, &target)?;
        if let Some(launcher) = &self.launcher {
            if let Err(e) = launcher.launch() {
                let _ = self.log.log(
                    &LogRecord::error(e.to_string())
                        .layer("rotator")
                        .kind("spawn"),
                );
            }
        }
        Ok(RotateOutcome::Rotated(id))
    }
}

/// `<10桁の数字>|` で始まる先頭バイト列から開始時刻を読む
pub fn parse_start_prefix(prefix: &[u8]) -> Option<u64> {
    if prefix.len() < START_PREFIX_LEN + 1 || prefix[START_PREFIX_LEN] != b'|' {
        return None;
    }
    let digits = &prefix[..START_PREFIX_LEN];
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// 時刻・サイズ・PID・プロセス内連番から 32 桁の hex ダイジェストを作る
pub fn segment_digest(now_ms: u64, size: u64, pid: u32, seq: u64) -> String {
    let hash = Sha256::digest(format!("{}:{}:{}:{}", now_ms, size, pid, seq).as_bytes());
    hex::encode(&hash[..common::segment::DIGEST_LEN / 2])
}
