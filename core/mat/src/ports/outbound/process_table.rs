//! プロセスの生存確認と転送デーモン数の取得

use common::error::Error;

pub trait ProcessTable: Send + Sync {
    fn current_pid(&self) -> u32;
    /// PID のプロセスが生きているか
    fn is_alive(&self, pid: u32) -> bool;
    /// 実行中の転送デーモンの数（自分を含む）
    fn count_daemons(&self) -> Result<usize, Error>;
}
