//! 転送デーモンを起動する Outbound ポート

use common::error::Error;
use common::segment::SegmentId;

/// セグメント 1 件につき独立した転送デーモンを 1 つ起動する能力。
/// 起動したら待たない
pub trait DaemonSpawner: Send + Sync {
    fn spawn(&self, id: &SegmentId) -> Result<(), Error>;

    /// 終了済みのデーモンを回収し、まだ動いている数を返す
    fn reap(&self) -> usize {
        0
    }
}
