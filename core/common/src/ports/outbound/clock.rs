//! 時刻 Outbound ポート
//!
//! usecase はこの trait 経由で「現在時刻」を取得する。テストでは固定時刻を注入する。

/// 時刻取得の抽象
///
/// 実装は `common::adapter::StdClock` やテスト用の固定時刻など。
pub trait Clock: Send + Sync {
    /// 現在時刻をミリ秒（Unix epoch）で返す
    fn now_ms(&self) -> u64;

    /// 現在時刻を秒（Unix epoch）で返す
    fn now_secs(&self) -> u64 {
        self.now_ms() / 1000
    }
}
