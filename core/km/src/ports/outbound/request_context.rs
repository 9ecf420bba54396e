//! リクエスト情報を参照する Outbound ポート
//!
//! HTTP リクエスト・Cookie の読み書きはホスト側アダプタの責務。

/// 現在のリクエストから km が必要とする情報
pub trait RequestContext: Send + Sync {
    fn user_agent(&self) -> Option<String>;
    /// Cookie 等に保存済みの訪問者 ID
    fn person_id(&self) -> Option<String>;
    /// 新しく発行した訪問者 ID を保存する
    fn set_person_id(&self, id: &str);
}
