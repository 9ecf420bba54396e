//! Inbound ポート: ホストアプリ（プラグイン）と CLI が km を呼び出すインターフェース

use crate::domain::{PropertyMap, PropertyType, RawValue};
use common::error::Error;

/// プラグインが使う記録 API。
/// 実装はホストアプリへエラーを返さない（内部エラーはログに書いて握りつぶす）
pub trait Tracker {
    /// 以降のすべてのアクションに付ける既定プロパティを設定する
    fn assign(&mut self, name: &str, value: RawValue, ty: PropertyType);
    /// アクションを 1 件積む
    fn record(&mut self, name: &str, properties: PropertyMap);
}

/// 解析済みコマンドを実行する Inbound ポート（main から呼ぶ）
pub trait UseCaseRunner {
    type Command;
    fn run(&self, command: Self::Command) -> Result<i32, Error>;
}
