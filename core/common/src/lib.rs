//! km 共通ライブラリ
//!
//! 記録側（`km`）と転送デーモン（`km-mat`）で共有される機能を提供します。

/// エラーハンドリング
pub mod error;

/// 設定ファイル
pub mod config;

/// 転送セグメントの命名と走査
pub mod segment;

/// Outbound ポート（FS・時刻・ログ）
pub mod ports;

/// ポートの標準実装
pub mod adapter;
