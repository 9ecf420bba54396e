//! km: イベント記録ライブラリ
//!
//! ホストアプリはリクエストごとに `Pipeline::recorder` で Recorder を作り、
//! プラグインから `Tracker::assign` / `Tracker::record` を呼び、最後に `teardown` する。
//! ローテート済みのログは転送デーモン（km-mat）がアップロードする。

pub mod adapter;
pub mod domain;
pub mod ports;
pub mod usecase;
pub mod wiring;

#[cfg(test)]
mod tests;

pub use wiring::Pipeline;
