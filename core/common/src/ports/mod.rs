//! Ports & Adapters のポート定義
//!
//! - outbound: km と km-mat が共有する外界（FS・時刻・ログ）への trait
//!
//! inbound はアプリ側（km / km-mat）がそれぞれ持つ。

pub mod outbound;
