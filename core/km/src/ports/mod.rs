//! Ports & Adapters のポート定義
//!
//! - inbound: ホストアプリ・CLI が km を呼び出すインターフェース
//! - outbound: km が外界（リクエスト情報・デーモン起動）を使うための trait

pub mod inbound;
pub mod outbound;
