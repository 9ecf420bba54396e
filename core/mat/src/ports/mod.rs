//! Ports & Adapters のポート定義
//!
//! - outbound: デーモンが外界（圧縮・アップロード・プロセス表）を使うための trait

pub mod outbound;
