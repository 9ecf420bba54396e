//! Outbound ポート: 転送デーモンが外界を使うための trait

pub mod compressor;
pub mod process_table;
pub mod uploader;

pub use compressor::Compressor;
pub use process_table::ProcessTable;
pub use uploader::Uploader;
