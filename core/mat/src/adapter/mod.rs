//! Outbound ポートの実装

mod gzip_compressor;
mod http_uploader;
mod unix_process_table;

pub use gzip_compressor::GzipCompressor;
pub use http_uploader::HttpUploader;
pub use unix_process_table::UnixProcessTable;
