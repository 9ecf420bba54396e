//! セグメントを圧縮する Outbound ポート

use common::error::Error;
use std::path::Path;

pub trait Compressor: Send + Sync {
    /// `src` を圧縮して `dst` に書く。失敗時に `dst` が残っていても呼び出し側で消す
    fn compress(&self, src: &Path, dst: &Path) -> Result<(), Error>;
}
