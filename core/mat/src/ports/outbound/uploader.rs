//! 圧縮済みセグメントをリモートストアへ送る Outbound ポート

use common::error::Error;
use std::path::Path;

pub trait Uploader: Send + Sync {
    /// アップロード先のキーはファイル名から決まる。成功（2xx）以外は Err
    fn upload(&self, artifact: &Path) -> Result<(), Error>;
}
