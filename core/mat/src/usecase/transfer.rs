//! セグメント 1 件の転送（圧縮 → アップロード → 後始末）
//!
//! claim は呼び出し側（driver）が取得・解放する。

use crate::ports::outbound::{Compressor, Uploader};
use common::error::Error;
use common::ports::outbound::{Clock, FileSystem, Log, LogRecord};
use common::segment::{SegmentId, TransferDir};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// アップロード済み。生ログ・圧縮ファイルとも消えている
    Uploaded,
    /// 圧縮かアップロードに失敗。残ったファイルは後のデーモンが再試行する
    Failed,
    /// 生ログも圧縮ファイルも無い
    Missing,
}

pub struct TransferDaemon {
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    log: Arc<dyn Log>,
    compressor: Arc<dyn Compressor>,
    uploader: Arc<dyn Uploader>,
    transfer_dir: TransferDir,
    watermark: PathBuf,
}

impl TransferDaemon {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
        log: Arc<dyn Log>,
        compressor: Arc<dyn Compressor>,
        uploader: Arc<dyn Uploader>,
        transfer_dir: TransferDir,
        watermark: PathBuf,
    ) -> Self {
        Self {
            fs,
            clock,
            log,
            compressor,
            uploader,
            transfer_dir,
            watermark,
        }
    }

    pub fn run(&self, id: &SegmentId) -> TransferOutcome {
        let raw = self.transfer_dir.log_path(id);
        let gz = self.transfer_dir.gzip_path(id);
        if !self.fs.is_file(&raw) && !self.fs.is_file(&gz) {
            let _ = self.log.log_urgent(
                &LogRecord::error(format!(
                    "No log ({}) and no compressed file ({})",
                    raw.display(),
                    gz.display()
                ))
                .layer("mat")
                .kind("missing")
                .field("segment", id.as_str()),
            );
            return TransferOutcome::Missing;
        }

        if self.fs.is_file(&raw) {
            if let Err(e) = self.compress(&raw, &gz) {
                self.log_failure("compress", id, &e);
                return TransferOutcome::Failed;
            }
        }

        if let Err(e) = self.uploader.upload(&gz) {
            self.log_failure("upload", id, &e);
            return TransferOutcome::Failed;
        }
        if let Err(e) = self.fs.remove_file(&gz) {
            self.log_failure("cleanup", id, &e);
        }
        if let Err(e) = self
            .fs
            .write(&self.watermark, &self.clock.now_secs().to_string())
        {
            self.log_failure("watermark", id, &e);
        }
        TransferOutcome::Uploaded
    }

    /// 古い圧縮ファイルを消してから圧縮し、圧縮ファイルができたら生ログを消す
    fn compress(&self, raw: &std::path::Path, gz: &std::path::Path) -> Result<(), Error> {
        if self.fs.is_file(gz) {
            self.fs.remove_file(gz)?;
        }
        if let Err(e) = self.compressor.compress(raw, gz) {
            if self.fs.is_file(gz) {
                let _ = self.fs.remove_file(gz);
            }
            return Err(e);
        }
        if self.fs.is_file(gz) {
            self.fs.remove_file(raw)?;
        }
        Ok(())
    }

    fn log_failure(&self, kind: &str, id: &SegmentId, e: &Error) {
        let _ = self.log.log(
            &LogRecord::error(e.to_string())
                .layer("mat")
                .kind(kind)
                .field("segment", id.as_str()),
        );
    }
}
