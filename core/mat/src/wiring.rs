//! 配線: 設定と標準アダプタで転送デーモンを組み立てる

use crate::adapter::{GzipCompressor, HttpUploader, UnixProcessTable};
use crate::ports::outbound::{Compressor, ProcessTable, Uploader};
use crate::usecase::{ClaimStore, DriverReport, MatDriver, TransferDaemon};
use common::adapter::{build_error_log, StdClock, StdFileSystem};
use common::config::{KmConfig, DAEMON_BIN};
use common::error::Error;
use common::ports::outbound::{Clock, FileSystem, Log};
use common::segment::SegmentId;
use std::sync::Arc;

pub struct MatApp {
    pub driver: MatDriver,
}

impl MatApp {
    /// 指定セグメントから処理を始め、候補が無くなるまで続ける。
    /// 処理中に消えたセグメントがあれば Err
    pub fn run(&self, start: SegmentId) -> Result<DriverReport, Error> {
        let report = self.driver.run(Some(start))?;
        if !report.missing.is_empty() {
            let ids: Vec<&str> = report.missing.iter().map(|id| id.as_str()).collect();
            return Err(Error::io_msg(format!(
                "Segment vanished before transfer: {}",
                ids.join(", ")
            )));
        }
        Ok(report)
    }
}

/// 設定どおりのエラーログ。配線より先に作り、配線の失敗も書けるようにする
pub fn error_log(config: &KmConfig) -> Arc<dyn Log> {
    build_error_log(config, Arc::new(StdFileSystem), Arc::new(StdClock))
}

/// 標準アダプタで組み立てる
pub fn wire_mat(config: &KmConfig, log: Arc<dyn Log>) -> Result<MatApp, Error> {
    let uploader: Arc<dyn Uploader> = Arc::new(HttpUploader::new(config.upload.clone())?);
    let processes: Arc<dyn ProcessTable> =
        Arc::new(UnixProcessTable::for_current_exe(DAEMON_BIN));
    Ok(assemble(
        config,
        Arc::new(StdFileSystem),
        Arc::new(StdClock),
        log,
        uploader,
        processes,
    ))
}

pub fn wire_with(
    config: &KmConfig,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    uploader: Arc<dyn Uploader>,
    processes: Arc<dyn ProcessTable>,
) -> MatApp {
    let log = build_error_log(config, Arc::clone(&fs), Arc::clone(&clock));
    assemble(config, fs, clock, log, uploader, processes)
}

fn assemble(
    config: &KmConfig,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    log: Arc<dyn Log>,
    uploader: Arc<dyn Uploader>,
    processes: Arc<dyn ProcessTable>,
) -> MatApp {
    let compressor: Arc<dyn Compressor> = Arc::new(GzipCompressor::new(Arc::clone(&fs)));
    let claims = ClaimStore::new(
        Arc::clone(&fs),
        Arc::clone(&clock),
        Arc::clone(&processes),
        config.transfer_dir(),
    );
    let transfer = TransferDaemon::new(
        fs,
        clock,
        log,
        compressor,
        uploader,
        config.transfer_dir(),
        config.watermark_path(),
    );
    MatApp {
        driver: MatDriver::new(claims, transfer, processes, config.max_daemons),
    }
}
