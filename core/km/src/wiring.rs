//! 配線: 設定と標準アダプタから記録パイプラインを組み立てる

use crate::adapter::ProcessDaemonSpawner;
use crate::ports::outbound::{DaemonSpawner, RequestContext};
use crate::usecase::{DaemonLauncher, LogRotator, LogWriter, Recorder, RecorderOptions, RotatePolicy};
use common::adapter::{build_error_log, StdClock, StdFileSystem};
use common::config::KmConfig;
use common::ports::outbound::{Clock, FileSystem, Log};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// 記録側の部品一式。リクエストごとに `recorder` で Recorder を作る
pub struct Pipeline {
    pub config: KmConfig,
    pub log: Arc<dyn Log>,
    pub clock: Arc<dyn Clock>,
    pub launcher: Arc<DaemonLauncher>,
    pub rotator: Arc<LogRotator>,
    pub writer: Arc<LogWriter>,
}

impl Pipeline {
    /// 標準アダプタで組み立てる。`config_path` はデーモンへ引き継ぐ
    pub fn from_config(config: KmConfig, config_path: Option<PathBuf>) -> Self {
        let program = ProcessDaemonSpawner::resolve_program(config.daemon_program.as_deref());
        let spawner: Arc<dyn DaemonSpawner> =
            Arc::new(ProcessDaemonSpawner::new(program, config_path));
        Self::with_adapters(config, Arc::new(StdFileSystem), Arc::new(StdClock), spawner)
    }

    pub fn with_adapters(
        config: KmConfig,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
        spawner: Arc<dyn DaemonSpawner>,
    ) -> Self {
        let log = build_error_log(&config, Arc::clone(&fs), Arc::clone(&clock));
        let transfer_dir = config.transfer_dir();
        let launcher = Arc::new(DaemonLauncher::new(
            Arc::clone(&fs),
            spawner,
            Arc::clone(&log),
            transfer_dir.clone(),
            Duration::from_millis(config.spawn_stagger_ms),
        ));
        let rotator = Arc::new(LogRotator::new(
            Arc::clone(&fs),
            Arc::clone(&clock),
            Arc::clone(&log),
            config.active_log_path(),
            transfer_dir,
            RotatePolicy {
                period_secs: config.rotate_period_secs,
                size_bytes: config.rotate_size_bytes,
            },
            Some(Arc::clone(&launcher)),
        ));
        let writer = Arc::new(LogWriter::new(
            fs,
            Arc::clone(&log),
            config.active_log_path(),
            Arc::clone(&rotator),
        ));
        Self {
            config,
            log,
            clock,
            launcher,
            rotator,
            writer,
        }
    }

    /// 1 リクエスト分の Recorder を作る
    pub fn recorder(&self, request: Arc<dyn RequestContext>) -> Recorder {
        Recorder::new(
            request,
            Arc::clone(&self.writer),
            Arc::clone(&self.clock),
            Arc::clone(&self.log),
            RecorderOptions {
                disabled: self.config.disabled,
                track_robots: self.config.track_robots,
            },
        )
    }
}
