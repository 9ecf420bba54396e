
use crate::ports::outbound::DaemonSpawner;
use crate::wiring::Pipeline;
use common::adapter::{FixedClock, StdFileSystem};
use common::config::KmConfig;
use common::error::Error;
use common::segment::SegmentId;
use std::sync::{Arc, Mutex};

/// 起動要求を記録するだけの DaemonSpawner
#[derive(Default)]
pub struct RecordingSpawner {
    pub spawned: Mutex<Vec<SegmentId>>,
}

impl DaemonSpawner for RecordingSpawner {
    fn spawn(&self, id: &SegmentId) -> Result<(), Error> {
        self.spawned.lock().unwrap().push(id.clone());
        Ok(())
    }
}

pub struct Harness {
    pub dir: tempfile::TempDir,
    pub pipeline: Pipeline,
    pub spawner: Arc<RecordingSpawner>,
}

impl Harness {
    pub fn config(&self) -> &KmConfig {
        &self.pipeline.config
    }

    pub fn active_log(&self) -> String {
        std::fs::read_to_string(self.config().active_log_path()).unwrap_or_default()
    }

    pub fn error_log(&self) -> String {
        self.config()
            .error_log_path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .unwrap_or_default()
    }
}

/// 一時ディレクトリを log_dir にした Pipeline（時刻固定・スタッガー無し・エラーログ間引き無し）
pub fn harness(now_secs: u64, tweak: impl FnOnce(&mut KmConfig)) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = KmConfig {
        log_dir: dir.path().to_path_buf(),
        spawn_stagger_ms: 0,
        error_log_min_interval_secs: None,
        ..KmConfig::default()
    };
    tweak(&mut config);
    let spawner = Arc::new(RecordingSpawner::default());
    let pipeline = Pipeline::with_adapters(
        config,
        Arc::new(StdFileSystem),
        Arc::new(FixedClock::at_secs(now_secs)),
        Arc::clone(&spawner) as Arc<dyn DaemonSpawner>,
    );
    Harness {
        dir,
        pipeline,
        spawner,
    }
}
