
use crate::ports::outbound::{ProcessTable, Uploader};
use crate::wiring::{wire_with, MatApp};
use common::adapter::{FixedClock, StdFileSystem};
use common::config::KmConfig;
use common::error::Error;
use common::segment::SegmentId;
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const NOW: u64 = 1_700_000_000;

/// PID と生存プロセスを固定で返すプロセス表
pub struct FakeProcessTable {
    pid: u32,
    alive: Vec<u32>,
    daemons: usize,
}

impl FakeProcessTable {
    pub fn new(pid: u32, alive: &[u32]) -> Self {
        Self {
            pid,
            alive: alive.to_vec(),
            daemons: 1,
        }
    }

    pub fn with_daemons(mut self, daemons: usize) -> Self {
        self.daemons = daemons;
        self
    }
}

impl ProcessTable for FakeProcessTable {
    fn current_pid(&self) -> u32 {
        self.pid
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.alive.contains(&pid)
    }

    fn count_daemons(&self) -> Result<usize, Error> {
        Ok(self.daemons)
    }
}

type Hook = Box<dyn FnOnce() + Send>;

/// 受け取った圧縮ファイルを展開して記録する Uploader
#[derive(Default)]
pub struct RecordingUploader {
    /// (ファイル名, 展開した内容)
    pub uploads: Arc<Mutex<Vec<(String, String)>>>,
    /// このファイル名のアップロードは失敗させる
    pub fail_on: Option<String>,
    /// 最初のアップロードの途中で 1 回だけ実行する
    pub hook: Mutex<Option<Hook>>,
}

impl RecordingUploader {
    pub fn names(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }
}

impl Uploader for RecordingUploader {
    fn upload(&self, artifact: &Path) -> Result<(), Error> {
        if let Some(hook) = self.hook.lock().unwrap().take() {
            hook();
        }
        let name = artifact.file_name().unwrap().to_string_lossy().into_owned();
        if self.fail_on.as_deref() == Some(name.as_str()) {
            return Err(Error::http("Upload failed: HTTP 403 Forbidden: denied"));
        }
        let mut content = String::new();
        GzDecoder::new(std::fs::File::open(artifact)?)
            .read_to_string(&mut content)?;
        self.uploads.lock().unwrap().push((name, content));
        Ok(())
    }
}

/// 一時ディレクトリを log_dir にした設定（エラーログ間引き無し）
pub fn config(dir: &Path) -> KmConfig {
    KmConfig {
        log_dir: dir.to_path_buf(),
        error_log_min_interval_secs: None,
        ..KmConfig::default()
    }
}

pub fn app(config: &KmConfig, processes: FakeProcessTable, uploader: Arc<RecordingUploader>) -> MatApp {
    wire_with(
        config,
        Arc::new(StdFileSystem),
        Arc::new(FixedClock::at_secs(NOW)),
        uploader,
        Arc::new(processes),
    )
}

pub fn segment(n: char) -> SegmentId {
    SegmentId::compose(&n.to_string().repeat(32), NOW - 60, NOW - 30).unwrap()
}

/// 転送ディレクトリに生ログを置く
pub fn put_raw(config: &KmConfig, id: &SegmentId, content: &str) {
    let dir = config.transfer_dir();
    std::fs::create_dir_all(&*dir).unwrap();
    std::fs::write(dir.log_path(id), content).unwrap();
}

pub fn error_log(config: &KmConfig) -> String {
    config
        .error_log_path()
        .and_then(|p| std::fs::read_to_string(p).ok())
        .unwrap_or_default()
}
