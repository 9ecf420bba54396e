//! デーモン起動ユースケース
//!
//! 転送ディレクトリの未転送セグメントごとに転送デーモンを 1 つ起動する。
//! 起動失敗は記録するだけで再試行しない（次のローテート時に再発見される）。

use crate::ports::outbound::DaemonSpawner;
use common::error::Error;
use common::ports::outbound::{FileSystem, Log, LogRecord};
use common::segment::TransferDir;
use std::sync::Arc;
use std::time::Duration;

pub struct DaemonLauncher {
    fs: Arc<dyn FileSystem>,
    spawner: Arc<dyn DaemonSpawner>,
    log: Arc<dyn Log>,
    transfer_dir: TransferDir,
    /// 起動と起動の間隔（最初の 1 件の前には待たない）
    stagger: Duration,
}

impl DaemonLauncher {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        spawner: Arc<dyn DaemonSpawner>,
        log: Arc<dyn Log>,
        transfer_dir: TransferDir,
        stagger: Duration,
    ) -> Self {
        Self {
            fs,
            spawner,
            log,
            transfer_dir,
            stagger,
        }
    }

    /// 起動できたデーモンの数を返す
    pub fn launch(&self) -> Result<usize, Error> {
        self.spawner.reap();
        if !self.fs.is_dir(&self.transfer_dir) {
            return Ok(0);
        }
        let ids = self.transfer_dir.list_ids(self.fs.as_ref())?;
        let mut spawned = 0;
        for (i, id) in ids.iter().enumerate() {
            if i > 0 && !self.stagger.is_zero() {
                std::thread::sleep(self.stagger);
            }
            match self.spawner.spawn(id) {
                Ok(()) => spawned += 1,
                Err(e) => {
                    let _ = self.log.log(
                        &LogRecord::error(e.to_string())
                            .layer("launcher")
                            .kind("spawn")
                            .field("segment", id.as_str()),
                    );
                }
            }
        }
        Ok(spawned)
    }
}
