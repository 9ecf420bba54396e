//! 転送デーモンを子プロセスとして起動する DaemonSpawner 実装
//!
//! セグメント ID と設定ファイルのパスは環境変数で渡す。標準入出力は閉じ、
//! 新しいプロセスグループで起動して親（ホストアプリ）の終了やシグナルから切り離す。
//! 終了した子はゾンビとして残らないよう、次の起動時か `reap` で回収する。

use crate::ports::outbound::DaemonSpawner;
use common::config::{CONFIG_ENV, DAEMON_BIN, SEGMENT_ID_ENV};
use common::error::Error;
use common::segment::SegmentId;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;

pub struct ProcessDaemonSpawner {
    program: PathBuf,
    config_path: Option<PathBuf>,
    children: Mutex<Vec<Child>>,
}

impl ProcessDaemonSpawner {
    pub fn new(program: impl Into<PathBuf>, config_path: Option<PathBuf>) -> Self {
        Self {
            program: program.into(),
            config_path,
            children: Mutex::new(Vec::new()),
        }
    }

    /// 設定の指定が無ければ、実行中のバイナリと同じディレクトリの km-mat を使う
    pub fn resolve_program(configured: Option<&Path>) -> PathBuf {
        if let Some(p) = configured {
            return p.to_path_buf();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(DAEMON_BIN)))
            .unwrap_or_else(|| PathBuf::from(DAEMON_BIN))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, id: &SegmentId) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.env(SEGMENT_ID_ENV, id.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(config) = &self.config_path {
            cmd.env(CONFIG_ENV, config);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd
    }
}

impl DaemonSpawner for ProcessDaemonSpawner {
    fn spawn(&self, id: &SegmentId) -> Result<(), Error> {
        self.reap();
        let child = self.command(id).spawn().map_err(|e| {
            Error::io_msg(format!(
                "Failed to spawn '{}' for {}: {}",
                self.program.display(),
                id,
                e
            ))
        })?;
        if let Ok(mut children) = self.children.lock() {
            children.push(child);
        }
        Ok(())
    }

    fn reap(&self) -> usize {
        let Ok(mut children) = self.children.lock() else {
            return 0;
        };
        // try_wait が Err の子は二度と回収できないので手放す
        children.retain_mut(|c| matches!(c.try_wait(), Ok(None)));
        children.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> SegmentId {
        SegmentId::compose(&"a".repeat(32), 1, 2).unwrap()
    }

    #[test]
    fn test_configured_program_wins() {
        let p = ProcessDaemonSpawner::resolve_program(Some(Path::new("/opt/km/bin/km-mat")));
        assert_eq!(p, PathBuf::from("/opt/km/bin/km-mat"));
        let default = ProcessDaemonSpawner::resolve_program(None);
        assert!(default.ends_with(DAEMON_BIN));
    }

    #[test]
    fn test_command_passes_segment_and_config() {
        let spawner = ProcessDaemonSpawner::new("/bin/true", Some(PathBuf::from("/etc/km.json")));
        let cmd = spawner.command(&id());
        let envs: Vec<_> = cmd
            .get_envs()
            .map(|(k, v)| (k.to_os_string(), v.map(|v| v.to_os_string())))
            .collect();
        assert!(envs.contains(&(SEGMENT_ID_ENV.into(), Some(id().as_str().into()))));
        assert!(envs.contains(&(CONFIG_ENV.into(), Some("/etc/km.json".into()))));
    }

    #[cfg(target_os = "linux")]
    fn zombie_children(program: &str) -> usize {
        let me = std::process::id().to_string();
        std::fs::read_dir("/proc")
            .unwrap()
            .flatten()
            .filter_map(|e| std::fs::read_to_string(e.path().join("stat")).ok())
            .filter(|stat| {
                let Some(close) = stat.rfind(')') else {
                    return false;
                };
                let comm = stat[..close].split_once('(').map(|(_, c)| c);
                let mut rest = stat[close + 1..].split_whitespace();
                comm == Some(program) && rest.next() == Some("Z") && rest.next() == Some(me.as_str())
            })
            .count()
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_exited_daemons_are_reaped() {
        let spawner = ProcessDaemonSpawner::new("/bin/true", None);
        for _ in 0..3 {
            spawner.spawn(&id()).unwrap();
        }
        let mut running = spawner.reap();
        for _ in 0..100 {
            if running == 0 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(20));
            running = spawner.reap();
        }
        assert_eq!(running, 0);
        assert_eq!(zombie_children("true"), 0);
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let spawner = ProcessDaemonSpawner::new("/nonexistent/km-mat", None);
        assert!(matches!(spawner.spawn(&id()), Err(Error::Io(_))));
    }
}
