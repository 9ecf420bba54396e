//! kill(pid, 0) と /proc（Linux 以外は ps）によるプロセス表
//!
//! ゾンビ（終了済みで未回収）のプロセスは生きていないものとして扱う。

use crate::ports::outbound::ProcessTable;
use common::error::Error;
use std::path::Path;

/// /proc/<pid>/comm に入る実行ファイル名の最大長
const COMM_LEN: usize = 15;

pub struct UnixProcessTable {
    /// 数える対象の実行ファイル名（例: km-mat）
    program_name: String,
}

impl UnixProcessTable {
    pub fn new(program_name: impl Into<String>) -> Self {
        Self {
            program_name: program_name.into(),
        }
    }

    /// 実行中のバイナリ名から作る
    pub fn for_current_exe(fallback: &str) -> Self {
        let name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| fallback.to_string());
        Self::new(name)
    }

    fn matches(&self, name: &str) -> bool {
        let base = Path::new(name.trim())
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if base == self.program_name {
            return true;
        }
        // comm は 15 文字で切り詰められる
        self.program_name.len() > COMM_LEN
            && base.len() == COMM_LEN
            && self.program_name.starts_with(&base)
    }

    /// ゾンビを除いた実行中プロセスの名前
    #[cfg(target_os = "linux")]
    fn process_names(&self) -> Result<Vec<String>, Error> {
        let entries = std::fs::read_dir("/proc")
            .map_err(|e| Error::io_msg(format!("Failed to read /proc: {}", e)))?;
        Ok(entries
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|e| std::fs::read_to_string(e.path().join("stat")).ok())
            .filter_map(|stat| {
                parse_stat(&stat)
                    .filter(|(_, state)| *state != 'Z')
                    .map(|(comm, _)| comm.to_string())
            })
            .collect())
    }

    #[cfg(not(target_os = "linux"))]
    fn process_names(&self) -> Result<Vec<String>, Error> {
        let output = std::process::Command::new("ps")
            .args(["-A", "-o", "stat=,comm="])
            .output()
            .map_err(|e| Error::io_msg(format!("Failed to execute 'ps': {}", e)))?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| line.trim_start().split_once(char::is_whitespace))
            .filter(|(state, _)| !state.starts_with('Z'))
            .map(|(_, comm)| comm.trim().to_string())
            .collect())
    }
}

#[cfg(target_os = "linux")]
fn is_zombie(pid: libc::pid_t) -> bool {
    std::fs::read_to_string(format!("/proc/{}/stat", pid))
        .ok()
        .and_then(|stat| parse_stat(&stat).map(|(_, state)| state == 'Z'))
        .unwrap_or(false)
}

#[cfg(not(target_os = "linux"))]
fn is_zombie(pid: libc::pid_t) -> bool {
    std::process::Command::new("ps")
        .args(["-o", "stat=", "-p", &pid.to_string()])
        .output()
        .map(|o| String::from_utf8_lossy(&o.stdout).trim_start().starts_with('Z'))
        .unwrap_or(false)
}

/// `/proc/<pid>/stat` から (comm, 状態) を取り出す。comm は括弧や空白を含みうる
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_stat(stat: &str) -> Option<(&str, char)> {
    let open = stat.find('(')?;
    let close = stat.rfind(')')?;
    let comm = stat.get(open + 1..close)?;
    let state = stat.get(close + 1..)?.trim_start().chars().next()?;
    Some((comm, state))
}

impl ProcessTable for UnixProcessTable {
    fn current_pid(&self) -> u32 {
        std::process::id()
    }

    fn is_alive(&self, pid: u32) -> bool {
        let Ok(pid) = libc::pid_t::try_from(pid) else {
            return false;
        };
        if pid <= 0 {
            return false;
        }
        // シグナル 0: 送信はせず存在と権限だけ確認する。EPERM は生存扱い
        let result = unsafe { libc::kill(pid, 0) };
        let exists =
            result == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM);
        exists && !is_zombie(pid)
    }

    fn count_daemons(&self) -> Result<usize, Error> {
        Ok(self
            .process_names()?
            .iter()
            .filter(|n| self.matches(n))
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_is_alive() {
        let table = UnixProcessTable::new("km-mat");
        assert!(table.is_alive(table.current_pid()));
        assert!(!table.is_alive(0));
        assert!(!table.is_alive(u32::MAX));
    }

    #[test]
    fn test_reaped_child_is_dead() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        assert!(!UnixProcessTable::new("km-mat").is_alive(pid));
    }

    #[test]
    fn test_parse_stat() {
        assert_eq!(parse_stat("42 (km-mat) S 1 42 42 0"), Some(("km-mat", 'S')));
        assert_eq!(parse_stat("43 (a) b) Z 1 0"), Some(("a) b", 'Z')));
        assert_eq!(parse_stat("garbage"), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_unreaped_child_is_dead() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        let stat = format!("/proc/{}/stat", pid);
        for _ in 0..100 {
            let state = std::fs::read_to_string(&stat)
                .ok()
                .and_then(|s| parse_stat(&s).map(|(_, st)| st));
            if state == Some('Z') {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        assert!(!UnixProcessTable::new("true").is_alive(pid));
        child.wait().unwrap();
    }

    #[test]
    fn test_name_matching() {
        let table = UnixProcessTable::new("km-mat");
        assert!(table.matches("km-mat\n"));
        assert!(table.matches("/usr/local/bin/km-mat"));
        assert!(!table.matches("km"));

        let long = UnixProcessTable::new("km-mat-0123456789");
        assert!(long.matches("km-mat-01234567"));
    }

    #[test]
    fn test_count_includes_current_process() {
        let table = UnixProcessTable::for_current_exe("km-mat");
        assert!(table.count_daemons().unwrap() >= 1);
    }
}
