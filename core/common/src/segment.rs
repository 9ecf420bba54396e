//! 転送セグメントの命名と転送ディレクトリの走査
//!
//! ファイル名: `<32桁hex>_<開始時刻>_<ローテート時刻>.log`。
//! 圧縮後は `.log.gz`、処理中の claim は `<id>.pid`。

use crate::error::Error;
use crate::ports::outbound::FileSystem;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// ダイジェスト部の桁数
pub const DIGEST_LEN: usize = 32;

fn id_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-f]{32}_(\d+)_(\d+)$").ok())
        .as_ref()
}

fn file_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9a-f]{32}_\d+_\d+)\.log(\.gz)?$").ok())
        .as_ref()
}

/// 転送セグメント ID（拡張子を除いたファイル名）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(String);

impl SegmentId {
    /// ダイジェスト・開始時刻・ローテート時刻から組み立てる
    pub fn compose(digest: &str, start_ts: u64, rotate_ts: u64) -> Result<Self, Error> {
        Self::parse(&format!("{}_{}_{}", digest, start_ts, rotate_ts))
    }

    /// ID 文字列を検証して受け取る
    pub fn parse(s: &str) -> Result<Self, Error> {
        if id_pattern().is_some_and(|re| re.is_match(s)) {
            Ok(Self(s.to_string()))
        } else {
            Err(Error::invalid_argument(format!("Invalid segment id: '{}'", s)))
        }
    }

    /// 転送ディレクトリ内のファイル名（.log / .log.gz）から ID を取り出す
    pub fn from_file_name(name: &str) -> Option<Self> {
        file_pattern()?
            .captures(name)
            .and_then(|c| c.get(1))
            .map(|m| Self(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// セグメントの開始時刻（Unix 秒）
    pub fn start_ts(&self) -> u64 {
        self.timestamp(1)
    }

    /// ローテート時刻（Unix 秒）
    pub fn rotate_ts(&self) -> u64 {
        self.timestamp(2)
    }

    fn timestamp(&self, group: usize) -> u64 {
        id_pattern()
            .and_then(|re| re.captures(&self.0))
            .and_then(|c| c.get(group))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    }

    pub fn log_file_name(&self) -> String {
        format!("{}.log", self.0)
    }

    pub fn gzip_file_name(&self) -> String {
        format!("{}.log.gz", self.0)
    }

    pub fn claim_file_name(&self) -> String {
        format!("{}.pid", self.0)
    }
}

impl std::ops::Deref for SegmentId {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// 転送ディレクトリ（ローテート済みセグメントの置き場）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferDir(PathBuf);

impl TransferDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn log_path(&self, id: &SegmentId) -> PathBuf {
        self.0.join(id.log_file_name())
    }

    pub fn gzip_path(&self, id: &SegmentId) -> PathBuf {
        self.0.join(id.gzip_file_name())
    }

    pub fn claim_path(&self, id: &SegmentId) -> PathBuf {
        self.0.join(id.claim_file_name())
    }

    /// 生ログか圧縮済みのどちらかが残っているか
    pub fn has_pending(&self, fs: &dyn FileSystem, id: &SegmentId) -> bool {
        fs.is_file(&self.log_path(id)) || fs.is_file(&self.gzip_path(id))
    }

    /// 転送待ちセグメント ID の一覧（.log と .log.gz の重複を除き、名前順）
    pub fn list_ids(&self, fs: &dyn FileSystem) -> Result<Vec<SegmentId>, Error> {
        let mut ids = BTreeSet::new();
        for path in fs.read_dir(&self.0)? {
            if let Some(id) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(SegmentId::from_file_name)
            {
                ids.insert(id);
            }
        }
        Ok(ids.into_iter().collect())
    }
}

impl std::ops::Deref for TransferDir {
    type Target = PathBuf;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for TransferDir {
    fn as_ref(&self) -> &Path {
        self.0.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::StdFileSystem;

    const DIGEST: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_compose_and_timestamps() {
        let id = SegmentId::compose(DIGEST, 1_700_000_000, 1_700_000_060).unwrap();
        assert_eq!(id.as_str(), format!("{}_1700000000_1700000060", DIGEST));
        assert_eq!(id.start_ts(), 1_700_000_000);
        assert_eq!(id.rotate_ts(), 1_700_000_060);
        assert_eq!(id.log_file_name(), format!("{}.log", id));
        assert_eq!(id.gzip_file_name(), format!("{}.log.gz", id));
        assert_eq!(id.claim_file_name(), format!("{}.pid", id));
    }

    #[test]
    fn test_parse_rejects_bad_ids() {
        assert!(SegmentId::parse("short_1_2").is_err());
        assert!(SegmentId::parse(&format!("{}_1_", DIGEST)).is_err());
        assert!(SegmentId::parse(&format!("{}_1_2/../x", DIGEST)).is_err());
        assert!(SegmentId::parse(&format!("{}_1_2", DIGEST.to_uppercase())).is_err());
    }

    #[test]
    fn test_from_file_name() {
        let log = format!("{}_1_2.log", DIGEST);
        let gz = format!("{}_1_2.log.gz", DIGEST);
        assert_eq!(SegmentId::from_file_name(&log).unwrap().start_ts(), 1);
        assert_eq!(
            SegmentId::from_file_name(&gz),
            SegmentId::from_file_name(&log)
        );
        assert!(SegmentId::from_file_name(&format!("{}_1_2.pid", DIGEST)).is_none());
        assert!(SegmentId::from_file_name("km.current.log").is_none());
    }

    #[test]
    fn test_list_ids_dedups_raw_and_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let a = format!("{}_1_2", DIGEST);
        let b = format!("{}_3_4", "f".repeat(32));
        std::fs::write(dir.path().join(format!("{}.log", a)), "x").unwrap();
        std::fs::write(dir.path().join(format!("{}.log.gz", a)), "x").unwrap();
        std::fs::write(dir.path().join(format!("{}.log.gz", b)), "x").unwrap();
        std::fs::write(dir.path().join(format!("{}.pid", b)), "1").unwrap();
        std::fs::write(dir.path().join("junk.txt"), "x").unwrap();

        let transfer = TransferDir::new(dir.path());
        let ids = transfer.list_ids(&StdFileSystem).unwrap();
        let names: Vec<&str> = ids.iter().map(|i| i.as_str()).collect();
        assert_eq!(names, vec![a.as_str(), b.as_str()]);
        assert!(transfer.has_pending(&StdFileSystem, &ids[1]));
    }
}
