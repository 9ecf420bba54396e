//! セグメントの claim（`<id>.pid` ロックファイル）
//!
//! 排他作成で取得する。既存ファイルの PID が死んでいれば stale として
//! `<id>.pid.<自分の PID>` へ rename し、rename 後の中身も stale だった場合だけ消して
//! 1 回だけ作り直す。rename 後に生きた PID が入っていたら元に戻して claim 中とみなす。
//! 解放（ClaimGuard の drop）は自分の PID が書かれている場合だけ。

use crate::ports::outbound::ProcessTable;
use common::error::Error;
use common::ports::outbound::{Clock, FileSystem};
use common::segment::{SegmentId, TransferDir};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 作成直後で PID がまだ書かれていない claim を保持中とみなす秒数
pub const CLAIM_WRITE_GRACE_SECS: u64 = 10;

pub struct ClaimStore {
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    processes: Arc<dyn ProcessTable>,
    transfer_dir: TransferDir,
}

impl ClaimStore {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
        processes: Arc<dyn ProcessTable>,
        transfer_dir: TransferDir,
    ) -> Self {
        Self {
            fs,
            clock,
            processes,
            transfer_dir,
        }
    }

    /// claim ファイルに書かれた PID
    pub fn holder(&self, id: &SegmentId) -> Option<u32> {
        read_pid(self.fs.as_ref(), &self.transfer_dir.claim_path(id))
    }

    /// 生きているプロセスが claim しているか
    pub fn is_claimed(&self, id: &SegmentId) -> bool {
        self.is_held_at(&self.transfer_dir.claim_path(id))
    }

    fn is_held_at(&self, path: &Path) -> bool {
        let Ok(meta) = self.fs.metadata(path) else {
            return false;
        };
        match read_pid(self.fs.as_ref(), path) {
            Some(pid) => self.processes.is_alive(pid),
            None => meta
                .modified_secs()
                .is_some_and(|m| self.clock.now_secs().saturating_sub(m) < CLAIM_WRITE_GRACE_SECS),
        }
    }

    /// 取得できれば解放用のガードを返す。他のプロセスが保持中なら None
    pub fn try_claim(&self, id: &SegmentId) -> Result<Option<ClaimGuard>, Error> {
        let path = self.transfer_dir.claim_path(id);
        let pid = self.processes.current_pid();
        for attempt in 0..2 {
            if self.fs.create_new(&path, &pid.to_string())? {
                return Ok(Some(ClaimGuard {
                    fs: Arc::clone(&self.fs),
                    path,
                    pid,
                }));
            }
            if attempt > 0 || self.is_held_at(&path) || !self.retire_stale(&path, pid) {
                break;
            }
        }
        Ok(None)
    }

    /// stale と判断した claim を退避して消す。作り直してよければ true
    fn retire_stale(&self, path: &Path, pid: u32) -> bool {
        let mut name = path.as_os_str().to_os_string();
        name.push(format!(".{}", pid));
        let tombstone = PathBuf::from(name);
        if self.fs.rename(path, &tombstone).is_err() {
            // 既に他のプロセスが退避した
            return true;
        }
        if self.is_held_at(&tombstone) {
            // 判定と rename の間に他のプロセスが取り直していた
            let _ = self.fs.rename(&tombstone, path);
            return false;
        }
        let _ = self.fs.remove_file(&tombstone);
        true
    }

    /// 次に処理するセグメント。
    /// `start` が未 claim でファイルが残っていればそれを、なければ転送ディレクトリを
    /// 名前順に走査して ignore にも claim 中にも無い最初のものを返す
    pub fn next_candidate(
        &self,
        start: Option<&SegmentId>,
        ignore: &BTreeSet<SegmentId>,
    ) -> Result<Option<SegmentId>, Error> {
        let available = |id: &SegmentId| !ignore.contains(id) && !self.is_claimed(id);
        if let Some(id) = start {
            if available(id) && self.transfer_dir.has_pending(self.fs.as_ref(), id) {
                return Ok(Some(id.clone()));
            }
        }
        if !self.fs.is_dir(&self.transfer_dir) {
            return Ok(None);
        }
        Ok(self
            .transfer_dir
            .list_ids(self.fs.as_ref())?
            .into_iter()
            .find(|id| available(id)))
    }
}

fn read_pid(fs: &dyn FileSystem, path: &std::path::Path) -> Option<u32> {
    fs.read_to_string(path).ok()?.trim().parse().ok()
}

/// 取得した claim。drop で解放する（ファイルに自分の PID が残っている場合だけ消す）
pub struct ClaimGuard {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    pid: u32,
}

impl ClaimGuard {
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        if read_pid(self.fs.as_ref(), &self.path) == Some(self.pid) {
            let _ = self.fs.remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::FakeProcessTable;
    use common::adapter::{FixedClock, StdFileSystem};
    use common::ports::outbound::FileMetadata;
    use std::io::{Read, Write};
    use std::sync::Mutex;

    const NOW: u64 = 1_700_000_000;

    fn id(n: char) -> SegmentId {
        SegmentId::compose(&n.to_string().repeat(32), 1, 2).unwrap()
    }

    fn store(dir: &std::path::Path, pid: u32, alive: &[u32]) -> ClaimStore {
        ClaimStore::new(
            Arc::new(StdFileSystem),
            Arc::new(FixedClock::at_secs(NOW)),
            Arc::new(FakeProcessTable::new(pid, alive)),
            TransferDir::new(dir),
        )
    }

    #[test]
    fn test_claim_is_exclusive_and_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let a = store(dir.path(), 100, &[100, 200]);
        let b = store(dir.path(), 200, &[100, 200]);

        let guard = a.try_claim(&id('a')).unwrap().unwrap();
        assert_eq!(a.holder(&id('a')), Some(100));
        assert!(b.is_claimed(&id('a')));
        assert!(b.try_claim(&id('a')).unwrap().is_none());

        drop(guard);
        assert!(!dir.path().join(id('a').claim_file_name()).exists());
        assert!(b.try_claim(&id('a')).unwrap().is_some());
    }

    #[test]
    fn test_stale_claim_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(id('a').claim_file_name()), "999").unwrap();
        let s = store(dir.path(), 100, &[100]);

        assert!(!s.is_claimed(&id('a')));
        let guard = s.try_claim(&id('a')).unwrap().unwrap();
        assert_eq!(guard.pid(), 100);
        assert_eq!(s.holder(&id('a')), Some(100));
    }

    type Hook = Box<dyn FnOnce() + Send>;

    /// 指定した操作の直前に 1 回だけ hook を割り込ませる FileSystem
    struct InterleavedFs {
        inner: StdFileSystem,
        op: &'static str,
        hook: Mutex<Option<Hook>>,
    }

    impl InterleavedFs {
        fn new(op: &'static str, hook: impl FnOnce() + Send + 'static) -> Self {
            Self {
                inner: StdFileSystem,
                op,
                hook: Mutex::new(Some(Box::new(hook))),
            }
        }

        fn before(&self, op: &str) {
            if op == self.op {
                if let Some(hook) = self.hook.lock().unwrap().take() {
                    hook();
                }
            }
        }
    }

    impl FileSystem for InterleavedFs {
        fn read_to_string(&self, path: &Path) -> Result<String, Error> {
            self.inner.read_to_string(path)
        }
        fn read_prefix(&self, path: &Path, len: usize) -> Result<Vec<u8>, Error> {
            self.inner.read_prefix(path, len)
        }
        fn write(&self, path: &Path, contents: &str) -> Result<(), Error> {
            self.inner.write(path, contents)
        }
        fn create_new(&self, path: &Path, contents: &str) -> Result<bool, Error> {
            self.inner.create_new(path, contents)
        }
        fn rename(&self, from: &Path, to: &Path) -> Result<(), Error> {
            self.before("rename");
            self.inner.rename(from, to)
        }
        fn create_dir_all(&self, path: &Path) -> Result<(), Error> {
            self.inner.create_dir_all(path)
        }
        fn metadata(&self, path: &Path) -> Result<FileMetadata, Error> {
            self.inner.metadata(path)
        }
        fn remove_file(&self, path: &Path) -> Result<(), Error> {
            self.before("remove_file");
            self.inner.remove_file(path)
        }
        fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, Error> {
            self.inner.read_dir(path)
        }
        fn open_append(&self, path: &Path) -> Result<Box<dyn Write + Send>, Error> {
            self.inner.open_append(path)
        }
        fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>, Error> {
            self.inner.open_read(path)
        }
        fn create(&self, path: &Path) -> Result<Box<dyn Write + Send>, Error> {
            self.inner.create(path)
        }
    }

    /// 同じ stale claim を見た 2 プロセスのうち、B の `op` の直前に A の取得を丸ごと走らせる
    fn race_on_stale_claim(
        op: &'static str,
    ) -> (Option<ClaimGuard>, Option<ClaimGuard>, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let claim = dir.join(id('a').claim_file_name());
        std::fs::write(&claim, "999").unwrap();

        let first: Arc<Mutex<Option<ClaimGuard>>> = Arc::default();
        let hook = {
            let dir = dir.clone();
            let first = Arc::clone(&first);
            move || {
                let a = store(&dir, 100, &[100]);
                *first.lock().unwrap() = a.try_claim(&id('a')).unwrap();
            }
        };
        let b = ClaimStore::new(
            Arc::new(InterleavedFs::new(op, hook)),
            Arc::new(FixedClock::at_secs(NOW)),
            Arc::new(FakeProcessTable::new(200, &[100, 200])),
            TransferDir::new(&dir),
        );
        let second = b.try_claim(&id('a')).unwrap();
        let first = first.lock().unwrap().take();
        (first, second, tmp)
    }

    fn leftover_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_takeover_racing_a_fresh_claim_backs_off() {
        let (first, second, tmp) = race_on_stale_claim("rename");
        let dir = tmp.path();
        assert_eq!(first.as_ref().map(ClaimGuard::pid), Some(100));
        assert!(second.is_none());
        assert_eq!(
            std::fs::read_to_string(dir.join(id('a').claim_file_name())).unwrap(),
            "100"
        );
        assert_eq!(leftover_files(dir), vec![id('a').claim_file_name()]);

        drop(first);
        assert!(leftover_files(dir).is_empty());
    }

    #[test]
    fn test_claim_created_after_retirement_wins() {
        let (first, second, tmp) = race_on_stale_claim("remove_file");
        let dir = tmp.path();
        assert_eq!(first.as_ref().map(ClaimGuard::pid), Some(100));
        assert!(second.is_none());
        assert_eq!(leftover_files(dir), vec![id('a').claim_file_name()]);
    }

    #[test]
    fn test_release_keeps_foreign_claim() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path(), 100, &[100, 200]);
        let guard = s.try_claim(&id('a')).unwrap().unwrap();
        let path = dir.path().join(id('a').claim_file_name());
        std::fs::write(&path, "200").unwrap();

        drop(guard);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "200");
    }

    #[test]
    fn test_fresh_empty_claim_counts_as_held() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(id('a').claim_file_name()), "").unwrap();
        let written = std::fs::metadata(dir.path().join(id('a').claim_file_name()))
            .unwrap()
            .modified()
            .unwrap()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let at = |secs: u64| {
            ClaimStore::new(
                Arc::new(StdFileSystem),
                Arc::new(FixedClock::at_secs(secs)),
                Arc::new(FakeProcessTable::new(100, &[100])),
                TransferDir::new(dir.path()),
            )
        };
        assert!(at(written).is_claimed(&id('a')));
        assert!(!at(written + CLAIM_WRITE_GRACE_SECS).is_claimed(&id('a')));
    }

    #[test]
    fn test_next_candidate_order() {
        let dir = tempfile::tempdir().unwrap();
        for n in ['a', 'b', 'c'] {
            std::fs::write(dir.path().join(id(n).log_file_name()), "x").unwrap();
        }
        std::fs::write(dir.path().join(id('a').claim_file_name()), "200").unwrap();
        let s = store(dir.path(), 100, &[100, 200]);

        let none = BTreeSet::new();
        assert_eq!(s.next_candidate(Some(&id('c')), &none).unwrap(), Some(id('c')));
        assert_eq!(s.next_candidate(Some(&id('a')), &none).unwrap(), Some(id('b')));
        assert_eq!(s.next_candidate(None, &none).unwrap(), Some(id('b')));

        let ignore: BTreeSet<_> = [id('b')].into_iter().collect();
        assert_eq!(s.next_candidate(None, &ignore).unwrap(), Some(id('c')));

        let ignore: BTreeSet<_> = [id('b'), id('c')].into_iter().collect();
        assert_eq!(s.next_candidate(None, &ignore).unwrap(), None);
    }

    #[test]
    fn test_start_without_files_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path(), 100, &[100]);
        assert_eq!(s.next_candidate(Some(&id('a')), &BTreeSet::new()).unwrap(), None);
    }
}
