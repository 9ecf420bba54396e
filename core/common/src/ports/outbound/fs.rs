//! ファイルシステム Outbound ポート
//!
//! usecase はこの trait 経由でのみファイル I/O を行う。

use crate::error::Error;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// ファイルメタデータ（サイズ・種別・更新時刻）
#[derive(Debug, Clone)]
pub struct FileMetadata {
    len: u64,
    is_file: bool,
    is_dir: bool,
    /// 更新時刻（Unix 秒）。取得できない FS では None
    modified_secs: Option<u64>,
}

impl FileMetadata {
    pub fn new(len: u64, is_file: bool, is_dir: bool, modified_secs: Option<u64>) -> Self {
        Self {
            len,
            is_file,
            is_dir,
            modified_secs,
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_file(&self) -> bool {
        self.is_file
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn modified_secs(&self) -> Option<u64> {
        self.modified_secs
    }
}

/// ファイルシステム抽象（Outbound ポート）
///
/// 実装は `common::adapter::StdFileSystem` やテスト用のモックなど。
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String, Error>;
    /// 先頭から最大 `len` バイトを読む（ファイルが短ければその分だけ）
    fn read_prefix(&self, path: &Path, len: usize) -> Result<Vec<u8>, Error>;
    fn write(&self, path: &Path, contents: &str) -> Result<(), Error>;
    /// 存在しない場合に限り作成して書き込む。既に存在すれば Ok(false)
    fn create_new(&self, path: &Path, contents: &str) -> Result<bool, Error>;
    fn rename(&self, from: &Path, to: &Path) -> Result<(), Error>;
    fn create_dir_all(&self, path: &Path) -> Result<(), Error>;
    fn metadata(&self, path: &Path) -> Result<FileMetadata, Error>;
    fn remove_file(&self, path: &Path) -> Result<(), Error>;
    /// ディレクトリ直下のエントリのフルパス一覧
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, Error>;
    /// 追記用に開く（存在しなければ作成）。返した Writer を drop すると閉じる。
    fn open_append(&self, path: &Path) -> Result<Box<dyn Write + Send>, Error>;
    /// 読み込み用に開く
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>, Error>;
    /// 新規作成（既存なら空にする）して書き込み用に開く
    fn create(&self, path: &Path) -> Result<Box<dyn Write + Send>, Error>;

    /// パスが存在するか（metadata が取れれば true）
    fn exists(&self, path: &Path) -> bool {
        self.metadata(path).is_ok()
    }

    /// 通常ファイルとして存在するか
    fn is_file(&self, path: &Path) -> bool {
        self.metadata(path).map(|m| m.is_file()).unwrap_or(false)
    }

    /// ディレクトリとして存在するか
    fn is_dir(&self, path: &Path) -> bool {
        self.metadata(path).map(|m| m.is_dir()).unwrap_or(false)
    }
}
