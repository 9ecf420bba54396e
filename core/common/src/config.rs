//! km 設定（JSON ファイル）
//!
//! 読み込み順: `--config` 引数 → 環境変数 `KM_CONFIG` → 既定値。
//! ファイル内の相対パスは設定ファイルのあるディレクトリ基準で解決する。

use crate::error::Error;
use crate::ports::outbound::FileSystem;
use crate::segment::TransferDir;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 設定ファイルのパスを渡す環境変数（ランチャー → デーモンにも引き継ぐ）
pub const CONFIG_ENV: &str = "KM_CONFIG";
/// 転送デーモンの実行ファイル名（起動側とデーモン数の数え上げで共有する）
pub const DAEMON_BIN: &str = "km-mat";
/// デーモンに処理対象セグメントを渡す環境変数
pub const SEGMENT_ID_ENV: &str = "KM_SEGMENT_ID";

/// アップロード先（署名済みポリシーで POST する）
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub url: String,
    pub access_key_id: String,
    /// アカウント ID。アップロード先キー `<path_prefix><api_key>/<basename>` に使う
    pub api_key: String,
    pub path_prefix: String,
    pub policy: String,
    pub signature: String,
    pub connect_timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            access_key_id: String::new(),
            api_key: String::new(),
            path_prefix: String::new(),
            policy: String::new(),
            signature: String::new(),
            connect_timeout_secs: 10,
        }
    }
}

impl UploadConfig {
    /// アップロード先のオブジェクトキー
    pub fn object_key(&self, file_name: &str) -> String {
        format!("{}{}/{}", self.path_prefix, self.api_key, file_name)
    }
}

/// km 全体の設定
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KmConfig {
    /// true なら記録もフラッシュもしない
    pub disabled: bool,
    pub log_dir: PathBuf,
    pub active_log: Option<PathBuf>,
    pub transfer_dir: Option<PathBuf>,
    pub error_log: Option<PathBuf>,
    pub error_log_enabled: bool,
    /// 通常のエラーログ書き込みの最小間隔（秒）。None なら間引かない
    pub error_log_min_interval_secs: Option<u64>,
    pub rotate_period_secs: u64,
    pub rotate_size_bytes: u64,
    /// ロボットと判定したリクエストも記録する
    pub track_robots: bool,
    pub max_daemons: usize,
    pub spawn_stagger_ms: u64,
    /// 転送デーモンの実行ファイル。None なら km と同じディレクトリの km-mat
    pub daemon_program: Option<PathBuf>,
    pub upload: UploadConfig,
}

impl Default for KmConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            log_dir: PathBuf::from("log"),
            active_log: None,
            transfer_dir: None,
            error_log: None,
            error_log_enabled: true,
            error_log_min_interval_secs: Some(60),
            rotate_period_secs: 30,
            rotate_size_bytes: 1_000_000,
            track_robots: false,
            max_daemons: 10,
            spawn_stagger_ms: 500,
            daemon_program: None,
            upload: UploadConfig::default(),
        }
    }
}

impl KmConfig {
    /// JSON 文字列から読み込む（相対パスはそのまま）
    pub fn from_json(s: &str) -> Result<Self, Error> {
        let config: KmConfig = serde_json::from_str(s)
            .map_err(|e| Error::config(format!("Invalid km config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 設定ファイルを読み込み、相対パスをファイルのディレクトリ基準に直す
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self, Error> {
        let content = fs.read_to_string(path)?;
        let mut config = Self::from_json(&content)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// `--config` 指定 → `KM_CONFIG` → 既定値 の順で解決して読み込む。
    /// 読み込んだファイルのパスも返す（デーモンへ引き継ぐため）
    pub fn resolve(
        fs: &dyn FileSystem,
        explicit: Option<&Path>,
    ) -> Result<(Self, Option<PathBuf>), Error> {
        let path = explicit.map(Path::to_path_buf).or_else(|| {
            std::env::var(CONFIG_ENV)
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
        });
        match path {
            Some(p) => Ok((Self::load(fs, &p)?, Some(p))),
            None => Ok((Self::default(), None)),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.rotate_period_secs == 0 {
            return Err(Error::config("rotate_period_secs must be greater than 0"));
        }
        if self.max_daemons == 0 {
            return Err(Error::config("max_daemons must be greater than 0"));
        }
        if self.upload.connect_timeout_secs == 0 {
            return Err(Error::config("upload.connect_timeout_secs must be greater than 0"));
        }
        Ok(())
    }

    fn rebase(&mut self, base: &Path) {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        fix(&mut self.log_dir);
        for p in [
            &mut self.active_log,
            &mut self.transfer_dir,
            &mut self.error_log,
            &mut self.daemon_program,
        ]
        .into_iter()
        .flatten()
        {
            fix(p);
        }
    }

    pub fn active_log_path(&self) -> PathBuf {
        self.active_log
            .clone()
            .unwrap_or_else(|| self.log_dir.join("km.current.log"))
    }

    pub fn transfer_dir(&self) -> TransferDir {
        TransferDir::new(
            self.transfer_dir
                .clone()
                .unwrap_or_else(|| self.log_dir.join("transfer")),
        )
    }

    /// エラーログのパス。無効化されていれば None
    pub fn error_log_path(&self) -> Option<PathBuf> {
        if !self.error_log_enabled {
            return None;
        }
        Some(
            self.error_log
                .clone()
                .unwrap_or_else(|| self.log_dir.join("km.error.log")),
        )
    }

    /// 最終アップロード時刻を書くファイル
    pub fn watermark_path(&self) -> PathBuf {
        self.log_dir.join("last_upload")
    }
}
