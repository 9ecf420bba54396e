//! 署名済みポリシー付き multipart POST でアップロードする Uploader 実装
//!
//! フィールド順は AWSAccessKeyId, key, policy, signature, file（file は最後）。

use crate::ports::outbound::Uploader;
use common::config::UploadConfig;
use common::error::Error;
use reqwest::blocking::multipart::Form;
use std::path::Path;
use std::time::Duration;

pub struct HttpUploader {
    client: reqwest::blocking::Client,
    config: UploadConfig,
}

impl HttpUploader {
    /// 接続タイムアウトのみ設定する（転送中のタイムアウトは設けない）
    pub fn new(config: UploadConfig) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn form(&self, artifact: &Path) -> Result<Form, Error> {
        let file_name = artifact
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::invalid_argument(format!("Invalid artifact path '{}'", artifact.display()))
            })?;
        Form::new()
            .text("AWSAccessKeyId", self.config.access_key_id.clone())
            .text("key", self.config.object_key(file_name))
            .text("policy", self.config.policy.clone())
            .text("signature", self.config.signature.clone())
            .file("file", artifact)
            .map_err(|e| Error::io_msg(format!("Failed to read '{}': {}", artifact.display(), e)))
    }
}

impl Uploader for HttpUploader {
    fn upload(&self, artifact: &Path) -> Result<(), Error> {
        if self.config.url.is_empty() {
            return Err(Error::config("upload.url is not set"));
        }
        let response = self
            .client
            .post(&self.config.url)
            .multipart(self.form(artifact)?)
            .send()
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response
            .text()
            .unwrap_or_else(|e| format!("<failed to read response: {}>", e));
        Err(Error::http(format!("Upload failed: HTTP {}: {}", status, body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_url_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.log.gz");
        std::fs::write(&path, "gz").unwrap();
        let uploader = HttpUploader::new(UploadConfig::default()).unwrap();
        assert!(matches!(uploader.upload(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_unreadable_artifact_is_io_error() {
        let uploader = HttpUploader::new(UploadConfig::default()).unwrap();
        assert!(matches!(
            uploader.form(Path::new("/nonexistent/x.log.gz")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_connection_refused_is_http_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.log.gz");
        std::fs::write(&path, "gz").unwrap();
        let uploader = HttpUploader::new(UploadConfig {
            url: "http://127.0.0.1:9/upload".to_string(),
            connect_timeout_secs: 1,
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(uploader.upload(&path), Err(Error::Http(_))));
    }
}
