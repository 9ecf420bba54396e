//! 標準ファイルシステム実装（std::fs を委譲）

use crate::error::Error;
use crate::ports::outbound::{FileMetadata, FileSystem};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// 標準ライブラリの fs をそのまま委譲する FileSystem 実装
#[derive(Debug, Clone, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, Error> {
        std::fs::read_to_string(path).map_err(|e| {
            Error::io_msg(format!("Failed to read '{}': {}", path.display(), e))
        })
    }

    fn read_prefix(&self, path: &Path, len: usize) -> Result<Vec<u8>, Error> {
        let f = std::fs::File::open(path).map_err(|e| {
            Error::io_msg(format!("Failed to open '{}' for reading: {}", path.display(), e))
        })?;
        let mut buf = Vec::with_capacity(len);
        f.take(len as u64).read_to_end(&mut buf).map_err(|e| {
            Error::io_msg(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Ok(buf)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), Error> {
        std::fs::write(path, contents).map_err(|e| {
            Error::io_msg(format!("Failed to write '{}': {}", path.display(), e))
        })
    }

    fn create_new(&self, path: &Path, contents: &str) -> Result<bool, Error> {
        let mut f = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => {
                return Err(Error::io_msg(format!(
                    "Failed to create '{}': {}",
                    path.display(),
                    e
                )))
            }
        };
        f.write_all(contents.as_bytes()).map_err(|e| {
            Error::io_msg(format!("Failed to write '{}': {}", path.display(), e))
        })?;
        Ok(true)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), Error> {
        std::fs::rename(from, to).map_err(|e| {
            Error::io_msg(format!(
                "Failed to rename '{}' to '{}': {}",
                from.display(),
                to.display(),
                e
            ))
        })
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), Error> {
        std::fs::create_dir_all(path).map_err(|e| {
            Error::io_msg(format!("Failed to create directory '{}': {}", path.display(), e))
        })
    }

    fn metadata(&self, path: &Path) -> Result<FileMetadata, Error> {
        let m = std::fs::metadata(path).map_err(|e| {
            Error::io_msg(format!(
                "Failed to get metadata for '{}': {}",
                path.display(),
                e
            ))
        })?;
        let modified_secs = m
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs());
        Ok(FileMetadata::new(m.len(), m.is_file(), m.is_dir(), modified_secs))
    }

    fn remove_file(&self, path: &Path) -> Result<(), Error> {
        std::fs::remove_file(path).map_err(|e| {
            Error::io_msg(format!("Failed to remove file '{}': {}", path.display(), e))
        })
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, Error> {
        let entries = std::fs::read_dir(path).map_err(|e| {
            Error::io_msg(format!(
                "Failed to read directory '{}': {}",
                path.display(),
                e
            ))
        })?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                Error::io_msg(format!("Failed to read directory entry: {}", e))
            })?;
            paths.push(entry.path());
        }
        Ok(paths)
    }

    fn open_append(&self, path: &Path) -> Result<Box<dyn Write + Send>, Error> {
        let f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                Error::io_msg(format!("Failed to open '{}' for append: {}", path.display(), e))
            })?;
        Ok(Box::new(f))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>, Error> {
        let f = std::fs::File::open(path).map_err(|e| {
            Error::io_msg(format!("Failed to open '{}' for reading: {}", path.display(), e))
        })?;
        Ok(Box::new(f))
    }

    fn create(&self, path: &Path) -> Result<Box<dyn Write + Send>, Error> {
        let f = std::fs::File::create(path).map_err(|e| {
            Error::io_msg(format!("Failed to create '{}': {}", path.display(), e))
        })?;
        Ok(Box::new(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_new_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claim.pid");
        let fs = StdFileSystem;

        assert!(fs.create_new(&path, "100").unwrap());
        assert!(!fs.create_new(&path, "200").unwrap());
        assert_eq!(fs.read_to_string(&path).unwrap(), "100");
    }

    #[test]
    fn test_read_prefix_short_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.log");
        std::fs::write(&path, "abc").unwrap();

        let fs = StdFileSystem;
        assert_eq!(fs.read_prefix(&path, 11).unwrap(), b"abc".to_vec());
        assert_eq!(fs.read_prefix(&path, 2).unwrap(), b"ab".to_vec());
    }

    #[test]
    fn test_metadata_reports_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "hello").unwrap();

        let m = StdFileSystem.metadata(&path).unwrap();
        assert_eq!(m.len(), 5);
        assert!(m.is_file());
        assert!(m.modified_secs().is_some());
    }
}
