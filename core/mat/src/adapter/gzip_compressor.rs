//! gzip で圧縮する Compressor 実装（`gzip -c` と同じ形式）

use crate::ports::outbound::Compressor;
use common::error::Error;
use common::ports::outbound::FileSystem;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub struct GzipCompressor {
    fs: Arc<dyn FileSystem>,
}

impl GzipCompressor {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Compressor for GzipCompressor {
    fn compress(&self, src: &Path, dst: &Path) -> Result<(), Error> {
        let mut reader = self.fs.open_read(src)?;
        let mut encoder = GzEncoder::new(self.fs.create(dst)?, Compression::default());
        let io_err = |e: std::io::Error| {
            Error::io_msg(format!(
                "Failed to compress '{}' to '{}': {}",
                src.display(),
                dst.display(),
                e
            ))
        };
        std::io::copy(&mut reader, &mut encoder).map_err(io_err)?;
        let mut out = encoder.finish().map_err(io_err)?;
        out.flush().map_err(io_err)?;
        Ok(())
    }
}
