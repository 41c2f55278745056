//! Compression codec seam
//!
//! The container engine never compresses or decompresses inline; it calls
//! through this trait so the game-specific codec (which may live behind a
//! vendor DLL on some platforms) stays replaceable. Codec failure is never
//! fatal to a run: callers skip the affected operation and warn.

use crate::{Error, Result};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Byte-buffer compression interface consumed by the patching engine.
pub trait Codec: Send + Sync {
    /// Decompress `data`, expecting `decompressed_size` output bytes.
    fn decompress(&self, data: &[u8], decompressed_size: usize) -> Result<Vec<u8>>;

    /// Compress `data` at the given level (codec-defined scale).
    fn compress(&self, data: &[u8], level: u32) -> Result<Vec<u8>>;
}

/// Zlib-backed codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZlibCodec;

impl Codec for ZlibCodec {
    fn decompress(&self, data: &[u8], decompressed_size: usize) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Err(Error::codec("empty compressed data"));
        }

        log::debug!(
            "decompressing {} bytes, expecting {} bytes",
            data.len(),
            decompressed_size
        );

        let mut decoder = ZlibDecoder::new(data);
        let mut output = Vec::with_capacity(decompressed_size);
        decoder
            .read_to_end(&mut output)
            .map_err(|e| Error::codec(format!("zlib decompression failed: {e}")))?;

        if decompressed_size != 0 && output.len() != decompressed_size {
            return Err(Error::codec(format!(
                "decompressed to {} bytes, expected {}",
                output.len(),
                decompressed_size
            )));
        }

        Ok(output)
    }

    fn compress(&self, data: &[u8], level: u32) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.min(9)));
        encoder
            .write_all(data)
            .map_err(|e| Error::codec(format!("zlib compression failed: {e}")))?;
        encoder
            .finish()
            .map_err(|e| Error::codec(format!("zlib compression failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let codec = ZlibCodec;
        let original = b"the quick brown fox jumps over the lazy dog".repeat(16);

        let compressed = codec.compress(&original, 6).expect("compression failed");
        assert!(compressed.len() < original.len());

        let decompressed = codec
            .decompress(&compressed, original.len())
            .expect("decompression failed");
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_size_mismatch_is_error() {
        let codec = ZlibCodec;
        let compressed = codec.compress(b"hello", 6).unwrap();
        assert!(codec.decompress(&compressed, 3).is_err());
    }

    #[test]
    fn test_garbage_input_is_error() {
        let codec = ZlibCodec;
        assert!(codec.decompress(&[0xFF, 0xFE, 0xFD], 16).is_err());
        assert!(codec.decompress(&[], 0).is_err());
    }
}
