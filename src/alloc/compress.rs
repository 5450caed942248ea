//! Compression backend for the compressed tier, built on the `zstd` crate
//! rather than a hand-rolled codec.

use zstd::bulk::{Compressor, Decompressor};

use crate::error::{MapError, Result};

pub(crate) struct Codec {
    compressor: Compressor<'static>,
    decompressor: Decompressor<'static>,
}

impl Codec {
    pub fn new(level: i32) -> Result<Self> {
        let compressor = Compressor::new(level).map_err(|e| MapError::Codec(e.to_string()))?;
        let decompressor = Decompressor::new().map_err(|e| MapError::Codec(e.to_string()))?;
        Ok(Self { compressor, decompressor })
    }

    /// Worst-case compressed size for a payload of `payload_len` bytes.
    pub fn compress_bound(payload_len: usize) -> usize {
        zstd::zstd_safe::compress_bound(payload_len)
    }

    /// Compresses `src` into `dst`, returning the number of bytes written.
    pub fn compress_into(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        self.compressor
            .compress_to_buffer(src, dst)
            .map_err(|e| MapError::Codec(e.to_string()))
    }

    /// Decompresses `src` into `dst`, returning the number of bytes written.
    pub fn decompress_into(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        self.decompressor
            .decompress_to_buffer(src, dst)
            .map_err(|e| MapError::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let mut codec = Codec::new(3).unwrap();
        let payload: Vec<u8> = (0..256u32).map(|b| b as u8).collect();
        let bound = Codec::compress_bound(payload.len());
        let mut compressed = vec![0u8; bound];
        let n = codec.compress_into(&payload, &mut compressed).unwrap();
        compressed.truncate(n);

        let mut restored = vec![0u8; payload.len()];
        let m = codec.decompress_into(&compressed, &mut restored).unwrap();
        assert_eq!(m, payload.len());
        assert_eq!(restored, payload);
    }
}
