use std::io::{Read, Write};

use bytes::Bytes;
use kdio_error::{KdioResult, kdio_bail, kdio_err};
use serde::{Deserialize, Serialize};

const DEFAULT_BZIP2_BLOCK_SIZE: u32 = 9;

/// The compression applied to the element bytes of every block in a dataset.
///
/// Serialized as an object tagged by `type`, e.g. `{"type":"raw"}` or
/// `{"type":"bzip2","blockSize":9}`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Compression {
    /// Element bytes are stored as-is.
    #[default]
    Raw,
    /// bzip2 with the given block size (1..=9, in units of 100k).
    Bzip2 {
        #[serde(rename = "blockSize", default = "default_bzip2_block_size")]
        block_size: u32,
    },
}

fn default_bzip2_block_size() -> u32 {
    DEFAULT_BZIP2_BLOCK_SIZE
}

impl Compression {
    /// bzip2 with the largest block size.
    pub const fn bzip2() -> Self {
        Self::Bzip2 {
            block_size: DEFAULT_BZIP2_BLOCK_SIZE,
        }
    }

    pub fn encode(&self, data: &[u8]) -> KdioResult<Bytes> {
        match self {
            Self::Raw => Ok(Bytes::copy_from_slice(data)),
            Self::Bzip2 { block_size } => {
                if !(1..=9).contains(block_size) {
                    kdio_bail!("bzip2 block size must be within 1..=9, got {}", block_size);
                }
                let mut encoder = bzip2::write::BzEncoder::new(
                    Vec::with_capacity(data.len() / 2),
                    bzip2::Compression::new(*block_size),
                );
                encoder.write_all(data)?;
                Ok(Bytes::from(encoder.finish()?))
            }
        }
    }

    /// Decompress `data`, which should expand to exactly `expected_len` bytes.
    ///
    /// Decompression stops one byte past `expected_len`, so an oversized payload shows up as a
    /// length mismatch rather than being inflated in full.
    pub fn decode(&self, data: Bytes, expected_len: usize) -> KdioResult<Bytes> {
        match self {
            Self::Raw => Ok(data),
            Self::Bzip2 { .. } => {
                let limit = u64::try_from(expected_len)
                    .unwrap_or(u64::MAX)
                    .saturating_add(1);
                let mut decoded = Vec::new();
                bzip2::read::BzDecoder::new(data.as_ref())
                    .take(limit)
                    .read_to_end(&mut decoded)
                    .map_err(|e| kdio_err!(StoreRead: "bzip2 block is not decodable: {}", e))?;
                Ok(Bytes::from(decoded))
            }
        }
    }
}
