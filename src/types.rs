use std::fmt;
use std::str::FromStr;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Default block size: 1 MiB
pub const DEFAULT_BLOCK_SIZE: u64 = 1024 * 1024;

/// Blocks read ahead of hashing in one batch
pub const DEFAULT_BATCH_BLOCKS: usize = 16;

/// 128-bit MD5 fingerprint of one block's bytes
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockDigest(pub [u8; 16]);

impl BlockDigest {
    pub fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Digest exactly `data`, no padding
    pub fn of(data: &[u8]) -> Self {
        Self(Md5::digest(data).into())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for BlockDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for BlockDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockDigest({})", self.to_hex())
    }
}

impl FromStr for BlockDigest {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

/// One block's position, digest and actual byte length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestRecord {
    pub index: u64,
    pub digest: BlockDigest,
    /// Bytes hashed; less than the block size only for a short final block
    pub len: u64,
}

impl DigestRecord {
    pub fn new(index: u64, digest: BlockDigest, len: u64) -> Self {
        Self { index, digest, len }
    }

    pub fn from_bytes(index: u64, data: &[u8]) -> Self {
        Self::new(index, BlockDigest::of(data), data.len() as u64)
    }

    /// Content equality: same digest over the same number of bytes
    pub fn same_content(&self, other: &Self) -> bool {
        self.len == other.len && self.digest == other.digest
    }
}

/// Live hashing configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Block size in bytes
    pub block_size: u64,

    /// Blocks read sequentially before hashing them together
    pub batch_blocks: usize,

    /// Number of hashing threads (0 = auto)
    pub num_threads: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            batch_blocks: DEFAULT_BATCH_BLOCKS,
            num_threads: 0,
        }
    }
}

impl ScanConfig {
    pub fn new(block_size: u64, batch_blocks: usize, num_threads: usize) -> Self {
        Self {
            block_size: block_size.max(1),
            batch_blocks: batch_blocks.max(1),
            num_threads,
        }
    }
}

/// Overlap search tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Digests shared by more blocks than this do not seed shift candidates
    pub max_duplicates: usize,

    /// Shortest run reported as an overlap
    pub min_run_blocks: u64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            max_duplicates: 4,
            min_run_blocks: 1,
        }
    }
}
