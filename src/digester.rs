//! Sequential block hashing.
//!
//! Blocks are read strictly in increasing order, never seeking backwards.
//! Each read batch is hashed with rayon, which changes nothing about the
//! order or content of the records produced.

use std::collections::VecDeque;
use std::io::Read;

use rayon::prelude::*;
use tracing::debug;

use crate::error::{OverlapError, Result};
use crate::types::{DigestRecord, ScanConfig};

/// Destination for records as they are produced, e.g. a hash dump
pub trait HashSink {
    fn record(&mut self, record: &DigestRecord) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sink that drops everything
#[derive(Debug, Default)]
pub struct NullSink;

impl HashSink for NullSink {
    fn record(&mut self, _record: &DigestRecord) -> Result<()> {
        Ok(())
    }
}

impl HashSink for Vec<DigestRecord> {
    fn record(&mut self, record: &DigestRecord) -> Result<()> {
        self.push(*record);
        Ok(())
    }
}

/// Lazy, finite sequence of per-block digests over a byte stream
pub struct BlockDigester<R> {
    reader: R,
    config: ScanConfig,
    next_index: u64,
    pending: VecDeque<DigestRecord>,
    failure: Option<OverlapError>,
    exhausted: bool,
}

impl<R: Read> BlockDigester<R> {
    pub fn new(reader: R, config: ScanConfig) -> Self {
        Self {
            reader,
            config,
            next_index: 0,
            pending: VecDeque::new(),
            failure: None,
            exhausted: false,
        }
    }

    /// Number the first block read as `index`, for a reader already
    /// positioned past earlier blocks
    pub fn starting_at(mut self, index: u64) -> Self {
        self.next_index = index;
        self
    }

    /// Index the next block read will get
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Drain every block, appending to `records` and feeding `sink`.
    ///
    /// On a read failure the records before it are already in `records`
    /// and in `sink`.
    pub fn collect_into(
        self,
        records: &mut Vec<DigestRecord>,
        sink: &mut dyn HashSink,
        mut on_record: impl FnMut(&DigestRecord),
    ) -> Result<u64> {
        let mut produced = 0u64;
        for record in self {
            let record = record?;
            sink.record(&record)?;
            on_record(&record);
            records.push(record);
            produced += 1;
        }
        sink.finish()?;
        Ok(produced)
    }

    fn fill_batch(&mut self) {
        let block_size = self.config.block_size;
        let mut blocks: Vec<Vec<u8>> = Vec::with_capacity(self.config.batch_blocks);

        while blocks.len() < self.config.batch_blocks {
            let mut buf = Vec::with_capacity(initial_capacity(block_size));
            match read_block(&mut self.reader, block_size, &mut buf) {
                Ok(0) => {
                    self.exhausted = true;
                    break;
                }
                Ok(filled) => {
                    blocks.push(buf);
                    if filled < block_size {
                        self.exhausted = true;
                        break;
                    }
                }
                Err(source) => {
                    let block = self.next_index + blocks.len() as u64;
                    let offset = block * block_size + buf.len() as u64;
                    self.failure = Some(OverlapError::Read { offset, source });
                    self.exhausted = true;
                    break;
                }
            }
        }

        let first = self.next_index;
        let records: Vec<DigestRecord> = blocks
            .par_iter()
            .enumerate()
            .map(|(i, data)| DigestRecord::from_bytes(first + i as u64, data))
            .collect();

        if !records.is_empty() {
            debug!(first, count = records.len(), "hashed batch");
        }
        self.next_index += records.len() as u64;
        self.pending.extend(records);
    }
}

impl<R: Read> Iterator for BlockDigester<R> {
    type Item = Result<DigestRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }
            if let Some(err) = self.failure.take() {
                return Some(Err(err));
            }
            if self.exhausted {
                return None;
            }
            self.fill_batch();
        }
    }
}

/// Buffers start at most this large and grow with the bytes actually read
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

fn initial_capacity(block_size: u64) -> usize {
    usize::try_from(block_size.min(MAX_PREALLOC)).unwrap_or(0)
}

/// Append up to `block_size` bytes from `reader` to `buf`, stopping early
/// only at end of stream. On failure `buf` holds the bytes read before it.
fn read_block<R: Read>(reader: &mut R, block_size: u64, buf: &mut Vec<u8>) -> std::io::Result<u64> {
    let filled = reader.by_ref().take(block_size).read_to_end(buf)?;
    Ok(filled as u64)
}
