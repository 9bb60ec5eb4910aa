//! Text hash dump so a scan can be analysed again, or resumed, without
//! re-reading the device.
//!
//! ```text
//! # find-overlap hash dump v1
//! block-size 1048576
//! 0 d41d8cd98f00b204e9800998ecf8427e 1048576
//! 1 ...
//! ```
//!
//! Every record line is flushed as soon as it is written, so the dump of an
//! interrupted scan loads up to the last completed block.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::digester::HashSink;
use crate::error::{OverlapError, Result};
use crate::types::{BlockDigest, DigestRecord};

const MAGIC: &str = "# find-overlap hash dump v1";
const BLOCK_SIZE_KEY: &str = "block-size";

/// Records loaded from a hash dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashDump {
    pub block_size: u64,
    pub records: Vec<DigestRecord>,
}

impl HashDump {
    /// A dump ending in a short block covers the whole source
    pub fn is_complete(&self) -> bool {
        self.records
            .last()
            .is_some_and(|last| last.len < self.block_size)
    }

    /// Fail if `requested` disagrees with the recorded block size
    pub fn reconcile_block_size(&self, requested: Option<u64>) -> Result<u64> {
        match requested {
            Some(requested) if requested != self.block_size => Err(OverlapError::BlockSizeMismatch {
                dump: self.block_size,
                requested,
            }),
            _ => Ok(self.block_size),
        }
    }
}

/// Streaming hash dump writer
pub struct HashDumpWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    written: u64,
}

impl HashDumpWriter {
    /// Start a new dump, truncating any existing file
    pub fn create(path: impl AsRef<Path>, block_size: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{MAGIC}")?;
        writeln!(writer, "{BLOCK_SIZE_KEY} {block_size}")?;
        writer.flush()?;
        info!(path = %path.display(), block_size, "writing hash dump");

        Ok(Self {
            writer,
            path,
            written: 0,
        })
    }

    /// Continue an existing dump that was recorded with `block_size`
    pub fn append(path: impl AsRef<Path>, block_size: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let existing = load_hash_dump(&path)?;
        existing.reconcile_block_size(Some(block_size))?;

        let file = OpenOptions::new().append(true).open(&path)?;
        info!(
            path = %path.display(),
            records = existing.records.len(),
            "appending to hash dump"
        );

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written by this writer
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl HashSink for HashDumpWriter {
    fn record(&mut self, record: &DigestRecord) -> Result<()> {
        writeln!(self.writer, "{} {} {}", record.index, record.digest, record.len)?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        debug!(path = %self.path.display(), written = self.written, "hash dump synced");
        Ok(())
    }
}

/// Write a complete dump in one go
pub fn save_hash_dump(path: impl AsRef<Path>, dump: &HashDump) -> Result<()> {
    let mut writer = HashDumpWriter::create(path, dump.block_size)?;
    for record in &dump.records {
        writer.record(record)?;
    }
    writer.finish()
}

/// Parse a dump, validating header, ordering and block lengths
pub fn load_hash_dump(path: impl AsRef<Path>) -> Result<HashDump> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            OverlapError::FileNotFound(path.display().to_string())
        } else {
            OverlapError::Io(e)
        }
    })?;
    let bad = |line: usize, reason: String| OverlapError::dump_format(path, line, reason);

    let mut lines = BufReader::new(file).lines();

    match lines.next().map(|line| read_line(path, 1, line)).transpose()? {
        Some(first) if first.trim_end() == MAGIC => {}
        Some(_) => return Err(bad(1, "missing hash dump header".to_string())),
        None => return Err(bad(1, "empty file".to_string())),
    }

    let block_size = match lines.next().map(|line| read_line(path, 2, line)).transpose()? {
        Some(line) => parse_block_size(&line).map_err(|reason| bad(2, reason))?,
        None => return Err(bad(2, "missing block size".to_string())),
    };

    let mut records: Vec<DigestRecord> = Vec::new();
    for (offset, line) in lines.enumerate() {
        let line_no = offset + 3;
        let line = read_line(path, line_no, line)?;
        if line.trim().is_empty() {
            continue;
        }
        if let Some(previous) = records.last() {
            if previous.len < block_size {
                return Err(bad(
                    line_no,
                    format!("short block {} is not the last record", previous.index),
                ));
            }
        }

        let record = parse_record(&line, block_size).map_err(|reason| bad(line_no, reason))?;
        let expected = records.len() as u64;
        if record.index != expected {
            return Err(bad(
                line_no,
                format!("expected block {expected}, found block {}", record.index),
            ));
        }
        records.push(record);
    }

    debug!(path = %path.display(), block_size, records = records.len(), "loaded hash dump");
    Ok(HashDump { block_size, records })
}

/// Text that is not UTF-8 is a malformed dump, not an I/O failure
fn read_line(path: &Path, line_no: usize, line: std::io::Result<String>) -> Result<String> {
    line.map_err(|e| match e.kind() {
        ErrorKind::InvalidData => OverlapError::dump_format(path, line_no, "not valid UTF-8 text"),
        _ => OverlapError::Io(e),
    })
}

fn parse_block_size(line: &str) -> std::result::Result<u64, String> {
    let mut fields = line.split_whitespace();
    match (fields.next(), fields.next(), fields.next()) {
        (Some(BLOCK_SIZE_KEY), Some(value), None) => match value.parse::<u64>() {
            Ok(0) => Err("block size must be greater than 0".to_string()),
            Ok(size) => Ok(size),
            Err(e) => Err(format!("invalid block size '{value}': {e}")),
        },
        _ => Err(format!("expected '{BLOCK_SIZE_KEY} <bytes>'")),
    }
}

fn parse_record(line: &str, block_size: u64) -> std::result::Result<DigestRecord, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [index, digest, len] = fields.as_slice() else {
        return Err(format!("expected '<index> <digest> <length>', found {} fields", fields.len()));
    };

    let index = index
        .parse::<u64>()
        .map_err(|e| format!("invalid block index '{index}': {e}"))?;
    let digest = digest
        .parse::<BlockDigest>()
        .map_err(|e| format!("invalid digest '{digest}': {e}"))?;
    let len = len
        .parse::<u64>()
        .map_err(|e| format!("invalid block length '{len}': {e}"))?;

    if len == 0 || len > block_size {
        return Err(format!("block length {len} outside 1..={block_size}"));
    }

    Ok(DigestRecord::new(index, digest, len))
}
