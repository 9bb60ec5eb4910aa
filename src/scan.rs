//! Produces the complete digest sequence for a run: from a hash dump, a live
//! scan of the device, or a dump followed by a resumed scan.

use tracing::{info, warn};

use crate::cli::Args;
use crate::digester::{BlockDigester, HashSink, NullSink};
use crate::disk::BlockSource;
use crate::error::{OverlapError, Result};
use crate::hashdump::{load_hash_dump, HashDumpWriter};
use crate::progress::ScanProgress;
use crate::types::DigestRecord;

/// Digest sequence of one source, indices `0..records.len()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digests {
    pub block_size: u64,
    pub records: Vec<DigestRecord>,
}

impl Digests {
    pub fn total_blocks(&self) -> u64 {
        self.records.len() as u64
    }
}

/// Load, scan or resume according to `args`
pub fn gather_digests(args: &Args) -> Result<Digests> {
    let loaded = args.read_hashes.as_ref().map(load_hash_dump).transpose()?;

    let (block_size, complete, mut records) = match loaded {
        Some(dump) => {
            let block_size = dump.reconcile_block_size(args.block_size)?;
            info!(records = dump.records.len(), block_size, "loaded hashes");
            (block_size, dump.is_complete(), dump.records)
        }
        None => (args.block_size_or_default(), false, Vec::new()),
    };

    let Some(device) = &args.device else {
        return Ok(Digests { block_size, records });
    };

    let mut source = BlockSource::open(device)?;
    let total = source.block_count(block_size);
    let resume_at = records.len() as u64;

    match total {
        Some(total) if resume_at > total || (complete && resume_at != total) => {
            return Err(OverlapError::InvalidArgument(format!(
                "hash dump holds {resume_at} blocks but {} has {total}",
                device.display()
            )));
        }
        Some(0) => warn!(device = %device.display(), "source is empty"),
        Some(_) => {}
        None if resume_at > 0 => {
            return Err(OverlapError::InvalidArgument(format!(
                "cannot resume after block {resume_at}: {} is a stream that cannot seek",
                device.display()
            )));
        }
        None => info!(device = %device.display(), "source size unknown, reading until end of stream"),
    }
    if let Some(size) = source.size() {
        if size > 0 && block_size > size {
            return Err(OverlapError::InvalidArgument(format!(
                "block size {block_size} is larger than {} ({size} bytes)",
                device.display()
            )));
        }
    }

    configure_threads(args.threads);
    let mut sink = open_sink(args, block_size, &records)?;

    source.seek_to_block(resume_at, block_size)?;
    if resume_at > 0 {
        info!(block = resume_at, "resuming scan");
    }
    info!(
        device = %device.display(),
        bytes = ?source.size(),
        blocks = ?total,
        block_size,
        "scanning"
    );

    let progress = ScanProgress::new(total, resume_at, args.quiet);
    let digester = BlockDigester::new(source, args.scan_config(block_size)).starting_at(resume_at);
    let result = digester.collect_into(&mut records, sink.as_mut(), |_| progress.block_done());
    progress.finish();
    result?;

    if total.is_none() && records.is_empty() {
        warn!(device = %device.display(), "source is empty");
    }

    Ok(Digests { block_size, records })
}

/// Where live records go: nowhere, a fresh dump, or the dump being resumed
fn open_sink(args: &Args, block_size: u64, loaded: &[DigestRecord]) -> Result<Box<dyn HashSink>> {
    let Some(path) = &args.dump_hashes else {
        return Ok(Box::new(NullSink));
    };

    if args.dump_appends_to_read_hashes() {
        return Ok(Box::new(HashDumpWriter::append(path, block_size)?));
    }

    let mut writer = HashDumpWriter::create(path, block_size)?;
    for record in loaded {
        writer.record(record)?;
    }
    Ok(Box::new(writer))
}

fn configure_threads(num_threads: usize) {
    if num_threads > 0 {
        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global();
    }
}
