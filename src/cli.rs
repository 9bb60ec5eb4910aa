use clap::Parser;
use std::path::PathBuf;

use crate::types::{LocatorConfig, ScanConfig, DEFAULT_BATCH_BLOCKS, DEFAULT_BLOCK_SIZE};

/// Find the overlapping portion of a file system after an interrupted
/// partition resize/move
#[derive(Parser, Debug, Clone)]
#[command(name = "find-overlap")]
#[command(version)]
#[command(about = "Find the overlapping portion of a file system after an interrupted resize/move", long_about = None)]
pub struct Args {
    /// Device or file to scan
    #[arg(value_name = "DEVICE")]
    pub device: Option<PathBuf>,

    /// Write block hashes to this file as they are computed
    #[arg(long = "dump-hashes", value_name = "FILE")]
    pub dump_hashes: Option<PathBuf>,

    /// Read previously saved hashes instead of (or before resuming) the scan
    #[arg(long = "read-hashes", value_name = "FILE")]
    pub read_hashes: Option<PathBuf>,

    /// Block size in bytes [default: 1048576, or the one in --read-hashes]
    #[arg(short = 'b', long = "block-size", value_name = "BYTES")]
    pub block_size: Option<u64>,

    /// Ignore digests shared by more than this many blocks when proposing shifts
    #[arg(long = "max-duplicates", default_value = "4")]
    pub max_duplicates: usize,

    /// Shortest matching run reported as an overlap, in blocks
    #[arg(long = "min-run", default_value = "1")]
    pub min_run: u64,

    /// Blocks read before hashing them in parallel
    #[arg(long = "batch-blocks", default_value_t = DEFAULT_BATCH_BLOCKS)]
    pub batch_blocks: usize,

    /// Hashing threads (0 = auto)
    #[arg(long = "threads", default_value = "0")]
    pub threads: usize,

    /// Also write the result as JSON to this file
    #[arg(long = "json-report", value_name = "FILE")]
    pub json_report: Option<PathBuf>,

    /// Suppress the progress bar
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Validate the arguments
    pub fn validate(&self) -> Result<(), String> {
        if self.device.is_none() && self.read_hashes.is_none() {
            return Err("No input provided. Use --read-hashes or specify a device.".to_string());
        }

        if let Some(device) = &self.device {
            if device.as_os_str().is_empty() {
                return Err("Device path cannot be empty".to_string());
            }
        }

        if self.block_size == Some(0) {
            return Err("block-size must be greater than 0".to_string());
        }

        if self.max_duplicates < 2 {
            return Err("max-duplicates must be at least 2".to_string());
        }

        if self.min_run == 0 {
            return Err("min-run must be greater than 0".to_string());
        }

        if self.batch_blocks == 0 {
            return Err("batch-blocks must be greater than 0".to_string());
        }

        if self.dump_hashes.is_some() && self.device.is_none() {
            return Err("--dump-hashes needs a device to read".to_string());
        }

        Ok(())
    }

    /// Block size for a live scan without a hash dump
    pub fn block_size_or_default(&self) -> u64 {
        self.block_size.unwrap_or(DEFAULT_BLOCK_SIZE)
    }

    pub fn scan_config(&self, block_size: u64) -> ScanConfig {
        ScanConfig::new(block_size, self.batch_blocks, self.threads)
    }

    pub fn locator_config(&self) -> LocatorConfig {
        LocatorConfig {
            max_duplicates: self.max_duplicates,
            min_run_blocks: self.min_run,
        }
    }

    /// Default log filter for the -v count
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    /// Whether hashing continues into the same file the hashes came from
    pub fn dump_appends_to_read_hashes(&self) -> bool {
        match (&self.dump_hashes, &self.read_hashes) {
            (Some(dump), Some(read)) => dump == read,
            _ => false,
        }
    }
}
