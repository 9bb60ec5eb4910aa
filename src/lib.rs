//! Locate the overlap left behind by an interrupted partition resize/move.
//!
//! A device is read once, block by block. Each block is reduced to an MD5
//! digest, equal digests are indexed, and the longest run of blocks that
//! reappears a fixed distance further on is reported together with the two
//! `dd` commands that rebuild the original layout. Nothing is ever written
//! to the device.

pub mod cli;
pub mod digester;
pub mod disk;
pub mod error;
pub mod hashdump;
pub mod index;
pub mod locator;
pub mod planner;
pub mod progress;
pub mod report;
pub mod scan;
pub mod types;

// Re-export commonly used types
pub use digester::{BlockDigester, HashSink, NullSink};
pub use disk::BlockSource;
pub use error::{OverlapError, Result};
pub use hashdump::{load_hash_dump, save_hash_dump, HashDump, HashDumpWriter};
pub use index::DigestIndex;
pub use locator::{locate_overlap, OverlapLocator, OverlapOutcome, OverlapRange};
pub use planner::{CopySpec, RestorationPlan};
pub use scan::{gather_digests, Digests};
pub use types::{BlockDigest, DigestRecord, LocatorConfig, ScanConfig, DEFAULT_BLOCK_SIZE};
