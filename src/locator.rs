//! Overlap detection.
//!
//! An interrupted move leaves the device with a range of blocks `[a, a+L)`
//! whose content reappears, block for block, at `[a+d, a+d+L)`. Every pair of
//! blocks with equal content proposes a shift `d`; each proposal is grown
//! into the maximal run of consecutive blocks that agree under that shift,
//! and the longest run is the overlap. Equal digests only count as equal
//! content when the block lengths match too, so a short final block never
//! pairs with a full one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::index::DigestIndex;
use crate::types::{DigestRecord, LocatorConfig};

/// Range `[a, b)` overlapping `[b, c)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OverlapRange {
    /// First block of the run (`a`)
    pub start: u64,
    /// Distance between a block and its duplicate (`d`)
    pub shift: u64,
    /// Consecutive blocks agreeing under `shift` (`L`)
    pub length: u64,
}

impl OverlapRange {
    pub fn new(start: u64, shift: u64, length: u64) -> Self {
        Self { start, shift, length }
    }

    pub fn a(&self) -> u64 {
        self.start
    }

    pub fn b(&self) -> u64 {
        self.start + self.shift
    }

    pub fn c(&self) -> u64 {
        self.b() + self.length
    }

    /// Whether the matched run spans the whole shift, as an interrupted
    /// move produces
    pub fn is_full(&self) -> bool {
        self.length + 1 >= self.shift
    }
}

/// Result of an overlap search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlapOutcome {
    Found(OverlapRange),
    /// Several distinct runs share the maximal length; none is chosen
    Ambiguous(Vec<OverlapRange>),
    NotFound,
}

impl OverlapOutcome {
    /// Every reported range, in ascending order
    pub fn candidates(&self) -> &[OverlapRange] {
        match self {
            Self::Found(range) => std::slice::from_ref(range),
            Self::Ambiguous(ranges) => ranges,
            Self::NotFound => &[],
        }
    }
}

/// Searches a complete digest sequence for the overlap
pub struct OverlapLocator<'a> {
    records: &'a [DigestRecord],
    config: LocatorConfig,
}

impl<'a> OverlapLocator<'a> {
    /// `records[i].index` must equal `i`
    pub fn new(records: &'a [DigestRecord], config: LocatorConfig) -> Self {
        debug_assert!(records
            .iter()
            .enumerate()
            .all(|(i, record)| record.index == i as u64));
        Self { records, config }
    }

    pub fn locate(&self, index: &DigestIndex) -> OverlapOutcome {
        let seeds = self.shift_seeds(index);
        debug!(shifts = seeds.len(), "collected shift candidates");

        let runs = self.collect_runs(&seeds);
        let Some(longest) = runs.iter().map(|run| run.length).max() else {
            info!("no overlap found");
            return OverlapOutcome::NotFound;
        };

        let mut best: Vec<OverlapRange> = runs.into_iter().filter(|run| run.length == longest).collect();
        best.sort();

        if best.len() == 1 {
            let range = best[0];
            info!(a = range.a(), b = range.b(), c = range.c(), "overlap found");
            if !range.is_full() {
                warn!(
                    length = range.length,
                    shift = range.shift,
                    "matched run is shorter than its shift"
                );
            }
            OverlapOutcome::Found(range)
        } else {
            warn!(candidates = best.len(), length = longest, "ambiguous overlap");
            OverlapOutcome::Ambiguous(best)
        }
    }

    /// Shift -> ascending blocks whose content reappears that far ahead
    fn shift_seeds(&self, index: &DigestIndex) -> BTreeMap<u64, Vec<u64>> {
        let mut seeds: BTreeMap<u64, Vec<u64>> = BTreeMap::new();

        for (_, blocks) in index.duplicates() {
            if blocks.len() > self.config.max_duplicates {
                continue;
            }
            for (pos, &first) in blocks.iter().enumerate() {
                for &second in &blocks[pos + 1..] {
                    if self.record(first).same_content(self.record(second)) {
                        seeds.entry(second - first).or_default().push(first);
                    }
                }
            }
        }

        for starts in seeds.values_mut() {
            starts.sort_unstable();
        }
        seeds
    }

    fn collect_runs(&self, seeds: &BTreeMap<u64, Vec<u64>>) -> Vec<OverlapRange> {
        let mut runs = Vec::new();

        for (&shift, starts) in seeds {
            let mut covered_until = 0u64;
            for &seed in starts {
                if seed < covered_until {
                    continue;
                }
                let run = self.grow_run(seed, shift);
                covered_until = run.start + run.length;
                if run.length >= self.config.min_run_blocks {
                    runs.push(run);
                }
            }
        }

        runs
    }

    /// Maximal run of blocks around `seed` that equal their block `shift` ahead
    fn grow_run(&self, seed: u64, shift: u64) -> OverlapRange {
        let total = self.records.len() as u64;

        let mut start = seed;
        while start > 0 && self.agrees(start - 1, shift) {
            start -= 1;
        }

        let mut end = seed + 1;
        while end + shift < total && self.agrees(end, shift) {
            end += 1;
        }

        OverlapRange::new(start, shift, end - start)
    }

    fn agrees(&self, block: u64, shift: u64) -> bool {
        self.record(block).same_content(self.record(block + shift))
    }

    fn record(&self, block: u64) -> &DigestRecord {
        &self.records[block as usize]
    }
}

/// Index `records` and search them with `config`
pub fn locate_overlap(records: &[DigestRecord], config: &LocatorConfig) -> OverlapOutcome {
    let index = DigestIndex::build(records);
    OverlapLocator::new(records, config.clone()).locate(&index)
}
