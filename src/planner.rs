use std::fmt;

use serde::{Deserialize, Serialize};

use crate::locator::OverlapRange;

/// One `dd` invocation, in blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopySpec {
    /// First source block (`skip=`)
    pub source_offset: u64,
    /// First destination block (`seek=`)
    pub dest_offset: u64,
    /// Blocks copied
    pub count: u64,
    /// Whether the copy runs to the end of the input, so `count=` is left out
    pub to_end: bool,
}

impl CopySpec {
    /// `dd` command line with INPUT/OUTPUT placeholders
    pub fn dd_command(&self, block_size: u64) -> String {
        let mut command = format!("dd if=INPUT bs={block_size}");
        if self.source_offset > 0 {
            command.push_str(&format!(" skip={}", self.source_offset));
        }
        if self.dest_offset > 0 {
            command.push_str(&format!(" seek={}", self.dest_offset));
        }
        if !self.to_end {
            command.push_str(&format!(" count={}", self.count));
        }
        command.push_str(" of=OUTPUT");
        command
    }
}

/// How to rebuild the pre-move layout from the damaged device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorationPlan {
    pub block_size: u64,
    pub total_blocks: u64,
    pub original_blocks: u64,
    /// Block where the copy switches from the head to the relocated tail
    pub split_block: u64,
    pub copies: [CopySpec; 2],
}

impl RestorationPlan {
    /// Plan the restore for `range` on a device of `total_blocks`.
    ///
    /// The head `[0, m)` stays where it is and the tail `[m + d, N)` moves
    /// back by `d`, which drops one copy of the duplicated data. Any `m`
    /// inside the matched run works since blocks there equal their copies
    /// `d` ahead; the middle of the run is used.
    pub fn new(range: &OverlapRange, total_blocks: u64, block_size: u64) -> Self {
        let split_block = range.start + range.length / 2;
        let tail_start = split_block + range.shift;

        let head = CopySpec {
            source_offset: 0,
            dest_offset: 0,
            count: split_block,
            to_end: false,
        };
        let tail = CopySpec {
            source_offset: tail_start,
            dest_offset: split_block,
            count: total_blocks.saturating_sub(tail_start),
            to_end: true,
        };

        Self {
            block_size,
            total_blocks,
            original_blocks: total_blocks.saturating_sub(range.shift),
            split_block,
            copies: [head, tail],
        }
    }

    /// Blocks written by both copies together
    pub fn restored_blocks(&self) -> u64 {
        self.copies.iter().map(|copy| copy.count).sum()
    }

    pub fn dd_commands(&self) -> [String; 2] {
        [
            self.copies[0].dd_command(self.block_size),
            self.copies[1].dd_command(self.block_size),
        ]
    }
}

impl fmt::Display for RestorationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Original file system size was {} blocks.", self.original_blocks)?;
        writeln!(f, "Restore original file system with:")?;
        for command in self.dd_commands() {
            writeln!(f, "    {command}")?;
        }
        Ok(())
    }
}
