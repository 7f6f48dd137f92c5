//! Block-level observations handed over by the address translation table.

use crate::addr::PhysTag;

/// State of a block in the address translation table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockState {
    /// Mapped, not written this epoch
    Clean,
    /// Unmapped
    Free,
    /// Written, remapped block by block
    DirtyDirect,
    /// Written, checkpointed in place
    DirtyStatic,
}

impl BlockState {
    /// Does this block contribute to NVM statistics?
    #[inline(always)]
    pub fn is_dirty(self) -> bool {
        matches!(self, Self::DirtyDirect | Self::DirtyStatic)
    }
}

/// One block's activity during the current epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockObservation {
    /// Physical tag (address >> block_bits)
    pub phy_tag: PhysTag,
    /// Table state
    pub state: BlockState,
    /// Reads this epoch
    pub epoch_reads: u64,
    /// Writes this epoch
    pub epoch_writes: u64,
}

impl BlockObservation {
    /// Observation with no activity
    pub const fn new(phy_tag: PhysTag, state: BlockState) -> Self {
        Self {
            phy_tag,
            state,
            epoch_reads: 0,
            epoch_writes: 0,
        }
    }

    /// Dirty (direct) block with the given activity
    pub const fn dirty(phy_tag: PhysTag, epoch_reads: u64, epoch_writes: u64) -> Self {
        Self {
            phy_tag,
            state: BlockState::DirtyDirect,
            epoch_reads,
            epoch_writes,
        }
    }

    /// Set reads
    pub const fn with_reads(mut self, reads: u64) -> Self {
        self.epoch_reads = reads;
        self
    }

    /// Set writes
    pub const fn with_writes(mut self, writes: u64) -> Self {
        self.epoch_writes = writes;
        self
    }
}
