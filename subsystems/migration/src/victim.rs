//! # Victim Selection
//!
//! Candidate records for both tiers and the heap that ranks them. Each record
//! type carries an explicit total order where "greater" means "extract
//! first", so a max-heap pops victims in order.
//!
//! A heap is built once per epoch and then only drained:
//!
//! ```text
//!   Unbuilt --build--> Built --pop last--> Drained
//!      ^                                      |
//!      +---------------- reset ---------------+
//! ```

use alloc::collections::BinaryHeap;
use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::addr::PageAddr;
use crate::dram::DramState;

// =============================================================================
// NVM CANDIDATE
// =============================================================================

/// NVM page candidate for promotion to DRAM
#[derive(Debug, Clone, Copy)]
pub struct NvmPageStats {
    /// Page address
    pub addr: PageAddr,
    /// Dirty blocks / blocks per page
    pub dirty_ratio: f64,
    /// Writes / blocks per page
    pub write_ratio: f64,
}

impl NvmPageStats {
    /// Extraction order: more dirty blocks, then more writes, then lower
    /// address. `Greater` is extracted first.
    pub fn victim_cmp(&self, other: &Self) -> Ordering {
        self.dirty_ratio
            .total_cmp(&other.dirty_ratio)
            .then_with(|| self.write_ratio.total_cmp(&other.write_ratio))
            .then_with(|| other.addr.cmp(&self.addr))
    }
}

impl PartialEq for NvmPageStats {
    fn eq(&self, other: &Self) -> bool {
        self.victim_cmp(other) == Ordering::Equal
    }
}

impl Eq for NvmPageStats {}

impl PartialOrd for NvmPageStats {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NvmPageStats {
    fn cmp(&self, other: &Self) -> Ordering {
        self.victim_cmp(other)
    }
}

// =============================================================================
// DRAM CANDIDATE
// =============================================================================

/// DRAM page candidate for demotion to NVM
#[derive(Debug, Clone, Copy)]
pub struct DramPageStats {
    /// Page address
    pub addr: PageAddr,
    /// State when the heap was built
    pub state: DramState,
    /// Writes / blocks per page
    pub write_ratio: f64,
}

impl DramPageStats {
    /// Extraction order: fewer writes, then clean before dirty, then lower
    /// address. `Greater` is extracted first.
    pub fn victim_cmp(&self, other: &Self) -> Ordering {
        other
            .write_ratio
            .total_cmp(&self.write_ratio)
            .then_with(|| other.state.is_dirty().cmp(&self.state.is_dirty()))
            .then_with(|| other.addr.cmp(&self.addr))
    }
}

impl PartialEq for DramPageStats {
    fn eq(&self, other: &Self) -> bool {
        self.victim_cmp(other) == Ordering::Equal
    }
}

impl Eq for DramPageStats {}

impl PartialOrd for DramPageStats {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DramPageStats {
    fn cmp(&self, other: &Self) -> Ordering {
        self.victim_cmp(other)
    }
}

// =============================================================================
// VICTIM HEAP
// =============================================================================

/// Lifecycle phase of a victim heap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapPhase {
    /// Not built this epoch
    Unbuilt,
    /// Built, candidates remaining
    Built,
    /// Built and emptied
    Drained,
}

/// Lazily built, drain-only priority queue of victims
#[derive(Debug, Clone)]
pub enum VictimHeap<T: Ord> {
    /// Not built this epoch
    Unbuilt,
    /// Candidates remaining
    Built(BinaryHeap<T>),
    /// Every candidate extracted
    Drained,
}

impl<T: Ord> VictimHeap<T> {
    /// Current phase
    pub fn phase(&self) -> HeapPhase {
        match self {
            Self::Unbuilt => HeapPhase::Unbuilt,
            Self::Built(_) => HeapPhase::Built,
            Self::Drained => HeapPhase::Drained,
        }
    }

    /// Needs building?
    #[inline(always)]
    pub fn is_unbuilt(&self) -> bool {
        matches!(self, Self::Unbuilt)
    }

    /// Freeze a candidate set. An empty set goes straight to `Drained`.
    pub fn build(&mut self, candidates: Vec<T>) {
        *self = if candidates.is_empty() {
            Self::Drained
        } else {
            Self::Built(BinaryHeap::from(candidates))
        };
    }

    /// Extract the top candidate. Does nothing before `build`.
    pub fn pop(&mut self) -> Option<T> {
        let Self::Built(heap) = self else {
            return None;
        };
        let top = heap.pop();
        if heap.is_empty() {
            *self = Self::Drained;
        }
        top
    }

    /// Back to `Unbuilt`
    pub fn reset(&mut self) {
        *self = Self::Unbuilt;
    }
}

impl<T: Ord> Default for VictimHeap<T> {
    fn default() -> Self {
        Self::Unbuilt
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn nvm(addr: u64, dirty_ratio: f64, write_ratio: f64) -> NvmPageStats {
        NvmPageStats {
            addr: PageAddr::new(addr),
            dirty_ratio,
            write_ratio,
        }
    }

    fn dram(addr: u64, state: DramState, write_ratio: f64) -> DramPageStats {
        DramPageStats {
            addr: PageAddr::new(addr),
            state,
            write_ratio,
        }
    }

    #[test]
    fn test_nvm_order() {
        assert!(nvm(0, 0.5, 0.0) > nvm(0x100, 0.25, 9.0));
        assert!(nvm(0, 0.5, 1.0) > nvm(0x100, 0.5, 0.5));
        // Tie on both ratios: lower address first
        assert!(nvm(0, 0.5, 1.0) > nvm(0x100, 0.5, 1.0));
        assert_eq!(nvm(0x100, 0.5, 1.0), nvm(0x100, 0.5, 1.0));
    }

    #[test]
    fn test_dram_order() {
        assert!(dram(0x100, DramState::DirtyDirect, 0.25) > dram(0, DramState::CleanDirect, 0.5));
        assert!(dram(0x100, DramState::CleanStatic, 0.0) > dram(0, DramState::DirtyStatic, 0.0));
        assert!(dram(0, DramState::CleanDirect, 0.0) > dram(0x100, DramState::CleanStatic, 0.0));
    }

    #[test]
    fn test_heap_lifecycle() {
        let mut heap = VictimHeap::default();
        assert_eq!(heap.phase(), HeapPhase::Unbuilt);
        assert_eq!(heap.pop(), None);

        heap.build(vec![nvm(0x100, 0.25, 0.25), nvm(0, 0.5, 0.75)]);
        assert_eq!(heap.phase(), HeapPhase::Built);

        assert_eq!(heap.pop().map(|s| s.addr), Some(PageAddr::new(0)));
        assert_eq!(heap.pop().map(|s| s.addr), Some(PageAddr::new(0x100)));
        assert_eq!(heap.phase(), HeapPhase::Drained);
        assert_eq!(heap.pop(), None);

        heap.reset();
        assert!(heap.is_unbuilt());
    }

    #[test]
    fn test_empty_build_is_drained() {
        let mut heap: VictimHeap<NvmPageStats> = VictimHeap::default();
        heap.build(Vec::new());
        assert_eq!(heap.phase(), HeapPhase::Drained);
    }
}
