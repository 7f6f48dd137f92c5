//! # NVM Aggregator
//!
//! Folds block observations into per-page statistics for the current epoch.
//! The aggregation is rebuilt from scratch every epoch.

use alloc::collections::BTreeSet;

use hashbrown::HashMap;

use crate::addr::{BlockAddr, PageAddr, PageGeometry};
use crate::block::BlockObservation;
use crate::error::{MigrationError, MigrationResult};

// =============================================================================
// NVM PAGE
// =============================================================================

/// Epoch statistics of one NVM page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NvmPage {
    /// Reads summed over the page's dirty blocks
    pub epoch_reads: u64,
    /// Writes summed over the page's dirty blocks
    pub epoch_writes: u64,
    /// Blocks written this epoch
    pub dirty_blocks: BTreeSet<BlockAddr>,
}

impl NvmPage {
    /// Number of written blocks
    #[inline(always)]
    pub fn dirty_count(&self) -> usize {
        self.dirty_blocks.len()
    }
}

// =============================================================================
// AGGREGATOR
// =============================================================================

/// Per-page NVM statistics for one epoch
#[derive(Debug, Clone, Default)]
pub struct NvmAggregator {
    pages: HashMap<PageAddr, NvmPage>,
}

impl NvmAggregator {
    /// Empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a batch of observations.
    ///
    /// Clean and free blocks are skipped after checking they carry no writes.
    /// On error the aggregator may hold part of the batch; callers fold into
    /// a scratch aggregator and commit on success.
    pub fn fold(
        &mut self,
        geometry: &PageGeometry,
        blocks: &[BlockObservation],
    ) -> MigrationResult<()> {
        let capacity = geometry.page_blocks();

        for obs in blocks {
            let block = geometry.block_addr(obs.phy_tag);

            if !obs.state.is_dirty() {
                if obs.epoch_writes != 0 {
                    log::error!(
                        "NVM: {:?} block {} reported {} writes",
                        obs.state,
                        block,
                        obs.epoch_writes
                    );
                    return Err(MigrationError::DirtyCleanBlock {
                        block,
                        writes: obs.epoch_writes,
                    });
                }
                continue;
            }

            let addr = geometry.page_align(block);
            let page = self.pages.entry(addr).or_default();
            page.epoch_reads = checked_sum(addr, "reads", page.epoch_reads, obs.epoch_reads)?;
            page.epoch_writes =
                checked_sum(addr, "writes", page.epoch_writes, obs.epoch_writes)?;

            if obs.epoch_writes > 0 {
                page.dirty_blocks.insert(block);
                if page.dirty_blocks.len() as u64 > capacity {
                    log::error!(
                        "NVM: page {} holds {} dirty blocks (capacity {})",
                        addr,
                        page.dirty_blocks.len(),
                        capacity
                    );
                    return Err(MigrationError::PageOverflow {
                        page: addr,
                        dirty_blocks: page.dirty_blocks.len(),
                        capacity,
                    });
                }
            }
        }

        Ok(())
    }

    /// Page statistics
    #[inline]
    pub fn get(&self, addr: PageAddr) -> Option<&NvmPage> {
        self.pages.get(&addr)
    }

    /// Number of pages touched this epoch
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// No page touched?
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Iterate pages in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (PageAddr, &NvmPage)> {
        self.pages.iter().map(|(addr, page)| (*addr, page))
    }

    /// Drop all pages
    pub fn clear(&mut self) {
        self.pages.clear();
    }
}

fn checked_sum(page: PageAddr, counter: &'static str, acc: u64, add: u64) -> MigrationResult<u64> {
    acc.checked_add(add).ok_or_else(|| {
        log::error!("NVM: page {} {} counter overflowed", page, counter);
        MigrationError::CounterOverflow { page, counter }
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockState;

    fn geometry() -> PageGeometry {
        PageGeometry::new(6, 4).unwrap()
    }

    #[test]
    fn test_fold_sums_per_page() {
        let geo = geometry();
        let mut agg = NvmAggregator::new();
        agg.fold(&geo, &[
            BlockObservation::dirty(0, 1, 2),
            BlockObservation::dirty(1, 0, 1),
            BlockObservation::dirty(4, 0, 1),
        ])
        .unwrap();

        assert_eq!(agg.len(), 2);
        let page0 = agg.get(PageAddr::new(0)).unwrap();
        assert_eq!(page0.epoch_reads, 1);
        assert_eq!(page0.epoch_writes, 3);
        assert_eq!(
            page0.dirty_blocks.iter().copied().collect::<alloc::vec::Vec<_>>(),
            [geo.block_addr(0), geo.block_addr(1)]
        );

        let page1 = agg.get(geo.page_align(geo.block_addr(4))).unwrap();
        assert_eq!(page1.epoch_writes, 1);
        assert!(page1.dirty_blocks.contains(&geo.block_addr(4)));
    }

    #[test]
    fn test_read_only_dirty_block_counts_reads_only() {
        let geo = geometry();
        let mut agg = NvmAggregator::new();
        agg.fold(&geo, &[BlockObservation::dirty(2, 5, 0)]).unwrap();

        let page = agg.get(PageAddr::new(0)).unwrap();
        assert_eq!(page.epoch_reads, 5);
        assert_eq!(page.dirty_count(), 0);
    }

    #[test]
    fn test_clean_and_free_skipped() {
        let geo = geometry();
        let mut agg = NvmAggregator::new();
        agg.fold(&geo, &[
            BlockObservation::new(0, BlockState::Clean).with_reads(7),
            BlockObservation::new(8, BlockState::Free),
        ])
        .unwrap();
        assert!(agg.is_empty());
    }

    #[test]
    fn test_clean_block_with_writes_rejected() {
        let geo = geometry();
        let mut agg = NvmAggregator::new();
        let err = agg
            .fold(&geo, &[BlockObservation::new(3, BlockState::Clean).with_writes(1)])
            .unwrap_err();
        assert_eq!(err, MigrationError::DirtyCleanBlock {
            block: geo.block_addr(3),
            writes: 1,
        });
    }

    #[test]
    fn test_write_sum_overflow_rejected() {
        let geo = geometry();
        let mut agg = NvmAggregator::new();
        let err = agg
            .fold(&geo, &[
                BlockObservation::dirty(0, 0, u64::MAX),
                BlockObservation::dirty(1, 0, 1),
            ])
            .unwrap_err();
        assert_eq!(err, MigrationError::CounterOverflow {
            page: PageAddr::new(0),
            counter: "writes",
        });
    }

    #[test]
    fn test_read_sum_overflow_rejected() {
        let geo = geometry();
        let mut agg = NvmAggregator::new();
        let err = agg
            .fold(&geo, &[
                BlockObservation::dirty(2, u64::MAX, 0),
                BlockObservation::dirty(3, 1, 0),
            ])
            .unwrap_err();
        assert!(matches!(err, MigrationError::CounterOverflow {
            counter: "reads",
            ..
        }));
    }

    #[test]
    fn test_repeated_block_counted_once() {
        let geo = geometry();
        let mut agg = NvmAggregator::new();
        agg.fold(&geo, &[
            BlockObservation::dirty(1, 0, 1),
            BlockObservation::dirty(1, 0, 4),
        ])
        .unwrap();

        let page = agg.get(PageAddr::new(0)).unwrap();
        assert_eq!(page.epoch_writes, 5);
        assert_eq!(page.dirty_count(), 1);
    }
}
