//! # Migration Controller
//!
//! Epoch-scoped bookkeeping for the two tiers:
//!
//! 1. [`MigrationController::input_blocks`] folds the epoch's block activity
//!    into per-page NVM statistics.
//! 2. [`MigrationController::extract_nvm_page`] and
//!    [`MigrationController::extract_dram_page`] hand out victims, best first,
//!    from heaps built on first use and frozen for the rest of the epoch.
//! 3. [`MigrationController::clear`] writes back dirty DRAM pages, resets the
//!    epoch counters and drops everything built during the epoch.
//!
//! The phases are ordered by the caller. The controller detects the
//! violations it can observe and reports them as [`MigrationError`]s.

use alloc::vec::Vec;

use crate::addr::{PageAddr, PageGeometry};
use crate::block::BlockObservation;
use crate::config::MigrationConfig;
use crate::dram::{AccessKind, DramMode, DramPageEntry, DramTable};
use crate::error::{MigrationError, MigrationResult};
use crate::nvm::{NvmAggregator, NvmPage};
use crate::profiler::Profiler;
use crate::stats::MigrationStats;
use crate::victim::{DramPageStats, HeapPhase, NvmPageStats, VictimHeap};

// =============================================================================
// CONTROLLER
// =============================================================================

/// DRAM/NVM migration controller
#[derive(Debug)]
pub struct MigrationController {
    /// Configuration
    config: MigrationConfig,
    /// Derived geometry
    geometry: PageGeometry,
    /// DRAM-resident pages
    dram: DramTable,
    /// NVM pages touched this epoch
    nvm: NvmAggregator,
    /// NVM promotion candidates
    nvm_heap: VictimHeap<NvmPageStats>,
    /// DRAM demotion candidates
    dram_heap: VictimHeap<DramPageStats>,
    /// Cumulative statistics
    stats: MigrationStats,
}

impl MigrationController {
    /// Create a controller
    pub fn new(config: MigrationConfig) -> MigrationResult<Self> {
        let geometry = config.validate()?;
        log::debug!(
            "Migration: {} B blocks, {} B pages, {} DRAM pages",
            geometry.block_size(),
            geometry.page_size(),
            config.dram_pages
        );

        Ok(Self {
            dram: DramTable::new(config.dram_pages),
            config,
            geometry,
            nvm: NvmAggregator::new(),
            nvm_heap: VictimHeap::default(),
            dram_heap: VictimHeap::default(),
            stats: MigrationStats::default(),
        })
    }

    // =========================================================================
    // Epoch operations
    // =========================================================================

    /// Fold the epoch's block observations into NVM page statistics.
    ///
    /// Must be the first ingestion since the last [`clear`](Self::clear). The
    /// batch is validated as a whole; on error nothing is recorded.
    pub fn input_blocks(&mut self, blocks: &[BlockObservation]) -> MigrationResult<()> {
        if !self.nvm.is_empty() {
            log::error!(
                "Migration: input_blocks with {} NVM pages pending",
                self.nvm.len()
            );
            return Err(MigrationError::AggregationNotEmpty {
                pages: self.nvm.len(),
            });
        }

        let mut scratch = NvmAggregator::new();
        scratch.fold(&self.geometry, blocks)?;

        self.stats.dirty_nvm_pages = self
            .stats
            .dirty_nvm_pages
            .saturating_add(scratch.len() as u64);
        log::trace!(
            "Migration: {} blocks folded into {} NVM pages",
            blocks.len(),
            scratch.len()
        );
        self.nvm = scratch;
        Ok(())
    }

    /// Next NVM page to promote, or `None` once this epoch's candidates are
    /// exhausted. Every call costs one table operation.
    pub fn extract_nvm_page<P: Profiler>(&mut self, profiler: &mut P) -> Option<NvmPageStats> {
        if self.nvm_heap.is_unbuilt() {
            self.build_nvm_heap();
        }
        profiler.add_table_op();

        let victim = self.nvm_heap.pop()?;
        self.stats.nvm_extractions = self.stats.nvm_extractions.saturating_add(1);
        Some(victim)
    }

    /// Next DRAM page to demote, or `None` once this epoch's candidates are
    /// exhausted. Every call costs one table operation, except one whose
    /// heap build fails.
    ///
    /// Building the heap cross-checks the dirty counter against the table.
    /// On a mismatch the heap stays unbuilt and no statistics are recorded.
    pub fn extract_dram_page<P: Profiler>(
        &mut self,
        profiler: &mut P,
    ) -> MigrationResult<Option<DramPageStats>> {
        if self.dram_heap.is_unbuilt() {
            self.build_dram_heap()?;
        }
        profiler.add_table_op();

        let Some(victim) = self.dram_heap.pop() else {
            return Ok(None);
        };
        self.stats.dram_extractions = self.stats.dram_extractions.saturating_add(1);
        Ok(Some(victim))
    }

    /// End the epoch.
    ///
    /// Dirty DRAM pages are written back (one page move event), every DRAM
    /// entry is cleaned with zeroed counters, and the NVM statistics and both
    /// heaps are dropped.
    pub fn clear<P: Profiler>(&mut self, profiler: &mut P) -> MigrationResult<()> {
        let writebacks = self.dram.dirty_entries();
        profiler.add_page_move_inter(writebacks);

        let cleaned = self.dram.clean_all();
        profiler.add_table_op();

        let remaining = self.dram.dirty_entries();
        if remaining != 0 {
            log::error!("Migration: {} dirty DRAM entries after clear", remaining);
            return Err(MigrationError::DirtyEntriesAfterClear { remaining });
        }

        self.nvm.clear();
        self.nvm_heap.reset();
        self.dram_heap.reset();
        self.stats.epochs = self.stats.epochs.saturating_add(1);

        log::debug!(
            "Migration: epoch {} closed, {} pages written back",
            self.stats.epochs,
            cleaned
        );
        Ok(())
    }

    // =========================================================================
    // DRAM access path
    // =========================================================================

    /// Admit a page into DRAM as clean
    pub fn insert_dram_page(&mut self, addr: PageAddr, mode: DramMode) -> MigrationResult<()> {
        self.geometry.page(addr.as_u64())?;
        self.dram.insert(addr, mode)
    }

    /// Count a DRAM access. The first write of the epoch dirties the page.
    pub fn record_dram_access<P: Profiler>(
        &mut self,
        addr: PageAddr,
        kind: AccessKind,
        profiler: &mut P,
    ) -> MigrationResult<DramPageEntry> {
        let entry = self.dram.access(addr, kind)?;
        profiler.add_table_op();
        Ok(entry)
    }

    /// Remove a page demoted by the mover. A dirty page costs one write-back.
    pub fn evict_dram_page<P: Profiler>(
        &mut self,
        addr: PageAddr,
        profiler: &mut P,
    ) -> MigrationResult<DramPageEntry> {
        let entry = self.dram.remove(addr)?;
        if entry.state.is_dirty() {
            profiler.add_page_move_inter(1);
        }
        profiler.add_table_op();
        Ok(entry)
    }

    // =========================================================================
    // Heap construction
    // =========================================================================

    fn build_nvm_heap(&mut self) {
        let mut candidates = Vec::with_capacity(self.nvm.len());
        for (addr, page) in self.nvm.iter() {
            candidates.push(NvmPageStats {
                addr,
                dirty_ratio: self.geometry.ratio(page.dirty_count() as u64),
                write_ratio: self.geometry.ratio(page.epoch_writes),
            });
            self.stats.total_nvm_writes =
                self.stats.total_nvm_writes.saturating_add(page.epoch_writes);
            self.stats.dirty_nvm_blocks = self
                .stats
                .dirty_nvm_blocks
                .saturating_add(page.dirty_count() as u64);
        }

        log::trace!("Migration: NVM heap built over {} pages", candidates.len());
        self.nvm_heap.build(candidates);
    }

    fn build_dram_heap(&mut self) -> MigrationResult<()> {
        let mut candidates = Vec::with_capacity(self.dram.len());
        let mut writes: u64 = 0;
        for (addr, entry) in self.dram.iter() {
            candidates.push(DramPageStats {
                addr,
                state: entry.state,
                write_ratio: self.geometry.ratio(entry.epoch_writes),
            });
            writes = writes.saturating_add(entry.epoch_writes);
        }

        let written = self.dram.count_written();
        let tracked = self.dram.dirty_entries();
        if written != tracked {
            log::error!(
                "Migration: dirty DRAM entries tracked {}, found {}",
                tracked,
                written
            );
            return Err(MigrationError::DirtyCountMismatch {
                tracked,
                actual: written,
            });
        }

        self.stats.total_dram_writes = self.stats.total_dram_writes.saturating_add(writes);
        self.stats.dirty_dram_pages = self.stats.dirty_dram_pages.saturating_add(tracked);
        log::trace!("Migration: DRAM heap built over {} pages", candidates.len());
        self.dram_heap.build(candidates);
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Configuration
    #[inline(always)]
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Page geometry
    #[inline(always)]
    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Cumulative statistics
    #[inline(always)]
    pub fn stats(&self) -> &MigrationStats {
        &self.stats
    }

    /// DRAM entry for a page
    #[inline]
    pub fn dram_entry(&self, addr: PageAddr) -> Option<&DramPageEntry> {
        self.dram.get(addr)
    }

    /// Resident DRAM pages
    #[inline(always)]
    pub fn dram_len(&self) -> usize {
        self.dram.len()
    }

    /// Dirty DRAM pages
    #[inline(always)]
    pub fn dirty_entries(&self) -> u64 {
        self.dram.dirty_entries()
    }

    /// NVM statistics for a page this epoch
    #[inline]
    pub fn nvm_page(&self, addr: PageAddr) -> Option<&NvmPage> {
        self.nvm.get(addr)
    }

    /// NVM pages touched this epoch
    #[inline(always)]
    pub fn nvm_len(&self) -> usize {
        self.nvm.len()
    }

    /// NVM heap phase
    #[inline]
    pub fn nvm_heap_phase(&self) -> HeapPhase {
        self.nvm_heap.phase()
    }

    /// DRAM heap phase
    #[inline]
    pub fn dram_heap_phase(&self) -> HeapPhase {
        self.dram_heap.phase()
    }
}

// =============================================================================
// TESTS
// =============================================================================
