//! # Shared Controller
//!
//! A controller and its profiler behind one spinlock, for simulators that
//! drive the epoch from more than one thread. Each call holds the lock for a
//! single operation; phase ordering is still the caller's job.

use spin::Mutex;

use crate::addr::PageAddr;
use crate::block::BlockObservation;
use crate::config::MigrationConfig;
use crate::controller::MigrationController;
use crate::dram::{AccessKind, DramMode, DramPageEntry};
use crate::error::MigrationResult;
use crate::profiler::Profiler;
use crate::stats::MigrationStats;
use crate::victim::{DramPageStats, NvmPageStats};

/// Controller state guarded together with its profiler
#[derive(Debug)]
struct Inner<P> {
    controller: MigrationController,
    profiler: P,
}

/// Lock-guarded migration controller
#[derive(Debug)]
pub struct SharedController<P: Profiler> {
    inner: Mutex<Inner<P>>,
}

impl<P: Profiler> SharedController<P> {
    /// Create a shared controller reporting to `profiler`
    pub fn new(config: MigrationConfig, profiler: P) -> MigrationResult<Self> {
        Ok(Self {
            inner: Mutex::new(Inner {
                controller: MigrationController::new(config)?,
                profiler,
            }),
        })
    }

    /// See [`MigrationController::input_blocks`]
    pub fn input_blocks(&self, blocks: &[BlockObservation]) -> MigrationResult<()> {
        self.inner.lock().controller.input_blocks(blocks)
    }

    /// See [`MigrationController::extract_nvm_page`]
    pub fn extract_nvm_page(&self) -> Option<NvmPageStats> {
        let mut inner = self.inner.lock();
        let Inner {
            controller,
            profiler,
        } = &mut *inner;
        controller.extract_nvm_page(profiler)
    }

    /// See [`MigrationController::extract_dram_page`]
    pub fn extract_dram_page(&self) -> MigrationResult<Option<DramPageStats>> {
        let mut inner = self.inner.lock();
        let Inner {
            controller,
            profiler,
        } = &mut *inner;
        controller.extract_dram_page(profiler)
    }

    /// See [`MigrationController::clear`]
    pub fn clear(&self) -> MigrationResult<()> {
        let mut inner = self.inner.lock();
        let Inner {
            controller,
            profiler,
        } = &mut *inner;
        controller.clear(profiler)
    }

    /// See [`MigrationController::insert_dram_page`]
    pub fn insert_dram_page(&self, addr: PageAddr, mode: DramMode) -> MigrationResult<()> {
        self.inner.lock().controller.insert_dram_page(addr, mode)
    }

    /// See [`MigrationController::record_dram_access`]
    pub fn record_dram_access(
        &self,
        addr: PageAddr,
        kind: AccessKind,
    ) -> MigrationResult<DramPageEntry> {
        let mut inner = self.inner.lock();
        let Inner {
            controller,
            profiler,
        } = &mut *inner;
        controller.record_dram_access(addr, kind, profiler)
    }

    /// Snapshot of the cumulative statistics
    pub fn stats(&self) -> MigrationStats {
        self.inner.lock().controller.stats().clone()
    }

    /// Run `f` with exclusive access to the controller and profiler
    pub fn with<R>(&self, f: impl FnOnce(&mut MigrationController, &mut P) -> R) -> R {
        let mut inner = self.inner.lock();
        let Inner {
            controller,
            profiler,
        } = &mut *inner;
        f(controller, profiler)
    }

    /// Unwrap into the controller and profiler
    pub fn into_inner(self) -> (MigrationController, P) {
        let inner = self.inner.into_inner();
        (inner.controller, inner.profiler)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::ProfileCounters;

    #[test]
    fn test_shared_epoch() {
        let shared =
            SharedController::new(MigrationConfig::new(6, 4), ProfileCounters::new()).unwrap();
        shared.insert_dram_page(PageAddr::new(0), DramMode::Direct).unwrap();
        shared
            .record_dram_access(PageAddr::new(0), AccessKind::Write)
            .unwrap();
        shared
            .input_blocks(&[BlockObservation::dirty(4, 0, 1)])
            .unwrap();

        assert_eq!(
            shared.extract_nvm_page().map(|s| s.addr),
            Some(PageAddr::new(256))
        );
        assert!(shared.extract_dram_page().unwrap().is_some());
        shared.clear().unwrap();

        assert_eq!(shared.stats().epochs, 1);
        let (ctrl, prof) = shared.into_inner();
        assert_eq!(ctrl.dirty_entries(), 0);
        assert_eq!(prof.inter_page_moves, 1);
        // access + two extractions + clear sweep
        assert_eq!(prof.table_ops, 4);
    }

    #[test]
    fn test_with_closure() {
        let shared =
            SharedController::new(MigrationConfig::default(), ProfileCounters::new()).unwrap();
        let len = shared.with(|ctrl, prof| {
            prof.add_table_op();
            ctrl.dram_len()
        });
        assert_eq!(len, 0);
        assert_eq!(shared.into_inner().1.table_ops, 1);
    }
}
