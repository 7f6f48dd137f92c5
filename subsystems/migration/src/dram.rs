//! # DRAM Activity Table
//!
//! Pages resident in DRAM with their epoch counters. The dirty counter is
//! kept in step with the entry states: every CLEAN to DIRTY shift increments
//! it and every DIRTY to CLEAN shift or dirty eviction decrements it.

use hashbrown::HashMap;

use crate::addr::PageAddr;
use crate::error::{MigrationError, MigrationResult};

// =============================================================================
// ENTRY STATE
// =============================================================================

/// How a DRAM page is persisted, set outside the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DramMode {
    /// Remapped page
    Direct,
    /// Page checkpointed in place
    Static,
}

/// DRAM page state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DramState {
    /// Direct, no writes this epoch
    CleanDirect,
    /// Static, no writes this epoch
    CleanStatic,
    /// Direct, written this epoch
    DirtyDirect,
    /// Static, written this epoch
    DirtyStatic,
}

impl DramState {
    /// Clean state for a mode
    #[inline]
    pub const fn clean(mode: DramMode) -> Self {
        match mode {
            DramMode::Direct => Self::CleanDirect,
            DramMode::Static => Self::CleanStatic,
        }
    }

    /// Dirty state for a mode
    #[inline]
    pub const fn dirty(mode: DramMode) -> Self {
        match mode {
            DramMode::Direct => Self::DirtyDirect,
            DramMode::Static => Self::DirtyStatic,
        }
    }

    /// Written this epoch?
    #[inline(always)]
    pub const fn is_dirty(self) -> bool {
        matches!(self, Self::DirtyDirect | Self::DirtyStatic)
    }

    /// Persistence mode
    #[inline]
    pub const fn mode(self) -> DramMode {
        match self {
            Self::CleanDirect | Self::DirtyDirect => DramMode::Direct,
            Self::CleanStatic | Self::DirtyStatic => DramMode::Static,
        }
    }

    /// Same mode, clean
    #[inline(always)]
    pub const fn cleaned(self) -> Self {
        Self::clean(self.mode())
    }

    /// Same mode, dirty
    #[inline(always)]
    pub const fn dirtied(self) -> Self {
        Self::dirty(self.mode())
    }
}

/// Kind of DRAM access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// Load
    Read,
    /// Store
    Write,
}

// =============================================================================
// DRAM PAGE ENTRY
// =============================================================================

/// One resident DRAM page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DramPageEntry {
    /// Current state
    pub state: DramState,
    /// Reads this epoch
    pub epoch_reads: u64,
    /// Writes this epoch
    pub epoch_writes: u64,
}

impl DramPageEntry {
    /// Fresh clean entry
    pub const fn new(mode: DramMode) -> Self {
        Self {
            state: DramState::clean(mode),
            epoch_reads: 0,
            epoch_writes: 0,
        }
    }
}

// =============================================================================
// DRAM TABLE
// =============================================================================

/// DRAM-resident pages keyed by page address
#[derive(Debug, Clone)]
pub struct DramTable {
    /// Entries
    entries: HashMap<PageAddr, DramPageEntry>,
    /// Entries in a dirty state
    dirty_entries: u64,
    /// Maximum entries
    capacity: usize,
}

impl DramTable {
    /// Empty table holding at most `capacity` pages
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            dirty_entries: 0,
            capacity,
        }
    }

    /// Admit a clean page
    pub fn insert(&mut self, addr: PageAddr, mode: DramMode) -> MigrationResult<()> {
        if self.entries.contains_key(&addr) {
            return Err(MigrationError::DuplicateDramPage(addr));
        }
        if self.is_full() {
            return Err(MigrationError::DramTableFull {
                capacity: self.capacity,
            });
        }
        self.entries.insert(addr, DramPageEntry::new(mode));
        Ok(())
    }

    /// Count an access, shifting the page to dirty on its first write.
    ///
    /// Returns the entry after the update.
    pub fn access(&mut self, addr: PageAddr, kind: AccessKind) -> MigrationResult<DramPageEntry> {
        let entry = self
            .entries
            .get_mut(&addr)
            .ok_or(MigrationError::UnknownDramPage(addr))?;

        match kind {
            AccessKind::Read => entry.epoch_reads = entry.epoch_reads.saturating_add(1),
            AccessKind::Write => {
                entry.epoch_writes = entry.epoch_writes.saturating_add(1);
                if !entry.state.is_dirty() {
                    log::trace!("DRAM: page {} {:?} -> dirty", addr, entry.state);
                    entry.state = entry.state.dirtied();
                    self.dirty_entries += 1;
                }
            },
        }

        Ok(*entry)
    }

    /// Remove a page, returning its last entry
    pub fn remove(&mut self, addr: PageAddr) -> MigrationResult<DramPageEntry> {
        let entry = self
            .entries
            .remove(&addr)
            .ok_or(MigrationError::UnknownDramPage(addr))?;
        if entry.state.is_dirty() {
            self.dirty_entries -= 1;
        }
        Ok(entry)
    }

    /// Zero all epoch counters and clean every dirty page.
    ///
    /// Returns the number of pages that were shifted to clean.
    pub fn clean_all(&mut self) -> u64 {
        let mut cleaned = 0;
        for entry in self.entries.values_mut() {
            entry.epoch_reads = 0;
            entry.epoch_writes = 0;
            if entry.state.is_dirty() {
                entry.state = entry.state.cleaned();
                self.dirty_entries -= 1;
                cleaned += 1;
            }
        }
        cleaned
    }

    /// Entries with nonzero writes, counted from the table itself
    pub fn count_written(&self) -> u64 {
        self.entries.values().filter(|e| e.epoch_writes > 0).count() as u64
    }

    /// Entry for a page
    #[inline]
    pub fn get(&self, addr: PageAddr) -> Option<&DramPageEntry> {
        self.entries.get(&addr)
    }

    /// Maintained dirty counter
    #[inline(always)]
    pub fn dirty_entries(&self) -> u64 {
        self.dirty_entries
    }

    /// Resident pages
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No resident page?
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// At capacity?
    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Iterate entries in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (PageAddr, &DramPageEntry)> {
        self.entries.iter().map(|(addr, entry)| (*addr, entry))
    }

    /// Overwrite the dirty counter to drive the divergence checks
    #[cfg(test)]
    pub(crate) fn force_dirty_entries(&mut self, dirty: u64) {
        self.dirty_entries = dirty;
    }
}

// =============================================================================
// TESTS
// =============================================================================
