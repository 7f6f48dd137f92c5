//! Cumulative controller statistics.

// =============================================================================
// MIGRATION STATISTICS
// =============================================================================

/// Counters accumulated over the controller lifetime.
///
/// Every counter saturates at `u64::MAX` instead of wrapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStats {
    /// Distinct NVM pages with dirty blocks, summed over epochs
    pub dirty_nvm_pages: u64,
    /// Dirty NVM blocks, summed over NVM heap builds
    pub dirty_nvm_blocks: u64,
    /// NVM writes, summed over NVM heap builds
    pub total_nvm_writes: u64,
    /// DRAM writes, summed over DRAM heap builds
    pub total_dram_writes: u64,
    /// Dirty DRAM pages, summed over DRAM heap builds
    pub dirty_dram_pages: u64,
    /// Completed epochs
    pub epochs: u64,
    /// NVM victims handed out
    pub nvm_extractions: u64,
    /// DRAM victims handed out
    pub dram_extractions: u64,
}

impl MigrationStats {
    /// Average writes per dirty NVM page
    #[inline]
    pub fn avg_nvm_writes_per_page(&self) -> f64 {
        if self.dirty_nvm_pages == 0 {
            0.0
        } else {
            self.total_nvm_writes as f64 / self.dirty_nvm_pages as f64
        }
    }

    /// Average dirty blocks per dirty NVM page
    #[inline]
    pub fn avg_dirty_blocks_per_page(&self) -> f64 {
        if self.dirty_nvm_pages == 0 {
            0.0
        } else {
            self.dirty_nvm_blocks as f64 / self.dirty_nvm_pages as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_averages() {
        let stats = MigrationStats {
            dirty_nvm_pages: 2,
            dirty_nvm_blocks: 3,
            total_nvm_writes: 4,
            ..Default::default()
        };
        assert_eq!(stats.avg_nvm_writes_per_page(), 2.0);
        assert_eq!(stats.avg_dirty_blocks_per_page(), 1.5);
        assert_eq!(MigrationStats::default().avg_nvm_writes_per_page(), 0.0);
    }
}
