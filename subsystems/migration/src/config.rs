//! # Controller Configuration
//!
//! Tier geometry handed to the controller at construction. Loading these
//! values from a file or command line belongs to the driver.

use static_assertions::const_assert;

use crate::addr::PageGeometry;
use crate::error::{MigrationError, MigrationResult};

// =============================================================================
// DEFAULTS
// =============================================================================

/// Default block size: 64-byte cache lines
pub const DEFAULT_BLOCK_BITS: u32 = 6;

/// Default page: 64 blocks (4 KiB)
pub const DEFAULT_PAGE_BLOCKS: u64 = 64;

/// Default DRAM table capacity in pages
pub const DEFAULT_DRAM_PAGES: usize = 1024;

const_assert!(DEFAULT_BLOCK_BITS < u64::BITS);
const_assert!(DEFAULT_PAGE_BLOCKS.is_power_of_two());
const_assert!(DEFAULT_DRAM_PAGES > 0);

// =============================================================================
// MIGRATION CONFIG
// =============================================================================

/// Migration controller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// log2 of the block size in bytes
    pub block_bits: u32,
    /// Blocks per page
    pub page_blocks: u64,
    /// Maximum number of pages held by the DRAM tier
    pub dram_pages: usize,
}

impl MigrationConfig {
    /// Configuration with the given block size and page size
    pub const fn new(block_bits: u32, page_blocks: u64) -> Self {
        Self {
            block_bits,
            page_blocks,
            dram_pages: DEFAULT_DRAM_PAGES,
        }
    }

    /// 64-byte blocks in 4 KiB pages
    pub const fn small_pages() -> Self {
        Self::new(DEFAULT_BLOCK_BITS, DEFAULT_PAGE_BLOCKS)
    }

    /// 64-byte blocks in 2 MiB pages
    pub const fn huge_pages() -> Self {
        Self::new(DEFAULT_BLOCK_BITS, 32 * 1024)
    }

    /// Set block size
    pub fn with_block_bits(mut self, block_bits: u32) -> Self {
        self.block_bits = block_bits;
        self
    }

    /// Set page size in blocks
    pub fn with_page_blocks(mut self, page_blocks: u64) -> Self {
        self.page_blocks = page_blocks;
        self
    }

    /// Set DRAM capacity in pages
    pub fn with_dram_pages(mut self, dram_pages: usize) -> Self {
        self.dram_pages = dram_pages;
        self
    }

    /// Validate and derive the page geometry
    pub fn validate(&self) -> MigrationResult<PageGeometry> {
        if self.dram_pages == 0 {
            return Err(MigrationError::Config {
                field: "dram_pages",
                reason: "DRAM tier must hold at least one page",
            });
        }
        PageGeometry::new(self.block_bits, self.page_blocks)
    }

    /// DRAM tier size in bytes, if it fits in 64 bits
    pub fn dram_bytes(&self) -> Option<u64> {
        // checked_shl only bounds the shift amount, not the shifted-out bits
        if self.block_bits >= u64::BITS || self.page_blocks.leading_zeros() < self.block_bits {
            return None;
        }
        (self.page_blocks << self.block_bits).checked_mul(self.dram_pages as u64)
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self::small_pages()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let geo = MigrationConfig::default().validate().unwrap();
        assert_eq!(geo.page_size(), 4096);
    }

    #[test]
    fn test_huge_pages() {
        let geo = MigrationConfig::huge_pages().validate().unwrap();
        assert_eq!(geo.page_size(), 2 * 1024 * 1024);
    }

    #[test]
    fn test_builder() {
        let config = MigrationConfig::default()
            .with_block_bits(0)
            .with_page_blocks(4)
            .with_dram_pages(3);
        assert_eq!(config.block_bits, 0);
        assert_eq!(config.page_blocks, 4);
        assert_eq!(config.dram_bytes(), Some(12));
    }

    #[test]
    fn test_dram_bytes_overflow() {
        let config = MigrationConfig::new(30, 1 << 40).with_dram_pages(1);
        assert_eq!(config.dram_bytes(), None);
        assert_eq!(MigrationConfig::new(64, 1).dram_bytes(), None);
        assert_eq!(
            MigrationConfig::new(30, 1 << 33).with_dram_pages(1).dram_bytes(),
            Some(1 << 63)
        );
        assert_eq!(
            MigrationConfig::new(30, 1 << 33).with_dram_pages(2).dram_bytes(),
            None
        );
    }

    #[test]
    fn test_zero_dram_rejected() {
        let err = MigrationConfig::default().with_dram_pages(0).validate();
        assert!(matches!(
            err,
            Err(MigrationError::Config {
                field: "dram_pages",
                ..
            })
        ));
    }
}
