//! # Page and Block Addresses
//!
//! Physical addresses in both tiers are byte addresses. A block is the unit
//! tracked by the address translation table (typically a cache line), a page
//! is `page_blocks` consecutive blocks and the unit of migration.

use core::fmt;

use crate::error::{MigrationError, MigrationResult};

// =============================================================================
// ADDRESS TYPES
// =============================================================================

/// Physical tag of a block, i.e. its address shifted right by `block_bits`
pub type PhysTag = u64;

/// Byte address of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct BlockAddr(u64);

impl BlockAddr {
    /// Wrap a raw block address
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Raw address
    #[inline(always)]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Byte address of the first block of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct PageAddr(u64);

impl PageAddr {
    /// Wrap a raw page address. Alignment is checked by [`PageGeometry`].
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Raw address
    #[inline(always)]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PageAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

// =============================================================================
// PAGE GEOMETRY
// =============================================================================

/// Block and page sizes of the hybrid memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGeometry {
    /// log2 of the block size in bytes
    block_bits: u32,
    /// Blocks per page (power of two)
    page_blocks: u64,
}

impl PageGeometry {
    /// Create a geometry, rejecting sizes that cannot be aligned with a mask
    pub fn new(block_bits: u32, page_blocks: u64) -> MigrationResult<Self> {
        if block_bits >= u64::BITS {
            return Err(MigrationError::Config {
                field: "block_bits",
                reason: "must be smaller than 64",
            });
        }
        if page_blocks == 0 || !page_blocks.is_power_of_two() {
            return Err(MigrationError::Config {
                field: "page_blocks",
                reason: "must be a non-zero power of two",
            });
        }
        if block_bits + page_blocks.trailing_zeros() >= u64::BITS {
            return Err(MigrationError::Config {
                field: "page_blocks",
                reason: "page size overflows a 64-bit address",
            });
        }

        Ok(Self {
            block_bits,
            page_blocks,
        })
    }

    /// log2 of the block size
    #[inline(always)]
    pub fn block_bits(&self) -> u32 {
        self.block_bits
    }

    /// Blocks per page
    #[inline(always)]
    pub fn page_blocks(&self) -> u64 {
        self.page_blocks
    }

    /// Block size in bytes
    #[inline(always)]
    pub fn block_size(&self) -> u64 {
        1 << self.block_bits
    }

    /// log2 of the page size
    #[inline(always)]
    pub fn page_bits(&self) -> u32 {
        self.block_bits + self.page_blocks.trailing_zeros()
    }

    /// Page size in bytes
    #[inline(always)]
    pub fn page_size(&self) -> u64 {
        1 << self.page_bits()
    }

    /// Block address for a physical tag
    #[inline]
    pub fn block_addr(&self, tag: PhysTag) -> BlockAddr {
        BlockAddr(tag << self.block_bits)
    }

    /// Round a block address down to its page
    #[inline]
    pub fn page_align(&self, block: BlockAddr) -> PageAddr {
        PageAddr(block.0 & !(self.page_size() - 1))
    }

    /// Is the raw address the start of a page?
    #[inline]
    pub fn is_page_aligned(&self, addr: u64) -> bool {
        addr & (self.page_size() - 1) == 0
    }

    /// Check and wrap a raw page address
    pub fn page(&self, addr: u64) -> MigrationResult<PageAddr> {
        if self.is_page_aligned(addr) {
            Ok(PageAddr(addr))
        } else {
            Err(MigrationError::MisalignedAddress(addr))
        }
    }

    /// Fraction of a page represented by `count` blocks
    #[inline]
    pub fn ratio(&self, count: u64) -> f64 {
        count as f64 / self.page_blocks as f64
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_sizes() {
        let geo = PageGeometry::new(6, 64).unwrap();
        assert_eq!(geo.block_size(), 64);
        assert_eq!(geo.page_bits(), 12);
        assert_eq!(geo.page_size(), 4096);
    }

    #[test]
    fn test_page_align() {
        let geo = PageGeometry::new(6, 4).unwrap();
        // 4 blocks of 64 bytes: tags 0..=3 share page 0
        assert_eq!(geo.page_align(geo.block_addr(0)), PageAddr::new(0));
        assert_eq!(geo.page_align(geo.block_addr(3)), PageAddr::new(0));
        assert_eq!(geo.page_align(geo.block_addr(4)), PageAddr::new(256));
        assert_eq!(geo.page_align(geo.block_addr(9)), PageAddr::new(512));
    }

    #[test]
    fn test_rejects_bad_geometry() {
        assert!(PageGeometry::new(6, 0).is_err());
        assert!(PageGeometry::new(6, 3).is_err());
        assert!(PageGeometry::new(64, 4).is_err());
        assert!(PageGeometry::new(60, 16).is_err());
    }

    #[test]
    fn test_page_checks_alignment() {
        let geo = PageGeometry::new(6, 4).unwrap();
        assert_eq!(geo.page(512), Ok(PageAddr::new(512)));
        assert_eq!(geo.page(520), Err(MigrationError::MisalignedAddress(520)));
    }

    #[test]
    fn test_ratio() {
        let geo = PageGeometry::new(0, 4).unwrap();
        assert_eq!(geo.ratio(2), 0.5);
        assert_eq!(geo.ratio(0), 0.0);
    }
}
