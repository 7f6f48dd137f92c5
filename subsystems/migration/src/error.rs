//! # Migration Error Handling
//!
//! Every error in this crate is a broken usage contract: the caller fed an
//! inconsistent observation, skipped an epoch boundary, or bypassed the DRAM
//! state machine. Errors are typed so the surrounding simulator decides
//! whether to abort or to report.

use core::fmt;

use crate::addr::{BlockAddr, PageAddr};

// =============================================================================
// RESULT TYPE
// =============================================================================

/// Result type for controller operations
pub type MigrationResult<T> = Result<T, MigrationError>;

// =============================================================================
// ERROR ENUM
// =============================================================================

/// Migration controller error
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MigrationError {
    // =========================================================================
    // Ingestion
    // =========================================================================
    /// A clean or free block was reported with writes
    DirtyCleanBlock {
        /// Block address derived from the physical tag
        block: BlockAddr,
        /// Offending write count
        writes: u64,
    },
    /// An NVM page collected more dirty blocks than it can hold
    PageOverflow {
        /// Page address
        page: PageAddr,
        /// Dirty blocks collected so far
        dirty_blocks: usize,
        /// Blocks per page
        capacity: u64,
    },
    /// A page's epoch counter does not fit in 64 bits
    CounterOverflow {
        /// Page address
        page: PageAddr,
        /// Which counter overflowed
        counter: &'static str,
    },
    /// Blocks were ingested twice within one epoch
    AggregationNotEmpty {
        /// Pages still held by the aggregator
        pages: usize,
    },

    // =========================================================================
    // DRAM state machine
    // =========================================================================
    /// The maintained dirty counter disagrees with the table
    DirtyCountMismatch {
        /// Counter maintained by the controller
        tracked: u64,
        /// Entries actually carrying writes
        actual: u64,
    },
    /// Dirty entries survived an epoch clear
    DirtyEntriesAfterClear {
        /// Remaining dirty count
        remaining: u64,
    },
    /// DRAM table has no room for another page
    DramTableFull {
        /// Configured capacity in pages
        capacity: usize,
    },
    /// Page already present in the DRAM table
    DuplicateDramPage(PageAddr),
    /// Page not present in the DRAM table
    UnknownDramPage(PageAddr),
    /// Address is not page aligned
    MisalignedAddress(u64),

    // =========================================================================
    // Configuration
    // =========================================================================
    /// Invalid configuration value
    Config {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: &'static str,
    },
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirtyCleanBlock { block, writes } => {
                write!(f, "clean block {} reported {} writes", block, writes)
            },
            Self::PageOverflow {
                page,
                dirty_blocks,
                capacity,
            } => write!(
                f,
                "NVM page {} has {} dirty blocks, capacity is {}",
                page, dirty_blocks, capacity
            ),
            Self::CounterOverflow { page, counter } => {
                write!(f, "NVM page {} overflowed its {} counter", page, counter)
            },
            Self::AggregationNotEmpty { pages } => write!(
                f,
                "NVM aggregation still holds {} pages, clear the epoch first",
                pages
            ),
            Self::DirtyCountMismatch { tracked, actual } => write!(
                f,
                "dirty entry count diverged: tracked {}, actual {}",
                tracked, actual
            ),
            Self::DirtyEntriesAfterClear { remaining } => {
                write!(f, "{} dirty entries left after clear", remaining)
            },
            Self::DramTableFull { capacity } => {
                write!(f, "DRAM table full ({} pages)", capacity)
            },
            Self::DuplicateDramPage(page) => write!(f, "DRAM page {} already tracked", page),
            Self::UnknownDramPage(page) => write!(f, "DRAM page {} not tracked", page),
            Self::MisalignedAddress(addr) => write!(f, "address {:#x} is not page aligned", addr),
            Self::Config { field, reason } => {
                write!(f, "invalid configuration '{}': {}", field, reason)
            },
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MigrationError::DirtyCountMismatch {
            tracked: 3,
            actual: 2,
        };
        let msg = alloc::format!("{}", err);
        assert!(msg.contains("tracked 3"));
        assert!(msg.contains("actual 2"));
    }

    #[test]
    fn test_misaligned_display_is_hex() {
        let msg = alloc::format!("{}", MigrationError::MisalignedAddress(0x1040));
        assert!(msg.contains("0x1040"));
    }

    #[test]
    fn test_overflow_display_names_counter() {
        let err = MigrationError::CounterOverflow {
            page: PageAddr::new(0x100),
            counter: "writes",
        };
        let msg = alloc::format!("{}", err);
        assert!(msg.contains("0x100"));
        assert!(msg.contains("writes"));
    }
}
