//! # Profiler Collaborator
//!
//! The controller reports its own cost to a profiler: one table operation per
//! logical lookup or sweep, and inter-tier page moves for write-backs. The
//! profiler's timing model lives outside this crate.

/// Sink for controller cost events
pub trait Profiler {
    /// One logical table operation
    fn add_table_op(&mut self);

    /// `pages` pages moved between DRAM and NVM
    fn add_page_move_inter(&mut self, pages: u64);
}

impl<P: Profiler + ?Sized> Profiler for &mut P {
    #[inline]
    fn add_table_op(&mut self) {
        (**self).add_table_op();
    }

    #[inline]
    fn add_page_move_inter(&mut self, pages: u64) {
        (**self).add_page_move_inter(pages);
    }
}

// =============================================================================
// NULL PROFILER
// =============================================================================

/// Profiler that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProfiler;

impl Profiler for NullProfiler {
    #[inline(always)]
    fn add_table_op(&mut self) {}

    #[inline(always)]
    fn add_page_move_inter(&mut self, _pages: u64) {}
}

// =============================================================================
// COUNTING PROFILER
// =============================================================================

/// Profiler that counts events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileCounters {
    /// Table operations
    pub table_ops: u64,
    /// Page move events (calls to `add_page_move_inter`)
    pub page_move_events: u64,
    /// Pages moved across tiers
    pub inter_page_moves: u64,
    /// Size of the last page move event
    pub last_page_move: Option<u64>,
}

impl ProfileCounters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Profiler for ProfileCounters {
    #[inline]
    fn add_table_op(&mut self) {
        self.table_ops = self.table_ops.saturating_add(1);
    }

    #[inline]
    fn add_page_move_inter(&mut self, pages: u64) {
        self.page_move_events = self.page_move_events.saturating_add(1);
        self.inter_page_moves = self.inter_page_moves.saturating_add(pages);
        self.last_page_move = Some(pages);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut prof = ProfileCounters::new();
        prof.add_table_op();
        prof.add_table_op();
        prof.add_page_move_inter(3);
        prof.add_page_move_inter(0);

        assert_eq!(prof.table_ops, 2);
        assert_eq!(prof.page_move_events, 2);
        assert_eq!(prof.inter_page_moves, 3);
        assert_eq!(prof.last_page_move, Some(0));

        prof.reset();
        assert_eq!(prof, ProfileCounters::default());
    }

    #[test]
    fn test_forwarding_through_reference() {
        fn touch(mut p: impl Profiler) {
            p.add_table_op();
        }

        let mut prof = ProfileCounters::new();
        touch(&mut prof);
        assert_eq!(prof.table_ops, 1);
    }
}
