//! # Hybrid Memory Migration Controller
//!
//! Page migration bookkeeping for a two-tier memory: a small, fast DRAM tier
//! in front of a dense, write-sensitive NVM tier.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    MigrationController                       │
//! │                                                              │
//! │  block observations ──► NvmAggregator ──► VictimHeap<Nvm>    │
//! │                                                              │
//! │  DRAM accesses ───────► DramTable ──────► VictimHeap<Dram>   │
//! │                                                              │
//! │  clear(): write back dirty DRAM, reset epoch, drop heaps     │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │
//!                           Profiler (table ops, page moves)
//! ```
//!
//! ## Epoch protocol
//!
//! `input_blocks` → any number of `extract_nvm_page` / `extract_dram_page`
//! → `clear` → next epoch. The victim heaps are built on first extraction and
//! frozen until `clear`. Moving data between tiers is left to the caller.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

pub mod addr;
pub mod block;
pub mod config;
pub mod controller;
pub mod dram;
pub mod error;
pub mod nvm;
pub mod profiler;
pub mod shared;
pub mod stats;
pub mod victim;


// Re-exports
pub use addr::{BlockAddr, PageAddr, PageGeometry, PhysTag};
pub use block::{BlockObservation, BlockState};
pub use config::MigrationConfig;
pub use controller::MigrationController;
pub use dram::{AccessKind, DramMode, DramPageEntry, DramState};
pub use error::{MigrationError, MigrationResult};
pub use nvm::NvmPage;
pub use profiler::{NullProfiler, ProfileCounters, Profiler};
pub use shared::SharedController;
pub use stats::MigrationStats;
pub use victim::{DramPageStats, HeapPhase, NvmPageStats};
