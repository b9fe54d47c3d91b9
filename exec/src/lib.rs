//! Execution engine: block cache and the CPU dispatch loop.
//!
//! Drives the lookup → compile → execute cycle under a cycle budget,
//! delivering IRQs between blocks and honoring explicit icache flush
//! requests from the host.

pub mod block_cache;
pub mod jit;

pub use block_cache::BlockCache;
pub use jit::{Descriptor, Error, Jit, JitStats, SPECULATIVE_DEPTH};
