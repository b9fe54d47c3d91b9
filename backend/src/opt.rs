//! Micro-block optimization: dead code elimination.
//!
//! A backwards mark pass seeds liveness from ops with side effects
//! (guest-state writes, memory accesses, host flag updates) and drops
//! every pure op whose results nothing reads. Unreferenced variables
//! stay in the pool; they are harmless.

use armjit_core::block::{BasicBlock, MicroBlock};

/// Remove dead ops from one micro-block.
pub fn eliminate_dead_code(mb: &mut MicroBlock) {
    let emitter = &mut mb.emitter;
    let code = emitter.code();
    let mut live = vec![false; emitter.num_vars()];
    let mut keep = vec![false; code.len()];

    for (i, op) in code.iter().enumerate().rev() {
        let mut needed = op.has_side_effects();
        if !needed {
            op.for_each_def(|v| needed |= live[v.0 as usize]);
        }
        if needed {
            keep[i] = true;
            op.for_each_use(|v| live[v.0 as usize] = true);
        }
    }

    let mut it = keep.iter().copied();
    emitter.retain_ops(|_| it.next().unwrap_or(true));
}

/// Run the pass over every micro-block of a basic block.
pub fn run(block: &mut BasicBlock) {
    for mb in &mut block.micro_blocks {
        eliminate_dead_code(mb);
    }
}
