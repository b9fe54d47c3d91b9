//! Backend seam: the code generator contract, plus the reference
//! IR interpreter backend and the micro-block optimization pass.

pub mod interp;
pub mod opt;
pub mod verify;

pub use interp::Interpreter;
pub use verify::VerifyError;

use armjit_core::block::BasicBlock;
use armjit_core::memory::Memory;
use armjit_core::state::State;

/// Backend compilation failure. Abnormal: a verified translator
/// produces well-formed IR, so hitting this aborts the current run.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("IR verification failed: {0}")]
    Verify(#[from] VerifyError),
}

/// A host code generator.
///
/// The backend owns condition evaluation, host-flag preservation
/// across IR boundaries, and safe re-entry after cache flushes. State
/// and memory are passed in explicitly per call; backends hold no
/// back-references into the CPU.
pub trait Backend {
    /// Produce executable code for `block` and mark it compiled.
    fn compile(&mut self, block: &mut BasicBlock) -> Result<(), CompileError>;

    /// Enter the block's compiled code with `cycles` remaining in the
    /// budget; returns the new remaining budget.
    fn call(
        &mut self,
        block: &BasicBlock,
        state: &mut State,
        memory: &mut dyn Memory,
        cycles: i32,
    ) -> i32;
}
