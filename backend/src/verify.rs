//! IR verifier: enforces the SSA and typing rules every backend
//! relies on. Each variable is written by exactly one op of its
//! owning micro-block, before any read; all operands are word-typed.

use armjit_core::block::{BasicBlock, MicroBlock};
use armjit_core::types::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("variable v{0} is not declared in the micro-block")]
    Undeclared(u32),
    #[error("variable v{0} is defined more than once")]
    MultipleDefinition(u32),
    #[error("variable v{0} is read before its definition")]
    UseBeforeDefinition(u32),
    #[error("variable v{0} has type {1:?}, expected UInt32")]
    TypeMismatch(u32, DataType),
}

/// Check every micro-block of a basic block.
pub fn check_block(block: &BasicBlock) -> Result<(), VerifyError> {
    for mb in &block.micro_blocks {
        check_micro_block(mb)?;
    }
    Ok(())
}

/// Check one micro-block.
pub fn check_micro_block(mb: &MicroBlock) -> Result<(), VerifyError> {
    let emitter = &mb.emitter;
    let num_vars = emitter.num_vars();
    let mut defined = vec![false; num_vars];

    for op in emitter.code() {
        let mut error = None;

        op.for_each_use(|v| {
            let idx = v.0 as usize;
            if idx >= num_vars {
                error.get_or_insert(VerifyError::Undeclared(v.0));
            } else if !defined[idx] {
                error.get_or_insert(VerifyError::UseBeforeDefinition(v.0));
            }
        });

        op.for_each_def(|v| {
            let idx = v.0 as usize;
            if idx >= num_vars {
                error.get_or_insert(VerifyError::Undeclared(v.0));
                return;
            }
            if defined[idx] {
                error.get_or_insert(VerifyError::MultipleDefinition(v.0));
                return;
            }
            defined[idx] = true;
            let ty = emitter.var(v).ty;
            if ty != DataType::UInt32 {
                error.get_or_insert(VerifyError::TypeMismatch(v.0, ty));
            }
        });

        if let Some(e) = error {
            return Err(e);
        }
    }
    Ok(())
}
