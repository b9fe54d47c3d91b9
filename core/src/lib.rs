//! IR core: value model, opcodes, emitter, blocks, guest state and
//! the memory interface shared by the frontend, backends and the
//! dispatch loop.

pub mod block;
pub mod dump;
pub mod emitter;
pub mod memory;
pub mod opcode;
pub mod state;
pub mod types;
pub mod value;

pub use block::{BasicBlock, BlockKey, MicroBlock};
pub use emitter::Emitter;
pub use memory::{Bus, Memory};
pub use opcode::{AluOp, MemAccess, Op, OpDef, OpFlags, Opcode, OPCODE_DEFS};
pub use state::{
    Mode, PsrFlags, State, StatusRegister, NUM_GPRS, REG_LR, REG_PC, REG_SP,
};
pub use types::{Condition, DataType, ShiftType};
pub use value::{Constant, GuestReg, Value, VarIdx, Variable};
