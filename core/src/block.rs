//! Micro-blocks, basic blocks and the block key.

use crate::emitter::Emitter;
use crate::state::{Mode, State, REG_PC};
use crate::types::Condition;

/// Cache key for a basic block: guest address plus the mode bits that
/// change what the same address means (register banking, Thumb).
///
/// Packed as `address << 6 | thumb << 5 | mode`. Zero is never a valid
/// key because the mode field of any real mode is at least 0x10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockKey(u64);

impl BlockKey {
    /// The "no block" key.
    pub const NONE: BlockKey = BlockKey(0);

    pub fn new(address: u32, mode: Mode, thumb: bool) -> Self {
        Self(
            ((address & !1) as u64) << 6
                | (thumb as u64) << 5
                | mode as u64 & 0x1F,
        )
    }

    /// Derive the key for the next block from live guest state,
    /// removing the pipeline offset from r15.
    pub fn from_state(state: &State) -> Self {
        let cpsr = state.cpsr();
        let thumb = cpsr.thumb();
        let offset = if thumb { 2 * 2 } else { 2 * 4 };
        let address = state
            .gpr(cpsr.mode(), REG_PC)
            .wrapping_sub(offset);
        Self::new(address, cpsr.mode(), thumb)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn address(self) -> u32 {
        (self.0 >> 6) as u32
    }

    pub fn thumb(self) -> bool {
        self.0 & (1 << 5) != 0
    }

    pub fn mode(self) -> Mode {
        Mode::from_bits(self.0 as u32).unwrap_or(Mode::User)
    }
}

/// The IR of one guest instruction: an opcode list plus its variable
/// pool, guarded by the instruction's condition. No guest-visible
/// effect may occur when the condition evaluates false.
#[derive(Debug, Clone)]
pub struct MicroBlock {
    pub condition: Condition,
    pub emitter: Emitter,
}

impl MicroBlock {
    pub fn new(condition: Condition) -> Self {
        Self {
            condition,
            emitter: Emitter::new(),
        }
    }
}

/// A translated basic block. Owned exclusively by the block cache once
/// inserted; immutable afterwards except for invalidation.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub key: BlockKey,
    pub micro_blocks: Vec<MicroBlock>,
    /// Statically known successor key, `BlockKey::NONE` when the
    /// successor depends on runtime data.
    pub branch_target: BlockKey,
    /// Number of guest instructions covered by this block.
    pub num_instructions: u32,
    /// Set by the backend once host code (or its stand-in) exists.
    pub compiled: bool,
}

impl BasicBlock {
    pub fn new(key: BlockKey) -> Self {
        Self {
            key,
            micro_blocks: Vec::new(),
            branch_target: BlockKey::NONE,
            num_instructions: 0,
            compiled: false,
        }
    }

    /// Guest address span `[start, end)` covered by this block.
    pub fn span(&self) -> (u32, u32) {
        let start = self.key.address();
        let width = if self.key.thumb() { 2 } else { 4 };
        (start, start.wrapping_add(self.num_instructions * width))
    }
}
