//! Guest frontend: instruction decoding and IR generation.
//!
//! The decoder parses one instruction word into a tagged descriptor
//! and hands it to a `DecodeSink`; the translator is the sink that
//! turns descriptors into micro-block IR for one basic block.

pub mod arm;

pub use arm::decode::{decode_arm, DecodeSink};
pub use arm::insn::ArmInstruction;
pub use arm::{Translator, MAX_BLOCK_INSNS};
