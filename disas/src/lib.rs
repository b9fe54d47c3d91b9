//! ARM disassembler built on the frontend's decoder.

pub mod arm;

pub use arm::print_insn_arm;
