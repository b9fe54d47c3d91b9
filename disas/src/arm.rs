//! ARM disassembler.
//!
//! Built on the same decoder and descriptor set as the translator;
//! formats one instruction per call.

use armjit_core::state::{REG_LR, REG_PC, REG_SP};
use armjit_core::types::ShiftType;
use armjit_frontend::arm::insn::*;
use armjit_frontend::ArmInstruction;

fn reg(r: u8) -> String {
    match r {
        REG_SP => "sp".into(),
        REG_LR => "lr".into(),
        REG_PC => "pc".into(),
        _ => format!("r{r}"),
    }
}

fn reg_list(list: u16) -> String {
    let mut parts = Vec::new();
    let mut r = 0u8;
    while r < 16 {
        if list & (1 << r) != 0 {
            let start = r;
            while r + 1 < 16 && list & (1 << (r + 1)) != 0 {
                r += 1;
            }
            if r > start + 1 {
                parts.push(format!("{}-{}", reg(start), reg(r)));
            } else if r == start + 1 {
                parts.push(reg(start));
                parts.push(reg(r));
            } else {
                parts.push(reg(start));
            }
        }
        r += 1;
    }
    format!("{{{}}}", parts.join(", "))
}

fn shifted_register(op: &ShiftedRegister) -> String {
    let base = reg(op.reg);
    let spec = op.shift;
    if spec.immediate {
        match (spec.kind, spec.amount_imm) {
            (ShiftType::Lsl, 0) => base,
            (ShiftType::Ror, 0) => format!("{base}, rrx"),
            (ShiftType::Lsr, 0) | (ShiftType::Asr, 0) => {
                format!("{base}, {} #32", spec.kind.name())
            }
            (kind, amount) => format!("{base}, {} #{amount}", kind.name()),
        }
    } else {
        format!("{base}, {} {}", spec.kind.name(), reg(spec.amount_reg))
    }
}

fn address_mode(
    reg_base: u8,
    pre: bool,
    add: bool,
    writeback: bool,
    offset: &str,
    zero_offset: bool,
) -> String {
    let base = reg(reg_base);
    let sign = if add { "" } else { "-" };
    if pre {
        let bang = if writeback { "!" } else { "" };
        if zero_offset {
            format!("[{base}]{bang}")
        } else {
            format!("[{base}, {sign}{offset}]{bang}")
        }
    } else {
        format!("[{base}], {sign}{offset}")
    }
}

fn xy(x: bool) -> char {
    if x {
        't'
    } else {
        'b'
    }
}

/// Disassemble one ARM instruction word at `pc`.
pub fn print_insn_arm(pc: u32, word: u32) -> String {
    let Some(insn) = ArmInstruction::decode(word) else {
        return format!(".word 0x{word:08x}");
    };
    let cond = insn.condition().name();

    match insn {
        ArmInstruction::DataProcessing(op) => {
            let s = if op.set_flags && !op.opcode.is_test() {
                "s"
            } else {
                ""
            };
            let name = op.opcode.name();
            let op2 = if op.immediate {
                let value = op.op2_imm.value.rotate_right(op.op2_imm.shift);
                format!("#{value}")
            } else {
                shifted_register(&op.op2_reg)
            };
            match op.opcode {
                DpOpcode::Mov | DpOpcode::Mvn => {
                    format!("{name}{cond}{s} {}, {op2}", reg(op.reg_dst))
                }
                _ if op.opcode.is_test() => {
                    format!("{name}{cond} {}, {op2}", reg(op.reg_op1))
                }
                _ => format!(
                    "{name}{cond}{s} {}, {}, {op2}",
                    reg(op.reg_dst),
                    reg(op.reg_op1)
                ),
            }
        }
        ArmInstruction::MoveStatusRegister(op) => {
            let psr = if op.spsr { "spsr" } else { "cpsr" };
            let mut fields = String::new();
            for (bit, name) in
                [(1, 'c'), (2, 'x'), (4, 's'), (8, 'f')]
            {
                if op.fsxc & bit != 0 {
                    fields.push(name);
                }
            }
            let value = if op.immediate {
                format!("#{}", op.imm)
            } else {
                reg(op.reg)
            };
            format!("msr{cond} {psr}_{fields}, {value}")
        }
        ArmInstruction::MoveRegisterStatus(op) => {
            let psr = if op.spsr { "spsr" } else { "cpsr" };
            format!("mrs{cond} {}, {psr}", reg(op.reg_dst))
        }
        ArmInstruction::Multiply(op) => {
            let s = if op.set_flags { "s" } else { "" };
            if op.accumulate {
                format!(
                    "mla{cond}{s} {}, {}, {}, {}",
                    reg(op.reg_dst),
                    reg(op.reg_op1),
                    reg(op.reg_op2),
                    reg(op.reg_op3)
                )
            } else {
                format!(
                    "mul{cond}{s} {}, {}, {}",
                    reg(op.reg_dst),
                    reg(op.reg_op1),
                    reg(op.reg_op2)
                )
            }
        }
        ArmInstruction::MultiplyLong(op) => {
            let name = match (op.sign_extend, op.accumulate) {
                (false, false) => "umull",
                (false, true) => "umlal",
                (true, false) => "smull",
                (true, true) => "smlal",
            };
            let s = if op.set_flags { "s" } else { "" };
            format!(
                "{name}{cond}{s} {}, {}, {}, {}",
                reg(op.reg_dst_lo),
                reg(op.reg_dst_hi),
                reg(op.reg_op1),
                reg(op.reg_op2)
            )
        }
        ArmInstruction::SingleDataSwap(op) => {
            let b = if op.byte { "b" } else { "" };
            format!(
                "swp{cond}{b} {}, {}, [{}]",
                reg(op.reg_dst),
                reg(op.reg_src),
                reg(op.reg_base)
            )
        }
        ArmInstruction::BranchExchange(op) => {
            let name = if op.link { "blx" } else { "bx" };
            format!("{name}{cond} {}", reg(op.reg))
        }
        ArmInstruction::HalfwordSignedTransfer(op) => {
            let name = match (op.load, op.opcode) {
                (true, 1) => "ldrh",
                (true, 2) => "ldrsb",
                (true, _) => "ldrsh",
                (false, 1) => "strh",
                (false, 2) => "ldrd",
                (false, _) => "strd",
            };
            let offset = if op.immediate {
                format!("#{}", op.offset_imm)
            } else {
                reg(op.offset_reg)
            };
            let zero = op.immediate && op.offset_imm == 0;
            format!(
                "{name}{cond} {}, {}",
                reg(op.reg_dst),
                address_mode(
                    op.reg_base,
                    op.pre_increment,
                    op.add,
                    op.writeback,
                    &offset,
                    zero
                )
            )
        }
        ArmInstruction::SingleDataTransfer(op) => {
            let name = if op.load { "ldr" } else { "str" };
            let b = if op.byte { "b" } else { "" };
            let offset = if op.immediate {
                format!("#{}", op.offset_imm)
            } else {
                let spec = ShiftedRegister {
                    reg: op.offset_reg.reg,
                    shift: ShiftSpec {
                        kind: op.offset_reg.shift,
                        immediate: true,
                        amount_reg: 0,
                        amount_imm: op.offset_reg.amount,
                    },
                };
                shifted_register(&spec)
            };
            let zero = op.immediate && op.offset_imm == 0;
            format!(
                "{name}{cond}{b} {}, {}",
                reg(op.reg_dst),
                address_mode(
                    op.reg_base,
                    op.pre_increment,
                    op.add,
                    op.writeback,
                    &offset,
                    zero
                )
            )
        }
        ArmInstruction::BlockDataTransfer(op) => {
            let name = if op.load { "ldm" } else { "stm" };
            let mode = match (op.add, op.pre_increment) {
                (true, false) => "ia",
                (true, true) => "ib",
                (false, false) => "da",
                (false, true) => "db",
            };
            let bang = if op.writeback { "!" } else { "" };
            let caret = if op.user_mode { "^" } else { "" };
            format!(
                "{name}{mode}{cond} {}{bang}, {}{caret}",
                reg(op.reg_base),
                reg_list(op.reg_list)
            )
        }
        ArmInstruction::BranchRelative(op) => {
            let target = pc.wrapping_add(8).wrapping_add(op.offset as u32);
            if op.exchange {
                format!("blx 0x{target:08x}")
            } else {
                let name = if op.link { "bl" } else { "b" };
                format!("{name}{cond} 0x{target:08x}")
            }
        }
        ArmInstruction::CoprocessorRegisterTransfer(op) => {
            let name = if op.load { "mrc" } else { "mcr" };
            format!(
                "{name}{cond} p{}, {}, {}, c{}, c{}, {}",
                op.coprocessor_id,
                op.opcode1,
                reg(op.reg_dst),
                op.cn,
                op.cm,
                op.opcode2
            )
        }
        ArmInstruction::Exception(op) => {
            format!("svc{cond} #0x{:06x}", op.svc_comment)
        }
        ArmInstruction::CountLeadingZeros(op) => {
            format!("clz{cond} {}, {}", reg(op.reg_dst), reg(op.reg_src))
        }
        ArmInstruction::SaturatingAddSub(op) => {
            let name = match (op.double_rhs, op.subtract) {
                (false, false) => "qadd",
                (false, true) => "qsub",
                (true, false) => "qdadd",
                (true, true) => "qdsub",
            };
            format!(
                "{name}{cond} {}, {}, {}",
                reg(op.reg_dst),
                reg(op.reg_lhs),
                reg(op.reg_rhs)
            )
        }
        ArmInstruction::SignedHalfwordMultiply(op) => {
            if op.accumulate {
                format!(
                    "smla{}{}{cond} {}, {}, {}, {}",
                    xy(op.x),
                    xy(op.y),
                    reg(op.reg_dst),
                    reg(op.reg_lhs),
                    reg(op.reg_rhs),
                    reg(op.reg_op3)
                )
            } else {
                format!(
                    "smul{}{}{cond} {}, {}, {}",
                    xy(op.x),
                    xy(op.y),
                    reg(op.reg_dst),
                    reg(op.reg_lhs),
                    reg(op.reg_rhs)
                )
            }
        }
        ArmInstruction::SignedWordHalfwordMultiply(op) => {
            if op.accumulate {
                format!(
                    "smlaw{}{cond} {}, {}, {}, {}",
                    xy(op.y),
                    reg(op.reg_dst),
                    reg(op.reg_lhs),
                    reg(op.reg_rhs),
                    reg(op.reg_op3)
                )
            } else {
                format!(
                    "smulw{}{cond} {}, {}, {}",
                    xy(op.y),
                    reg(op.reg_dst),
                    reg(op.reg_lhs),
                    reg(op.reg_rhs)
                )
            }
        }
        ArmInstruction::SignedHalfwordMultiplyLong(op) => {
            format!(
                "smlal{}{}{cond} {}, {}, {}, {}",
                xy(op.x),
                xy(op.y),
                reg(op.reg_dst_lo),
                reg(op.reg_dst_hi),
                reg(op.reg_lhs),
                reg(op.reg_rhs)
            )
        }
    }
}
