//! IR dump: human-readable text output for micro-blocks and ops.

use std::fmt::Write;

use crate::block::{BasicBlock, MicroBlock};
use crate::opcode::{MemAccess, Op};
use crate::value::{GuestReg, Value, VarIdx};

fn fmt_var(idx: VarIdx, buf: &mut String) {
    let i = idx.0;
    write!(buf, "v{i}").unwrap();
}

fn fmt_value(value: Value, buf: &mut String) {
    match value {
        Value::Var(v) => fmt_var(v, buf),
        Value::Const(c) => {
            let v = c.value;
            write!(buf, "#0x{v:x}").unwrap();
        }
    }
}

fn fmt_guest_reg(reg: GuestReg, buf: &mut String) {
    let r = reg.reg;
    let mode = reg.mode.name();
    write!(buf, "r{r}.{mode}").unwrap();
}

fn mem_suffix(access: MemAccess) -> &'static str {
    match (access.size(), access.is_signed()) {
        (MemAccess::SIZE_8, false) => "b",
        (MemAccess::SIZE_8, true) => "sb",
        (MemAccess::SIZE_16, false) => "h",
        (MemAccess::SIZE_16, true) => "sh",
        _ => "w",
    }
}

/// Format a single op as one line of text.
pub fn fmt_op(op: &Op) -> String {
    let mut buf = String::new();
    let name = op.opcode().def().name;
    buf.push_str(name);
    if op.updates_host_flags() && !matches!(op, Op::SetCarry { .. }) {
        buf.push_str(".s");
    }
    if let Op::LoadMem { access, .. } | Op::StoreMem { access, .. } = op {
        buf.push('.');
        buf.push_str(mem_suffix(*access));
    }
    if let Op::Mul { signed, .. } = op {
        buf.push('.');
        buf.push(if *signed { 's' } else { 'u' });
    }
    buf.push(' ');

    match *op {
        Op::LoadGpr { result, reg } => {
            fmt_var(result, &mut buf);
            buf.push_str(", ");
            fmt_guest_reg(reg, &mut buf);
        }
        Op::StoreGpr { reg, value } => {
            fmt_guest_reg(reg, &mut buf);
            buf.push_str(", ");
            fmt_value(value, &mut buf);
        }
        Op::LoadCpsr { result } => fmt_var(result, &mut buf),
        Op::StoreCpsr { value } => fmt_value(value, &mut buf),
        Op::LoadSpsr { result, mode } => {
            fmt_var(result, &mut buf);
            buf.push_str(", spsr.");
            buf.push_str(mode.name());
        }
        Op::StoreSpsr { value, mode } => {
            buf.push_str("spsr.");
            buf.push_str(mode.name());
            buf.push_str(", ");
            fmt_value(value, &mut buf);
        }
        Op::SetCarry { cpsr } => fmt_value(cpsr, &mut buf),
        Op::Shift {
            result,
            operand,
            amount,
            ..
        } => {
            fmt_var(result, &mut buf);
            buf.push_str(", ");
            fmt_var(operand, &mut buf);
            buf.push_str(", ");
            fmt_value(amount, &mut buf);
        }
        Op::Alu {
            result, lhs, rhs, ..
        } => {
            if let Some(r) = result {
                fmt_var(r, &mut buf);
                buf.push_str(", ");
            }
            fmt_var(lhs, &mut buf);
            buf.push_str(", ");
            fmt_value(rhs, &mut buf);
        }
        Op::Mov { result, value, .. } | Op::Mvn { result, value, .. } => {
            fmt_var(result, &mut buf);
            buf.push_str(", ");
            fmt_value(value, &mut buf);
        }
        Op::Clz { result, operand } => {
            fmt_var(result, &mut buf);
            buf.push_str(", ");
            fmt_var(operand, &mut buf);
        }
        Op::Qadd { result, lhs, rhs }
        | Op::Qsub { result, lhs, rhs }
        | Op::AddQ { result, lhs, rhs } => {
            fmt_var(result, &mut buf);
            buf.push_str(", ");
            fmt_var(lhs, &mut buf);
            buf.push_str(", ");
            fmt_var(rhs, &mut buf);
        }
        Op::Mul {
            result_lo,
            result_hi,
            lhs,
            rhs,
            ..
        } => {
            if let Some(hi) = result_hi {
                fmt_var(hi, &mut buf);
                buf.push(':');
            }
            fmt_var(result_lo, &mut buf);
            buf.push_str(", ");
            fmt_var(lhs, &mut buf);
            buf.push_str(", ");
            fmt_var(rhs, &mut buf);
        }
        Op::AddLong {
            result_lo,
            result_hi,
            lhs_lo,
            lhs_hi,
            rhs_lo,
            rhs_hi,
            ..
        } => {
            fmt_var(result_hi, &mut buf);
            buf.push(':');
            fmt_var(result_lo, &mut buf);
            buf.push_str(", ");
            fmt_var(lhs_hi, &mut buf);
            buf.push(':');
            fmt_var(lhs_lo, &mut buf);
            buf.push_str(", ");
            fmt_var(rhs_hi, &mut buf);
            buf.push(':');
            fmt_var(rhs_lo, &mut buf);
        }
        Op::LoadMem {
            result, address, ..
        } => {
            fmt_var(result, &mut buf);
            buf.push_str(", [");
            fmt_var(address, &mut buf);
            buf.push(']');
        }
        Op::StoreMem { value, address, .. } => {
            buf.push('[');
            fmt_var(address, &mut buf);
            buf.push_str("], ");
            fmt_value(value, &mut buf);
        }
        Op::UpdateNzcv { result, input }
        | Op::UpdateNzc { result, input }
        | Op::UpdateNz { result, input }
        | Op::UpdateQ { result, input } => {
            fmt_var(result, &mut buf);
            buf.push_str(", ");
            fmt_var(input, &mut buf);
        }
    }
    buf
}

/// Dump one micro-block: condition header plus one op per line.
pub fn dump_micro_block(mb: &MicroBlock) -> String {
    let mut buf = String::new();
    let cond = mb.condition.name();
    if cond.is_empty() {
        buf.push_str("[always]\n");
    } else {
        writeln!(buf, "[{cond}]").unwrap();
    }
    for op in mb.emitter.code() {
        writeln!(buf, "  {}", fmt_op(op)).unwrap();
    }
    buf
}

/// Dump a whole basic block.
pub fn dump_block(block: &BasicBlock) -> String {
    let mut buf = String::new();
    let addr = block.key.address();
    let mode = block.key.mode().name();
    writeln!(buf, "block 0x{addr:08x}.{mode}:").unwrap();
    for mb in &block.micro_blocks {
        buf.push_str(&dump_micro_block(mb));
    }
    if !block.branch_target.is_none() {
        let t = block.branch_target.address();
        writeln!(buf, "  -> 0x{t:08x}").unwrap();
    }
    buf
}
