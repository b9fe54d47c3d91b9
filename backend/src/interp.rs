//! Reference backend: interprets micro-block IR directly against
//! guest state.
//!
//! Host flags are modeled as an explicit NZCVQ record that lives for
//! one micro-block execution, which realizes the IR contract exactly:
//! carry is the guest's (not-borrow on subtraction), bitwise ops set
//! N/Z and leave C/V, and the sticky saturation flag accumulates
//! until `UpdateQ` folds it.

use armjit_core::block::{BasicBlock, MicroBlock};
use armjit_core::memory::{Bus, Memory};
use armjit_core::opcode::{AluOp, MemAccess, Op};
use armjit_core::state::{PsrFlags, State, StatusRegister};
use armjit_core::types::ShiftType;
use armjit_core::value::Value;

use crate::{verify, Backend, CompileError};

/// IR interpreter backend. `compile` runs the verifier; `call` walks
/// the block's micro-blocks, gating each on its condition.
#[derive(Debug, Default)]
pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for Interpreter {
    fn compile(&mut self, block: &mut BasicBlock) -> Result<(), CompileError> {
        verify::check_block(block)?;
        block.compiled = true;
        Ok(())
    }

    fn call(
        &mut self,
        block: &BasicBlock,
        state: &mut State,
        memory: &mut dyn Memory,
        cycles: i32,
    ) -> i32 {
        debug_assert!(block.compiled, "call on uncompiled block");
        for mb in &block.micro_blocks {
            if mb.condition.passed(state.cpsr()) {
                run_micro_block(mb, state, memory);
            }
        }
        cycles - block.num_instructions as i32
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct HostFlags {
    n: bool,
    z: bool,
    c: bool,
    v: bool,
    /// Sticky saturation, set by Qadd/Qsub and never cleared within a
    /// micro-block.
    q: bool,
}

fn run_micro_block(mb: &MicroBlock, state: &mut State, memory: &mut dyn Memory) {
    let emitter = &mb.emitter;
    let mut vals = vec![0u32; emitter.num_vars()];
    let mut flags = HostFlags::default();

    let val = |vals: &[u32], v: Value| -> u32 {
        match v {
            Value::Var(idx) => vals[idx.0 as usize],
            Value::Const(c) => c.value,
        }
    };

    for op in emitter.code() {
        match *op {
            Op::LoadGpr { result, reg } => {
                vals[result.0 as usize] = state.gpr(reg.mode, reg.reg);
            }
            Op::StoreGpr { reg, value } => {
                state.set_gpr(reg.mode, reg.reg, val(&vals, value));
            }
            Op::LoadCpsr { result } => {
                vals[result.0 as usize] = state.cpsr().raw();
            }
            Op::StoreCpsr { value } => {
                state.set_cpsr(StatusRegister::from_raw(val(&vals, value)));
            }
            Op::LoadSpsr { result, mode } => {
                vals[result.0 as usize] = state.spsr(mode).raw();
            }
            Op::StoreSpsr { value, mode } => {
                state.set_spsr(
                    mode,
                    StatusRegister::from_raw(val(&vals, value)),
                );
            }
            Op::SetCarry { cpsr } => {
                flags.c = val(&vals, cpsr) & PsrFlags::C.bits() != 0;
            }
            Op::Shift {
                kind,
                result,
                operand,
                amount,
                update_host_flags,
            } => {
                let value = vals[operand.0 as usize];
                let (res, carry) = match amount {
                    Value::Const(c) => {
                        barrel_const(kind, value, c.value, flags.c)
                    }
                    Value::Var(idx) => barrel_reg(
                        kind,
                        value,
                        vals[idx.0 as usize] & 0xFF,
                        flags.c,
                    ),
                };
                vals[result.0 as usize] = res;
                if update_host_flags {
                    if let Some(c) = carry {
                        flags.c = c;
                    }
                }
            }
            Op::Alu {
                op,
                result,
                lhs,
                rhs,
                update_host_flags,
            } => {
                let a = vals[lhs.0 as usize];
                let b = val(&vals, rhs);
                let carry_in = flags.c as u32;
                let (res, c, v) = match op {
                    AluOp::And => logical(a & b),
                    AluOp::Bic => logical(a & !b),
                    AluOp::Eor => logical(a ^ b),
                    AluOp::Orr => logical(a | b),
                    AluOp::Add => adder(a, b, 0),
                    AluOp::Adc => adder(a, b, carry_in),
                    AluOp::Sub => adder(a, !b, 1),
                    AluOp::Sbc => adder(a, !b, carry_in),
                    AluOp::Rsb => adder(b, !a, 1),
                    AluOp::Rsc => adder(b, !a, carry_in),
                };
                if update_host_flags {
                    flags.n = res >> 31 != 0;
                    flags.z = res == 0;
                    if !op.is_logical() {
                        flags.c = c;
                        flags.v = v;
                    }
                }
                if let Some(r) = result {
                    vals[r.0 as usize] = res;
                }
            }
            Op::Mov {
                result,
                value,
                update_host_flags,
            } => {
                let res = val(&vals, value);
                vals[result.0 as usize] = res;
                if update_host_flags {
                    flags.n = res >> 31 != 0;
                    flags.z = res == 0;
                }
            }
            Op::Mvn {
                result,
                value,
                update_host_flags,
            } => {
                let res = !val(&vals, value);
                vals[result.0 as usize] = res;
                if update_host_flags {
                    flags.n = res >> 31 != 0;
                    flags.z = res == 0;
                }
            }
            Op::Clz { result, operand } => {
                vals[result.0 as usize] =
                    vals[operand.0 as usize].leading_zeros();
            }
            Op::Qadd { result, lhs, rhs } => {
                let a = vals[lhs.0 as usize] as i32;
                let b = vals[rhs.0 as usize] as i32;
                let (res, sat) = saturating(a as i64 + b as i64);
                vals[result.0 as usize] = res;
                flags.q |= sat;
            }
            Op::Qsub { result, lhs, rhs } => {
                let a = vals[lhs.0 as usize] as i32;
                let b = vals[rhs.0 as usize] as i32;
                let (res, sat) = saturating(a as i64 - b as i64);
                vals[result.0 as usize] = res;
                flags.q |= sat;
            }
            Op::AddQ { result, lhs, rhs } => {
                let a = vals[lhs.0 as usize];
                let b = vals[rhs.0 as usize];
                let res = a.wrapping_add(b);
                vals[result.0 as usize] = res;
                flags.q |= ((a ^ res) & (b ^ res)) >> 31 != 0;
            }
            Op::Mul {
                result_lo,
                result_hi,
                lhs,
                rhs,
                signed,
                update_host_flags,
            } => {
                let a = vals[lhs.0 as usize];
                let b = vals[rhs.0 as usize];
                let product = if signed {
                    (a as i32 as i64).wrapping_mul(b as i32 as i64) as u64
                } else {
                    (a as u64).wrapping_mul(b as u64)
                };
                vals[result_lo.0 as usize] = product as u32;
                if let Some(hi) = result_hi {
                    vals[hi.0 as usize] = (product >> 32) as u32;
                }
                if update_host_flags {
                    if result_hi.is_some() {
                        flags.n = product >> 63 != 0;
                        flags.z = product == 0;
                    } else {
                        flags.n = product as u32 >> 31 != 0;
                        flags.z = product as u32 == 0;
                    }
                }
            }
            Op::AddLong {
                result_lo,
                result_hi,
                lhs_lo,
                lhs_hi,
                rhs_lo,
                rhs_hi,
                update_host_flags,
            } => {
                let a = (vals[lhs_hi.0 as usize] as u64) << 32
                    | vals[lhs_lo.0 as usize] as u64;
                let b = (vals[rhs_hi.0 as usize] as u64) << 32
                    | vals[rhs_lo.0 as usize] as u64;
                let sum = a.wrapping_add(b);
                vals[result_lo.0 as usize] = sum as u32;
                vals[result_hi.0 as usize] = (sum >> 32) as u32;
                if update_host_flags {
                    flags.n = sum >> 63 != 0;
                    flags.z = sum == 0;
                }
            }
            Op::LoadMem {
                result,
                address,
                access,
            } => {
                let addr = vals[address.0 as usize];
                vals[result.0 as usize] = load(memory, addr, access);
            }
            Op::StoreMem {
                value,
                address,
                access,
            } => {
                let addr = vals[address.0 as usize];
                store(memory, addr, val(&vals, value), access);
            }
            Op::UpdateNzcv { result, input } => {
                vals[result.0 as usize] =
                    fold(vals[input.0 as usize], &flags, true, true);
            }
            Op::UpdateNzc { result, input } => {
                vals[result.0 as usize] =
                    fold(vals[input.0 as usize], &flags, true, false);
            }
            Op::UpdateNz { result, input } => {
                vals[result.0 as usize] =
                    fold(vals[input.0 as usize], &flags, false, false);
            }
            Op::UpdateQ { result, input } => {
                let mut out = vals[input.0 as usize];
                if flags.q {
                    out |= PsrFlags::Q.bits();
                }
                vals[result.0 as usize] = out;
            }
        }
    }
}

/// Bitwise results carry no C/V of their own.
fn logical(res: u32) -> (u32, bool, bool) {
    (res, false, false)
}

/// Full adder over `a + b + carry_in` with guest carry/overflow.
/// Subtraction goes through here as `a + !b + borrow`, which makes
/// the carry the guest's not-borrow.
fn adder(a: u32, b: u32, carry_in: u32) -> (u32, bool, bool) {
    let wide = a as u64 + b as u64 + carry_in as u64;
    let res = wide as u32;
    let carry = wide >> 32 != 0;
    let overflow = ((a ^ res) & (b ^ res)) >> 31 != 0;
    (res, carry, overflow)
}

fn saturating(wide: i64) -> (u32, bool) {
    if wide > i32::MAX as i64 {
        (i32::MAX as u32, true)
    } else if wide < i32::MIN as i64 {
        (i32::MIN as u32, true)
    } else {
        (wide as u32, false)
    }
}

/// Immediate-amount barrel shift. Returns the result and the carry
/// out (`None` leaves the carry untouched). `Ror` by 0 is RRX.
fn barrel_const(
    kind: ShiftType,
    value: u32,
    amount: u32,
    carry_in: bool,
) -> (u32, Option<bool>) {
    match kind {
        ShiftType::Lsl => match amount {
            0 => (value, None),
            1..=31 => {
                (value << amount, Some(value >> (32 - amount) & 1 != 0))
            }
            32 => (0, Some(value & 1 != 0)),
            _ => (0, Some(false)),
        },
        ShiftType::Lsr => match amount {
            0 => (value, None),
            1..=31 => (value >> amount, Some(value >> (amount - 1) & 1 != 0)),
            32 => (0, Some(value >> 31 != 0)),
            _ => (0, Some(false)),
        },
        ShiftType::Asr => match amount {
            0 => (value, None),
            1..=31 => (
                ((value as i32) >> amount) as u32,
                Some(value >> (amount - 1) & 1 != 0),
            ),
            _ => {
                let fill = ((value as i32) >> 31) as u32;
                (fill, Some(value >> 31 != 0))
            }
        },
        ShiftType::Ror => {
            if amount == 0 {
                // RRX
                let res = (carry_in as u32) << 31 | value >> 1;
                (res, Some(value & 1 != 0))
            } else {
                let res = value.rotate_right(amount & 31);
                (res, Some(res >> 31 != 0))
            }
        }
    }
}

/// Register-amount barrel shift: the low byte of the register counts,
/// and 0 leaves both the value and the carry untouched.
fn barrel_reg(
    kind: ShiftType,
    value: u32,
    amount: u32,
    carry_in: bool,
) -> (u32, Option<bool>) {
    if amount == 0 {
        return (value, None);
    }
    if kind == ShiftType::Ror {
        let res = value.rotate_right(amount & 31);
        return (res, Some(res >> 31 != 0));
    }
    barrel_const(kind, value, amount, carry_in)
}

/// ARM7 data bus behavior: word and halfword loads rotate unaligned
/// data; a signed halfword load at an odd address degrades to a
/// signed byte load.
fn load(memory: &mut dyn Memory, addr: u32, access: MemAccess) -> u32 {
    match (access.size(), access.is_signed()) {
        (MemAccess::SIZE_8, false) => {
            memory.read_u8(addr, Bus::Data) as u32
        }
        (MemAccess::SIZE_8, true) => {
            memory.read_u8(addr, Bus::Data) as i8 as i32 as u32
        }
        (MemAccess::SIZE_16, false) => {
            let half = memory.read_u16(addr & !1, Bus::Data) as u32;
            half.rotate_right(8 * (addr & 1))
        }
        (MemAccess::SIZE_16, true) => {
            if addr & 1 != 0 {
                memory.read_u8(addr, Bus::Data) as i8 as i32 as u32
            } else {
                memory.read_u16(addr, Bus::Data) as i16 as i32 as u32
            }
        }
        _ => {
            let word = memory.read_u32(addr & !3, Bus::Data);
            word.rotate_right(8 * (addr & 3))
        }
    }
}

fn store(memory: &mut dyn Memory, addr: u32, value: u32, access: MemAccess) {
    match access.size() {
        MemAccess::SIZE_8 => memory.write_u8(addr, value as u8, Bus::Data),
        MemAccess::SIZE_16 => {
            memory.write_u16(addr & !1, value as u16, Bus::Data)
        }
        _ => memory.write_u32(addr & !3, value, Bus::Data),
    }
}

/// Build a CPSR value from `input` with N/Z (and optionally C, V)
/// replaced by the host flags.
fn fold(input: u32, flags: &HostFlags, with_c: bool, with_v: bool) -> u32 {
    let mut mask = PsrFlags::N | PsrFlags::Z;
    let mut set = PsrFlags::empty();
    if flags.n {
        set |= PsrFlags::N;
    }
    if flags.z {
        set |= PsrFlags::Z;
    }
    if with_c {
        mask |= PsrFlags::C;
        if flags.c {
            set |= PsrFlags::C;
        }
    }
    if with_v {
        mask |= PsrFlags::V;
        if flags.v {
            set |= PsrFlags::V;
        }
    }
    (input & !mask.bits()) | set.bits()
}
