//! IR operations.
//!
//! Each op has at most one pair of output variables, a fixed set of
//! input values, and an optional `update_host_flags` request. Host
//! flags follow the *guest's* conventions: N/Z from the result, carry
//! is not-borrow for subtraction, bitwise ops set N/Z and leave C and V
//! alone. The backend owns the mapping onto real host condition codes.

use crate::state::Mode;
use crate::types::ShiftType;
use crate::value::{GuestReg, Value, VarIdx};

/// ALU operations taking a left-hand variable and a right-hand value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluOp {
    And,
    Bic,
    Eor,
    Sub,
    Rsb,
    Add,
    Adc,
    Sbc,
    Rsc,
    Orr,
}

impl AluOp {
    /// Bitwise ops update N/Z only; arithmetic ops update N/Z/C/V.
    pub const fn is_logical(self) -> bool {
        matches!(self, AluOp::And | AluOp::Bic | AluOp::Eor | AluOp::Orr)
    }

    /// Whether the op consumes the host carry.
    pub const fn has_carry_in(self) -> bool {
        matches!(self, AluOp::Adc | AluOp::Sbc | AluOp::Rsc)
    }

    pub const fn name(self) -> &'static str {
        match self {
            AluOp::And => "and",
            AluOp::Bic => "bic",
            AluOp::Eor => "eor",
            AluOp::Sub => "sub",
            AluOp::Rsb => "rsb",
            AluOp::Add => "add",
            AluOp::Adc => "adc",
            AluOp::Sbc => "sbc",
            AluOp::Rsc => "rsc",
            AluOp::Orr => "orr",
        }
    }
}

/// Packed memory access descriptor: size in the low two bits plus a
/// sign-extension flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemAccess(u8);

impl MemAccess {
    pub const SIZE_8: u8 = 0;
    pub const SIZE_16: u8 = 1;
    pub const SIZE_32: u8 = 2;
    pub const SIGN: u8 = 1 << 2;

    pub const fn byte() -> Self {
        Self(Self::SIZE_8)
    }
    pub const fn signed_byte() -> Self {
        Self(Self::SIZE_8 | Self::SIGN)
    }
    pub const fn half() -> Self {
        Self(Self::SIZE_16)
    }
    pub const fn signed_half() -> Self {
        Self(Self::SIZE_16 | Self::SIGN)
    }
    pub const fn word() -> Self {
        Self(Self::SIZE_32)
    }

    pub const fn size(self) -> u8 {
        self.0 & 0x3
    }
    pub const fn size_bytes(self) -> u32 {
        1 << self.size()
    }
    pub const fn is_signed(self) -> bool {
        self.0 & Self::SIGN != 0
    }
}

/// A single IR operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    // -- Guest state access --
    LoadGpr {
        result: VarIdx,
        reg: GuestReg,
    },
    StoreGpr {
        reg: GuestReg,
        value: Value,
    },
    LoadCpsr {
        result: VarIdx,
    },
    StoreCpsr {
        value: Value,
    },
    LoadSpsr {
        result: VarIdx,
        mode: Mode,
    },
    StoreSpsr {
        value: Value,
        mode: Mode,
    },

    /// Load the host carry from bit 29 of a CPSR value. Seeds the
    /// carry for carry-consuming ALU ops and for shifter paths where
    /// the guest carry must pass through unchanged.
    SetCarry {
        cpsr: Value,
    },

    /// Barrel shift. Register amounts follow ARM shifter semantics
    /// (0 leaves operand and carry untouched, >= 32 saturates per
    /// shift kind). `Ror` with a constant amount of 0 is RRX and
    /// consumes the host carry. With `update_host_flags` the host
    /// carry holds the shifter carry-out afterwards.
    Shift {
        kind: ShiftType,
        result: VarIdx,
        operand: VarIdx,
        amount: Value,
        update_host_flags: bool,
    },

    /// ALU op; `result` is absent for the flag-only forms
    /// (CMP/CMN/TST/TEQ).
    Alu {
        op: AluOp,
        result: Option<VarIdx>,
        lhs: VarIdx,
        rhs: Value,
        update_host_flags: bool,
    },
    Mov {
        result: VarIdx,
        value: Value,
        update_host_flags: bool,
    },
    Mvn {
        result: VarIdx,
        value: Value,
        update_host_flags: bool,
    },

    Clz {
        result: VarIdx,
        operand: VarIdx,
    },

    /// Signed saturating add/sub; saturation raises the host sticky
    /// overflow picked up by `UpdateQ`.
    Qadd {
        result: VarIdx,
        lhs: VarIdx,
        rhs: VarIdx,
    },
    Qsub {
        result: VarIdx,
        lhs: VarIdx,
        rhs: VarIdx,
    },
    /// Wrapping signed add that raises the host sticky overflow on
    /// signed overflow, without saturating. The multiply-accumulate
    /// forms set Q this way.
    AddQ {
        result: VarIdx,
        lhs: VarIdx,
        rhs: VarIdx,
    },

    /// 32x32 multiply; `result_hi` selects a widening multiply. With
    /// `update_host_flags` N/Z reflect the full (64-bit when widening)
    /// result.
    Mul {
        result_lo: VarIdx,
        result_hi: Option<VarIdx>,
        lhs: VarIdx,
        rhs: VarIdx,
        signed: bool,
        update_host_flags: bool,
    },
    /// 64-bit add over lo/hi pairs, for the long accumulate forms.
    AddLong {
        result_lo: VarIdx,
        result_hi: VarIdx,
        lhs_lo: VarIdx,
        lhs_hi: VarIdx,
        rhs_lo: VarIdx,
        rhs_hi: VarIdx,
        update_host_flags: bool,
    },

    // -- Guest memory --
    LoadMem {
        result: VarIdx,
        address: VarIdx,
        access: MemAccess,
    },
    StoreMem {
        value: Value,
        address: VarIdx,
        access: MemAccess,
    },

    // -- Flag folds: new CPSR from host flags + input CPSR --
    UpdateNzcv {
        result: VarIdx,
        input: VarIdx,
    },
    UpdateNzc {
        result: VarIdx,
        input: VarIdx,
    },
    UpdateNz {
        result: VarIdx,
        input: VarIdx,
    },
    /// Fold the host sticky overflow into the Q bit.
    UpdateQ {
        result: VarIdx,
        input: VarIdx,
    },
}

/// Operation kinds, used for dump names and the definition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    LoadGpr = 0,
    StoreGpr,
    LoadCpsr,
    StoreCpsr,
    LoadSpsr,
    StoreSpsr,
    SetCarry,
    Lsl,
    Lsr,
    Asr,
    Ror,
    And,
    Bic,
    Eor,
    Sub,
    Rsb,
    Add,
    Adc,
    Sbc,
    Rsc,
    Orr,
    Mov,
    Mvn,
    Clz,
    Qadd,
    Qsub,
    AddQ,
    Mul,
    AddLong,
    LoadMem,
    StoreMem,
    UpdateNzcv,
    UpdateNzc,
    UpdateNz,
    UpdateQ,

    // Sentinel, must be last
    Count,
}

/// Static properties of an operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpFlags(u16);

impl OpFlags {
    pub const NONE: OpFlags = OpFlags(0);
    /// Reads guest registers or status registers.
    pub const GUEST_READ: OpFlags = OpFlags(0x01);
    /// Writes guest registers or status registers.
    pub const GUEST_WRITE: OpFlags = OpFlags(0x02);
    /// Touches guest memory.
    pub const MEMORY: OpFlags = OpFlags(0x04);
    /// May write host flags (with `update_host_flags`, or always).
    pub const FLAGS_OUT: OpFlags = OpFlags(0x08);
    /// May consume host flags.
    pub const FLAGS_IN: OpFlags = OpFlags(0x10);

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: OpFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Static definition of an operation kind.
#[derive(Debug, Clone, Copy)]
pub struct OpDef {
    pub name: &'static str,
    pub flags: OpFlags,
}

const fn f(a: OpFlags, b: OpFlags) -> OpFlags {
    OpFlags(a.bits() | b.bits())
}

const GR: OpFlags = OpFlags::GUEST_READ;
const GW: OpFlags = OpFlags::GUEST_WRITE;
const MEM: OpFlags = OpFlags::MEMORY;
const FO: OpFlags = OpFlags::FLAGS_OUT;
const FI: OpFlags = OpFlags::FLAGS_IN;
const N: OpFlags = OpFlags::NONE;

/// Definition table, indexed by `Opcode as usize`.
pub static OPCODE_DEFS: [OpDef; Opcode::Count as usize] = [
    OpDef { name: "ldgpr", flags: GR },
    OpDef { name: "stgpr", flags: GW },
    OpDef { name: "ldcpsr", flags: GR },
    OpDef { name: "stcpsr", flags: GW },
    OpDef { name: "ldspsr", flags: GR },
    OpDef { name: "stspsr", flags: GW },
    OpDef { name: "setc", flags: FO },
    OpDef { name: "lsl", flags: FO },
    OpDef { name: "lsr", flags: FO },
    OpDef { name: "asr", flags: FO },
    OpDef { name: "ror", flags: f(FO, FI) },
    OpDef { name: "and", flags: FO },
    OpDef { name: "bic", flags: FO },
    OpDef { name: "eor", flags: FO },
    OpDef { name: "sub", flags: FO },
    OpDef { name: "rsb", flags: FO },
    OpDef { name: "add", flags: FO },
    OpDef { name: "adc", flags: f(FO, FI) },
    OpDef { name: "sbc", flags: f(FO, FI) },
    OpDef { name: "rsc", flags: f(FO, FI) },
    OpDef { name: "orr", flags: FO },
    OpDef { name: "mov", flags: FO },
    OpDef { name: "mvn", flags: FO },
    OpDef { name: "clz", flags: N },
    OpDef { name: "qadd", flags: FO },
    OpDef { name: "qsub", flags: FO },
    OpDef { name: "addq", flags: FO },
    OpDef { name: "mul", flags: FO },
    OpDef { name: "addl", flags: FO },
    OpDef { name: "ldmem", flags: MEM },
    OpDef { name: "stmem", flags: MEM },
    OpDef { name: "nzcv", flags: FI },
    OpDef { name: "nzc", flags: FI },
    OpDef { name: "nz", flags: FI },
    OpDef { name: "qflag", flags: FI },
];

impl Opcode {
    pub fn def(self) -> &'static OpDef {
        &OPCODE_DEFS[self as usize]
    }
}

impl AluOp {
    const fn opcode(self) -> Opcode {
        match self {
            AluOp::And => Opcode::And,
            AluOp::Bic => Opcode::Bic,
            AluOp::Eor => Opcode::Eor,
            AluOp::Sub => Opcode::Sub,
            AluOp::Rsb => Opcode::Rsb,
            AluOp::Add => Opcode::Add,
            AluOp::Adc => Opcode::Adc,
            AluOp::Sbc => Opcode::Sbc,
            AluOp::Rsc => Opcode::Rsc,
            AluOp::Orr => Opcode::Orr,
        }
    }
}

impl Op {
    pub fn opcode(&self) -> Opcode {
        match self {
            Op::LoadGpr { .. } => Opcode::LoadGpr,
            Op::StoreGpr { .. } => Opcode::StoreGpr,
            Op::LoadCpsr { .. } => Opcode::LoadCpsr,
            Op::StoreCpsr { .. } => Opcode::StoreCpsr,
            Op::LoadSpsr { .. } => Opcode::LoadSpsr,
            Op::StoreSpsr { .. } => Opcode::StoreSpsr,
            Op::SetCarry { .. } => Opcode::SetCarry,
            Op::Shift { kind, .. } => match kind {
                ShiftType::Lsl => Opcode::Lsl,
                ShiftType::Lsr => Opcode::Lsr,
                ShiftType::Asr => Opcode::Asr,
                ShiftType::Ror => Opcode::Ror,
            },
            Op::Alu { op, .. } => op.opcode(),
            Op::Mov { .. } => Opcode::Mov,
            Op::Mvn { .. } => Opcode::Mvn,
            Op::Clz { .. } => Opcode::Clz,
            Op::Qadd { .. } => Opcode::Qadd,
            Op::Qsub { .. } => Opcode::Qsub,
            Op::AddQ { .. } => Opcode::AddQ,
            Op::Mul { .. } => Opcode::Mul,
            Op::AddLong { .. } => Opcode::AddLong,
            Op::LoadMem { .. } => Opcode::LoadMem,
            Op::StoreMem { .. } => Opcode::StoreMem,
            Op::UpdateNzcv { .. } => Opcode::UpdateNzcv,
            Op::UpdateNzc { .. } => Opcode::UpdateNzc,
            Op::UpdateNz { .. } => Opcode::UpdateNz,
            Op::UpdateQ { .. } => Opcode::UpdateQ,
        }
    }

    /// Visit every variable this op defines.
    pub fn for_each_def(&self, mut f: impl FnMut(VarIdx)) {
        match *self {
            Op::LoadGpr { result, .. }
            | Op::LoadCpsr { result }
            | Op::LoadSpsr { result, .. }
            | Op::Shift { result, .. }
            | Op::Mov { result, .. }
            | Op::Mvn { result, .. }
            | Op::Clz { result, .. }
            | Op::Qadd { result, .. }
            | Op::Qsub { result, .. }
            | Op::AddQ { result, .. }
            | Op::LoadMem { result, .. }
            | Op::UpdateNzcv { result, .. }
            | Op::UpdateNzc { result, .. }
            | Op::UpdateNz { result, .. }
            | Op::UpdateQ { result, .. } => f(result),
            Op::Alu { result, .. } => {
                if let Some(r) = result {
                    f(r);
                }
            }
            Op::Mul {
                result_lo,
                result_hi,
                ..
            } => {
                f(result_lo);
                if let Some(hi) = result_hi {
                    f(hi);
                }
            }
            Op::AddLong {
                result_lo,
                result_hi,
                ..
            } => {
                f(result_lo);
                f(result_hi);
            }
            Op::StoreGpr { .. }
            | Op::StoreCpsr { .. }
            | Op::StoreSpsr { .. }
            | Op::SetCarry { .. }
            | Op::StoreMem { .. } => {}
        }
    }

    /// Visit every variable this op reads.
    pub fn for_each_use(&self, mut f: impl FnMut(VarIdx)) {
        let mut val = |v: Value| {
            if let Value::Var(idx) = v {
                f(idx);
            }
        };
        match *self {
            Op::LoadGpr { .. } | Op::LoadCpsr { .. } | Op::LoadSpsr { .. } => {}
            Op::StoreGpr { value, .. }
            | Op::StoreCpsr { value }
            | Op::StoreSpsr { value, .. } => val(value),
            Op::SetCarry { cpsr } => val(cpsr),
            Op::Shift {
                operand, amount, ..
            } => {
                val(Value::Var(operand));
                val(amount);
            }
            Op::Alu { lhs, rhs, .. } => {
                val(Value::Var(lhs));
                val(rhs);
            }
            Op::Mov { value, .. } | Op::Mvn { value, .. } => val(value),
            Op::Clz { operand, .. } => val(Value::Var(operand)),
            Op::Qadd { lhs, rhs, .. }
            | Op::Qsub { lhs, rhs, .. }
            | Op::AddQ { lhs, rhs, .. } => {
                val(Value::Var(lhs));
                val(Value::Var(rhs));
            }
            Op::Mul { lhs, rhs, .. } => {
                val(Value::Var(lhs));
                val(Value::Var(rhs));
            }
            Op::AddLong {
                lhs_lo,
                lhs_hi,
                rhs_lo,
                rhs_hi,
                ..
            } => {
                val(Value::Var(lhs_lo));
                val(Value::Var(lhs_hi));
                val(Value::Var(rhs_lo));
                val(Value::Var(rhs_hi));
            }
            Op::LoadMem { address, .. } => val(Value::Var(address)),
            Op::StoreMem { value, address, .. } => {
                val(value);
                val(Value::Var(address));
            }
            Op::UpdateNzcv { input, .. }
            | Op::UpdateNzc { input, .. }
            | Op::UpdateNz { input, .. }
            | Op::UpdateQ { input, .. } => val(Value::Var(input)),
        }
    }

    /// Whether this op requested a host flag update.
    pub fn updates_host_flags(&self) -> bool {
        match *self {
            Op::Shift {
                update_host_flags, ..
            }
            | Op::Alu {
                update_host_flags, ..
            }
            | Op::Mov {
                update_host_flags, ..
            }
            | Op::Mvn {
                update_host_flags, ..
            }
            | Op::Mul {
                update_host_flags, ..
            }
            | Op::AddLong {
                update_host_flags, ..
            } => update_host_flags,
            Op::SetCarry { .. }
            | Op::Qadd { .. }
            | Op::Qsub { .. }
            | Op::AddQ { .. } => true,
            _ => false,
        }
    }

    /// Whether the op has effects beyond its result variables. Such
    /// ops are roots for dead code elimination: guest state writes,
    /// memory accesses (device reads included) and host flag updates.
    pub fn has_side_effects(&self) -> bool {
        let flags = self.opcode().def().flags;
        flags.contains(OpFlags::GUEST_WRITE)
            || flags.contains(OpFlags::MEMORY)
            || self.updates_host_flags()
    }
}
