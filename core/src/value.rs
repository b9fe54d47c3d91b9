use crate::state::Mode;
use crate::types::DataType;

/// Index into a micro-block's variable pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarIdx(pub u32);

/// An SSA variable: defined by exactly one opcode in its owning
/// micro-block, read any number of times within it.
#[derive(Debug, Clone)]
pub struct Variable {
    pub idx: VarIdx,
    pub ty: DataType,
    /// Debug name shown in IR dumps (e.g. "base", "cpsr_in").
    pub label: Option<&'static str>,
}

/// A compile-time constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constant {
    pub ty: DataType,
    pub value: u32,
}

impl Constant {
    pub const fn u32(value: u32) -> Self {
        Self {
            ty: DataType::UInt32,
            value,
        }
    }
}

/// An opcode input: either a variable or a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Var(VarIdx),
    Const(Constant),
}

impl Value {
    pub const fn imm(value: u32) -> Self {
        Value::Const(Constant::u32(value))
    }

    pub const fn as_var(self) -> Option<VarIdx> {
        match self {
            Value::Var(v) => Some(v),
            Value::Const(_) => None,
        }
    }

    pub const fn as_const(self) -> Option<u32> {
        match self {
            Value::Var(_) => None,
            Value::Const(c) => Some(c.value),
        }
    }
}

impl From<VarIdx> for Value {
    fn from(v: VarIdx) -> Self {
        Value::Var(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::imm(v)
    }
}

impl From<Constant> for Value {
    fn from(c: Constant) -> Self {
        Value::Const(c)
    }
}

/// A guest register reference. The mode selects the physical bank the
/// logical index resolves to at execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuestReg {
    pub mode: Mode,
    pub reg: u8,
}

impl GuestReg {
    pub const fn new(mode: Mode, reg: u8) -> Self {
        Self { mode, reg }
    }
}
