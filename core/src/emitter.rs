//! Append-only IR emitter for one micro-block.
//!
//! The emitter owns the op buffer and the variable pool. It performs
//! no optimization; ordering is program order and is significant only
//! between ops that alias guest state or consume each other's
//! variables.

use crate::opcode::{AluOp, MemAccess, Op};
use crate::state::Mode;
use crate::types::{DataType, ShiftType};
use crate::value::{GuestReg, Value, VarIdx, Variable};

#[derive(Debug, Clone, Default)]
pub struct Emitter {
    code: Vec<Op>,
    vars: Vec<Variable>,
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            code: Vec::with_capacity(16),
            vars: Vec::with_capacity(8),
        }
    }

    pub fn code(&self) -> &[Op] {
        &self.code
    }

    pub fn vars(&self) -> &[Variable] {
        &self.vars
    }

    pub fn var(&self, idx: VarIdx) -> &Variable {
        &self.vars[idx.0 as usize]
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn push(&mut self, op: Op) {
        self.code.push(op);
    }

    /// Keep only the ops `keep` accepts, preserving order. Used by
    /// optimization passes; the variable pool is left untouched
    /// (unreferenced variables are harmless).
    pub fn retain_ops(&mut self, keep: impl FnMut(&Op) -> bool) {
        self.code.retain(keep);
    }

    /// Allocate a fresh SSA variable. The returned handle is usable as
    /// the output of exactly one subsequent op.
    pub fn create_var(
        &mut self,
        ty: DataType,
        label: Option<&'static str>,
    ) -> VarIdx {
        let idx = VarIdx(self.vars.len() as u32);
        self.vars.push(Variable { idx, ty, label });
        idx
    }

    // -- Guest state --

    pub fn load_gpr(&mut self, reg: GuestReg, result: VarIdx) {
        self.push(Op::LoadGpr { result, reg });
    }

    /// Write `value` into a guest register. Writes to r15 store the
    /// literal value; the pipeline adjustment is the caller's job.
    pub fn store_gpr(&mut self, reg: GuestReg, value: impl Into<Value>) {
        self.push(Op::StoreGpr {
            reg,
            value: value.into(),
        });
    }

    pub fn load_cpsr(&mut self, result: VarIdx) {
        self.push(Op::LoadCpsr { result });
    }

    pub fn store_cpsr(&mut self, value: impl Into<Value>) {
        self.push(Op::StoreCpsr {
            value: value.into(),
        });
    }

    pub fn load_spsr(&mut self, mode: Mode, result: VarIdx) {
        self.push(Op::LoadSpsr { result, mode });
    }

    pub fn store_spsr(&mut self, mode: Mode, value: impl Into<Value>) {
        self.push(Op::StoreSpsr {
            value: value.into(),
            mode,
        });
    }

    pub fn set_carry(&mut self, cpsr: impl Into<Value>) {
        self.push(Op::SetCarry { cpsr: cpsr.into() });
    }

    // -- Shifts --

    pub fn shift(
        &mut self,
        kind: ShiftType,
        result: VarIdx,
        operand: VarIdx,
        amount: impl Into<Value>,
        update_host_flags: bool,
    ) {
        self.push(Op::Shift {
            kind,
            result,
            operand,
            amount: amount.into(),
            update_host_flags,
        });
    }

    pub fn lsl(
        &mut self,
        result: VarIdx,
        operand: VarIdx,
        amount: impl Into<Value>,
        update_host_flags: bool,
    ) {
        self.shift(ShiftType::Lsl, result, operand, amount, update_host_flags);
    }

    pub fn lsr(
        &mut self,
        result: VarIdx,
        operand: VarIdx,
        amount: impl Into<Value>,
        update_host_flags: bool,
    ) {
        self.shift(ShiftType::Lsr, result, operand, amount, update_host_flags);
    }

    pub fn asr(
        &mut self,
        result: VarIdx,
        operand: VarIdx,
        amount: impl Into<Value>,
        update_host_flags: bool,
    ) {
        self.shift(ShiftType::Asr, result, operand, amount, update_host_flags);
    }

    pub fn ror(
        &mut self,
        result: VarIdx,
        operand: VarIdx,
        amount: impl Into<Value>,
        update_host_flags: bool,
    ) {
        self.shift(ShiftType::Ror, result, operand, amount, update_host_flags);
    }

    // -- ALU --

    pub fn alu(
        &mut self,
        op: AluOp,
        result: Option<VarIdx>,
        lhs: VarIdx,
        rhs: impl Into<Value>,
        update_host_flags: bool,
    ) {
        self.push(Op::Alu {
            op,
            result,
            lhs,
            rhs: rhs.into(),
            update_host_flags,
        });
    }

    pub fn and(
        &mut self,
        result: Option<VarIdx>,
        lhs: VarIdx,
        rhs: impl Into<Value>,
        update_host_flags: bool,
    ) {
        self.alu(AluOp::And, result, lhs, rhs, update_host_flags);
    }

    pub fn bic(
        &mut self,
        result: Option<VarIdx>,
        lhs: VarIdx,
        rhs: impl Into<Value>,
        update_host_flags: bool,
    ) {
        self.alu(AluOp::Bic, result, lhs, rhs, update_host_flags);
    }

    pub fn eor(
        &mut self,
        result: Option<VarIdx>,
        lhs: VarIdx,
        rhs: impl Into<Value>,
        update_host_flags: bool,
    ) {
        self.alu(AluOp::Eor, result, lhs, rhs, update_host_flags);
    }

    pub fn sub(
        &mut self,
        result: Option<VarIdx>,
        lhs: VarIdx,
        rhs: impl Into<Value>,
        update_host_flags: bool,
    ) {
        self.alu(AluOp::Sub, result, lhs, rhs, update_host_flags);
    }

    pub fn rsb(
        &mut self,
        result: Option<VarIdx>,
        lhs: VarIdx,
        rhs: impl Into<Value>,
        update_host_flags: bool,
    ) {
        self.alu(AluOp::Rsb, result, lhs, rhs, update_host_flags);
    }

    pub fn add(
        &mut self,
        result: Option<VarIdx>,
        lhs: VarIdx,
        rhs: impl Into<Value>,
        update_host_flags: bool,
    ) {
        self.alu(AluOp::Add, result, lhs, rhs, update_host_flags);
    }

    pub fn adc(
        &mut self,
        result: Option<VarIdx>,
        lhs: VarIdx,
        rhs: impl Into<Value>,
        update_host_flags: bool,
    ) {
        self.alu(AluOp::Adc, result, lhs, rhs, update_host_flags);
    }

    pub fn sbc(
        &mut self,
        result: Option<VarIdx>,
        lhs: VarIdx,
        rhs: impl Into<Value>,
        update_host_flags: bool,
    ) {
        self.alu(AluOp::Sbc, result, lhs, rhs, update_host_flags);
    }

    pub fn rsc(
        &mut self,
        result: Option<VarIdx>,
        lhs: VarIdx,
        rhs: impl Into<Value>,
        update_host_flags: bool,
    ) {
        self.alu(AluOp::Rsc, result, lhs, rhs, update_host_flags);
    }

    pub fn orr(
        &mut self,
        result: Option<VarIdx>,
        lhs: VarIdx,
        rhs: impl Into<Value>,
        update_host_flags: bool,
    ) {
        self.alu(AluOp::Orr, result, lhs, rhs, update_host_flags);
    }

    pub fn mov(
        &mut self,
        result: VarIdx,
        value: impl Into<Value>,
        update_host_flags: bool,
    ) {
        self.push(Op::Mov {
            result,
            value: value.into(),
            update_host_flags,
        });
    }

    pub fn mvn(
        &mut self,
        result: VarIdx,
        value: impl Into<Value>,
        update_host_flags: bool,
    ) {
        self.push(Op::Mvn {
            result,
            value: value.into(),
            update_host_flags,
        });
    }

    // -- Specials --

    pub fn clz(&mut self, result: VarIdx, operand: VarIdx) {
        self.push(Op::Clz { result, operand });
    }

    pub fn qadd(&mut self, result: VarIdx, lhs: VarIdx, rhs: VarIdx) {
        self.push(Op::Qadd { result, lhs, rhs });
    }

    pub fn qsub(&mut self, result: VarIdx, lhs: VarIdx, rhs: VarIdx) {
        self.push(Op::Qsub { result, lhs, rhs });
    }

    pub fn add_q(&mut self, result: VarIdx, lhs: VarIdx, rhs: VarIdx) {
        self.push(Op::AddQ { result, lhs, rhs });
    }

    #[allow(clippy::too_many_arguments)]
    pub fn mul(
        &mut self,
        result_lo: VarIdx,
        result_hi: Option<VarIdx>,
        lhs: VarIdx,
        rhs: VarIdx,
        signed: bool,
        update_host_flags: bool,
    ) {
        self.push(Op::Mul {
            result_lo,
            result_hi,
            lhs,
            rhs,
            signed,
            update_host_flags,
        });
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_long(
        &mut self,
        result_lo: VarIdx,
        result_hi: VarIdx,
        lhs_lo: VarIdx,
        lhs_hi: VarIdx,
        rhs_lo: VarIdx,
        rhs_hi: VarIdx,
        update_host_flags: bool,
    ) {
        self.push(Op::AddLong {
            result_lo,
            result_hi,
            lhs_lo,
            lhs_hi,
            rhs_lo,
            rhs_hi,
            update_host_flags,
        });
    }

    // -- Memory --

    pub fn load_mem(
        &mut self,
        result: VarIdx,
        address: VarIdx,
        access: MemAccess,
    ) {
        self.push(Op::LoadMem {
            result,
            address,
            access,
        });
    }

    pub fn store_mem(
        &mut self,
        value: impl Into<Value>,
        address: VarIdx,
        access: MemAccess,
    ) {
        self.push(Op::StoreMem {
            value: value.into(),
            address,
            access,
        });
    }

    // -- Flag folds --

    pub fn update_nzcv(&mut self, result: VarIdx, input: VarIdx) {
        self.push(Op::UpdateNzcv { result, input });
    }

    pub fn update_nzc(&mut self, result: VarIdx, input: VarIdx) {
        self.push(Op::UpdateNzc { result, input });
    }

    pub fn update_nz(&mut self, result: VarIdx, input: VarIdx) {
        self.push(Op::UpdateNz { result, input });
    }

    pub fn update_q(&mut self, result: VarIdx, input: VarIdx) {
        self.push(Op::UpdateQ { result, input });
    }
}
