//! Translation of multiplies, saturating arithmetic and CLZ.

use armjit_core::emitter::Emitter;
use armjit_core::state::REG_PC;
use armjit_core::types::{Condition, DataType};
use armjit_core::value::{Value, VarIdx};

use super::insn::*;
use super::trans::{BlockBuilder, Step};

/// Sign-extend halfword `top`/`bottom` of `src` into a fresh variable.
fn half(
    e: &mut Emitter,
    src: VarIdx,
    top: bool,
    label: &'static str,
) -> VarIdx {
    if top {
        let t = e.create_var(DataType::UInt32, Some(label));
        e.asr(t, src, Value::imm(16), false);
        t
    } else {
        let shifted = e.create_var(DataType::UInt32, None);
        e.lsl(shifted, src, Value::imm(16), false);
        let t = e.create_var(DataType::UInt32, Some(label));
        e.asr(t, shifted, Value::imm(16), false);
        t
    }
}

impl BlockBuilder<'_> {
    pub(super) fn multiply(&mut self, op: Multiply) -> Step {
        let pc_dst = op.reg_dst == REG_PC;
        if pc_dst && op.condition != Condition::Al {
            self.store_fallthrough_pc();
        }

        let mut e = Emitter::new();
        let lhs = self.read_gpr(&mut e, op.reg_op1);
        let lhs = self.to_var(&mut e, lhs, "lhs");
        let rhs = self.read_gpr(&mut e, op.reg_op2);
        let rhs = self.to_var(&mut e, rhs, "rhs");

        let product = e.create_var(DataType::UInt32, Some("product"));
        let result = if op.accumulate {
            e.mul(product, None, lhs, rhs, false, false);
            let acc = self.read_gpr(&mut e, op.reg_op3);
            let acc = self.to_var(&mut e, acc, "acc");
            let sum = e.create_var(DataType::UInt32, Some("result"));
            e.add(Some(sum), product, acc, op.set_flags);
            sum
        } else {
            e.mul(product, None, lhs, rhs, false, op.set_flags);
            product
        };

        // MUL/MLA leave carry and overflow alone.
        if op.set_flags {
            self.emit_update_nz(&mut e);
        }
        let terminate = self.write_gpr(&mut e, op.reg_dst, Value::Var(result));

        self.push(op.condition, e);
        if terminate {
            Step::Terminate
        } else {
            Step::Advance
        }
    }

    pub(super) fn multiply_long(&mut self, op: MultiplyLong) -> Step {
        let pc_dst = op.reg_dst_lo == REG_PC || op.reg_dst_hi == REG_PC;
        if pc_dst && op.condition != Condition::Al {
            self.store_fallthrough_pc();
        }

        let mut e = Emitter::new();
        let lhs = self.read_gpr(&mut e, op.reg_op1);
        let lhs = self.to_var(&mut e, lhs, "lhs");
        let rhs = self.read_gpr(&mut e, op.reg_op2);
        let rhs = self.to_var(&mut e, rhs, "rhs");

        let lo = e.create_var(DataType::UInt32, Some("lo"));
        let hi = e.create_var(DataType::UInt32, Some("hi"));
        let (res_lo, res_hi) = if op.accumulate {
            e.mul(lo, Some(hi), lhs, rhs, op.sign_extend, false);
            let acc_lo = self.read_gpr(&mut e, op.reg_dst_lo);
            let acc_lo = self.to_var(&mut e, acc_lo, "acc_lo");
            let acc_hi = self.read_gpr(&mut e, op.reg_dst_hi);
            let acc_hi = self.to_var(&mut e, acc_hi, "acc_hi");
            let sum_lo = e.create_var(DataType::UInt32, Some("sum_lo"));
            let sum_hi = e.create_var(DataType::UInt32, Some("sum_hi"));
            e.add_long(sum_lo, sum_hi, lo, hi, acc_lo, acc_hi, op.set_flags);
            (sum_lo, sum_hi)
        } else {
            e.mul(lo, Some(hi), lhs, rhs, op.sign_extend, op.set_flags);
            (lo, hi)
        };

        if op.set_flags {
            self.emit_update_nz(&mut e);
        }
        let mut terminate =
            self.write_gpr(&mut e, op.reg_dst_lo, Value::Var(res_lo));
        terminate |= self.write_gpr(&mut e, op.reg_dst_hi, Value::Var(res_hi));

        self.push(op.condition, e);
        if terminate {
            Step::Terminate
        } else {
            Step::Advance
        }
    }

    pub(super) fn signed_halfword_multiply(
        &mut self,
        op: SignedHalfwordMultiply,
    ) -> Step {
        let pc_dst = op.reg_dst == REG_PC;
        if pc_dst && op.condition != Condition::Al {
            self.store_fallthrough_pc();
        }

        let mut e = Emitter::new();
        let lhs = self.read_gpr(&mut e, op.reg_lhs);
        let lhs = self.to_var(&mut e, lhs, "lhs");
        let rhs = self.read_gpr(&mut e, op.reg_rhs);
        let rhs = self.to_var(&mut e, rhs, "rhs");
        let a = half(&mut e, lhs, op.x, "lhs16");
        let b = half(&mut e, rhs, op.y, "rhs16");

        let product = e.create_var(DataType::UInt32, Some("product"));
        let result = if op.accumulate {
            e.mul(product, None, a, b, true, false);
            let acc = self.read_gpr(&mut e, op.reg_op3);
            let acc = self.to_var(&mut e, acc, "acc");
            let sum = e.create_var(DataType::UInt32, Some("result"));
            // Accumulate overflow raises Q without saturating.
            e.add_q(sum, product, acc);
            self.emit_update_q(&mut e);
            sum
        } else {
            e.mul(product, None, a, b, true, false);
            product
        };

        let terminate = self.write_gpr(&mut e, op.reg_dst, Value::Var(result));
        self.push(op.condition, e);
        if terminate {
            Step::Terminate
        } else {
            Step::Advance
        }
    }

    pub(super) fn signed_word_halfword_multiply(
        &mut self,
        op: SignedWordHalfwordMultiply,
    ) -> Step {
        let pc_dst = op.reg_dst == REG_PC;
        if pc_dst && op.condition != Condition::Al {
            self.store_fallthrough_pc();
        }

        let mut e = Emitter::new();
        let lhs = self.read_gpr(&mut e, op.reg_lhs);
        let lhs = self.to_var(&mut e, lhs, "lhs");
        let rhs = self.read_gpr(&mut e, op.reg_rhs);
        let rhs = self.to_var(&mut e, rhs, "rhs");
        let b = half(&mut e, rhs, op.y, "rhs16");

        // (lhs * sext16(rhs half)) >> 16, keeping the low 32 bits of
        // the 48-bit product.
        let lo = e.create_var(DataType::UInt32, Some("lo"));
        let hi = e.create_var(DataType::UInt32, Some("hi"));
        e.mul(lo, Some(hi), lhs, b, true, false);
        let lo_part = e.create_var(DataType::UInt32, None);
        e.lsr(lo_part, lo, Value::imm(16), false);
        let hi_part = e.create_var(DataType::UInt32, None);
        e.lsl(hi_part, hi, Value::imm(16), false);
        let product = e.create_var(DataType::UInt32, Some("product"));
        e.orr(Some(product), lo_part, Value::Var(hi_part), false);

        let result = if op.accumulate {
            let acc = self.read_gpr(&mut e, op.reg_op3);
            let acc = self.to_var(&mut e, acc, "acc");
            let sum = e.create_var(DataType::UInt32, Some("result"));
            // Accumulate overflow raises Q without saturating.
            e.add_q(sum, product, acc);
            self.emit_update_q(&mut e);
            sum
        } else {
            product
        };

        let terminate = self.write_gpr(&mut e, op.reg_dst, Value::Var(result));
        self.push(op.condition, e);
        if terminate {
            Step::Terminate
        } else {
            Step::Advance
        }
    }

    pub(super) fn signed_halfword_multiply_long(
        &mut self,
        op: SignedHalfwordMultiplyLong,
    ) -> Step {
        let pc_dst = op.reg_dst_lo == REG_PC || op.reg_dst_hi == REG_PC;
        if pc_dst && op.condition != Condition::Al {
            self.store_fallthrough_pc();
        }

        let mut e = Emitter::new();
        let lhs = self.read_gpr(&mut e, op.reg_lhs);
        let lhs = self.to_var(&mut e, lhs, "lhs");
        let rhs = self.read_gpr(&mut e, op.reg_rhs);
        let rhs = self.to_var(&mut e, rhs, "rhs");
        let a = half(&mut e, lhs, op.x, "lhs16");
        let b = half(&mut e, rhs, op.y, "rhs16");

        // 32-bit product sign-extended to 64, added into RdHi:RdLo.
        let product = e.create_var(DataType::UInt32, Some("product"));
        e.mul(product, None, a, b, true, false);
        let sign = e.create_var(DataType::UInt32, Some("sign"));
        e.asr(sign, product, Value::imm(31), false);

        let acc_lo = self.read_gpr(&mut e, op.reg_dst_lo);
        let acc_lo = self.to_var(&mut e, acc_lo, "acc_lo");
        let acc_hi = self.read_gpr(&mut e, op.reg_dst_hi);
        let acc_hi = self.to_var(&mut e, acc_hi, "acc_hi");
        let sum_lo = e.create_var(DataType::UInt32, Some("sum_lo"));
        let sum_hi = e.create_var(DataType::UInt32, Some("sum_hi"));
        e.add_long(sum_lo, sum_hi, product, sign, acc_lo, acc_hi, false);

        let mut terminate =
            self.write_gpr(&mut e, op.reg_dst_lo, Value::Var(sum_lo));
        terminate |= self.write_gpr(&mut e, op.reg_dst_hi, Value::Var(sum_hi));

        self.push(op.condition, e);
        if terminate {
            Step::Terminate
        } else {
            Step::Advance
        }
    }

    pub(super) fn saturating_add_sub(&mut self, op: SaturatingAddSub) -> Step {
        let pc_dst = op.reg_dst == REG_PC;
        if pc_dst && op.condition != Condition::Al {
            self.store_fallthrough_pc();
        }

        let mut e = Emitter::new();
        let lhs = self.read_gpr(&mut e, op.reg_lhs);
        let lhs = self.to_var(&mut e, lhs, "lhs");
        let rhs = self.read_gpr(&mut e, op.reg_rhs);
        let rhs = self.to_var(&mut e, rhs, "rhs");

        // QD forms saturate the doubling as well; the sticky flag
        // accumulates across both ops and is folded once.
        let rhs = if op.double_rhs {
            let doubled = e.create_var(DataType::UInt32, Some("doubled"));
            e.qadd(doubled, rhs, rhs);
            doubled
        } else {
            rhs
        };

        let result = e.create_var(DataType::UInt32, Some("result"));
        if op.subtract {
            e.qsub(result, lhs, rhs);
        } else {
            e.qadd(result, lhs, rhs);
        }
        self.emit_update_q(&mut e);

        let terminate = self.write_gpr(&mut e, op.reg_dst, Value::Var(result));
        self.push(op.condition, e);
        if terminate {
            Step::Terminate
        } else {
            Step::Advance
        }
    }

    pub(super) fn count_leading_zeros(
        &mut self,
        op: CountLeadingZeros,
    ) -> Step {
        let pc_dst = op.reg_dst == REG_PC;
        if pc_dst && op.condition != Condition::Al {
            self.store_fallthrough_pc();
        }

        let mut e = Emitter::new();
        let src = self.read_gpr(&mut e, op.reg_src);
        let src = self.to_var(&mut e, src, "src");
        let result = e.create_var(DataType::UInt32, Some("result"));
        e.clz(result, src);
        let terminate = self.write_gpr(&mut e, op.reg_dst, Value::Var(result));

        self.push(op.condition, e);
        if terminate {
            Step::Terminate
        } else {
            Step::Advance
        }
    }
}
