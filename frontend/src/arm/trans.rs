//! ARM to IR translation.
//!
//! The translator drives the decoder over one basic block, emitting
//! one micro-block per guest instruction. Guest-visible effects of a
//! conditional micro-block are gated on its condition by the backend;
//! conditional block-enders are preceded by an unconditional
//! fall-through PC store so the not-taken path resumes correctly.

use armjit_core::block::{BasicBlock, BlockKey, MicroBlock};
use armjit_core::emitter::Emitter;
use armjit_core::memory::Memory;
use armjit_core::opcode::AluOp;
use armjit_core::state::{Mode, PsrFlags, REG_LR, REG_PC};
use armjit_core::types::{Condition, DataType, ShiftType};
use armjit_core::value::{GuestReg, Value, VarIdx};

use super::decode::{decode_arm, DecodeSink};
use super::insn::*;

/// Maximum guest instructions per basic block.
pub const MAX_BLOCK_INSNS: u32 = 32;

/// Outcome of translating one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Step {
    /// Fall through to the next instruction.
    Advance,
    /// The instruction ends the basic block.
    Terminate,
    /// Untranslatable; the block must not include this instruction.
    Refuse,
}

/// Where the guest carry lives after resolving a shifter operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ShifterCarry {
    /// The CPSR carry is untouched.
    Unchanged,
    /// The host carry holds the shifter carry-out.
    HostCarry,
}

/// Drives decoding of guest instructions and populates a basic
/// block's IR.
pub struct Translator {
    exception_base: u32,
    mode: Mode,
}

impl Translator {
    pub fn new(exception_base: u32) -> Self {
        Self {
            exception_base,
            mode: Mode::Supervisor,
        }
    }

    /// Translate the block named by its key, reading instruction words
    /// through the memory's code path. Returns `false` when the block
    /// cannot be translated at all (Thumb, or an undefined or
    /// unsupported first instruction).
    pub fn translate(
        &mut self,
        block: &mut BasicBlock,
        memory: &mut dyn Memory,
    ) -> bool {
        let key = block.key;
        if key.thumb() || key.address() & 1 != 0 {
            log::trace!(
                "refusing thumb-mode block at {:#010x}",
                key.address()
            );
            return false;
        }
        self.mode = key.mode();

        let mut builder = BlockBuilder {
            block,
            mode: self.mode,
            address: key.address() & !3,
            exception_base: self.exception_base,
        };

        loop {
            let word = memory.fast_read_code_u32(builder.address);
            match decode_arm(word, &mut builder) {
                Step::Advance => {
                    builder.block.num_instructions += 1;
                    builder.address = builder.address.wrapping_add(4);
                    if builder.block.num_instructions >= MAX_BLOCK_INSNS {
                        builder.end_at_current();
                        break;
                    }
                }
                Step::Terminate => {
                    builder.block.num_instructions += 1;
                    break;
                }
                Step::Refuse => {
                    if builder.block.num_instructions == 0 {
                        log::trace!(
                            "refusing block at {:#010x}: word {:#010x}",
                            key.address(),
                            word
                        );
                        return false;
                    }
                    // End the block before the offending instruction;
                    // re-entry at its address refuses on its own.
                    builder.end_at_current();
                    break;
                }
            }
        }
        true
    }
}

pub(super) struct BlockBuilder<'a> {
    pub(super) block: &'a mut BasicBlock,
    pub(super) mode: Mode,
    /// Address of the instruction currently being translated.
    pub(super) address: u32,
    pub(super) exception_base: u32,
}

impl BlockBuilder<'_> {
    /// The PC value the current instruction observes (address + 8).
    pub(super) fn pc_visible(&self) -> u32 {
        self.address.wrapping_add(8)
    }

    pub(super) fn gpr(&self, reg: u8) -> GuestReg {
        GuestReg::new(self.mode, reg)
    }

    pub(super) fn push(&mut self, condition: Condition, emitter: Emitter) {
        self.block.micro_blocks.push(MicroBlock { condition, emitter });
    }

    /// Unconditional PC store preceding a conditional block ender, so
    /// the not-taken path resumes at the next instruction.
    pub(super) fn store_fallthrough_pc(&mut self) {
        let mut e = Emitter::new();
        e.store_gpr(
            self.gpr(REG_PC),
            Value::imm(self.address.wrapping_add(4 + 8)),
        );
        self.push(Condition::Al, e);
    }

    /// End the block before the instruction at the current address
    /// (instruction limit reached, or a refusal past the first
    /// instruction).
    pub(super) fn end_at_current(&mut self) {
        let mut e = Emitter::new();
        e.store_gpr(self.gpr(REG_PC), Value::imm(self.pc_visible()));
        self.push(Condition::Al, e);
        self.block.branch_target =
            BlockKey::new(self.address, self.mode, false);
    }

    pub(super) fn read_gpr(&self, e: &mut Emitter, reg: u8) -> Value {
        self.read_gpr_with(e, reg, 8)
    }

    /// Read a guest register; r15 resolves at translation time to the
    /// visible PC (`pc_offset` is 12 for the register-shift operand
    /// quirk and for stored r15).
    pub(super) fn read_gpr_with(
        &self,
        e: &mut Emitter,
        reg: u8,
        pc_offset: u32,
    ) -> Value {
        if reg == REG_PC {
            Value::imm(self.address.wrapping_add(pc_offset))
        } else {
            let v = e.create_var(DataType::UInt32, None);
            e.load_gpr(self.gpr(reg), v);
            Value::Var(v)
        }
    }

    /// Materialize a value into a variable (for ops that require a
    /// variable operand).
    pub(super) fn to_var(
        &self,
        e: &mut Emitter,
        value: Value,
        label: &'static str,
    ) -> VarIdx {
        match value {
            Value::Var(v) => v,
            Value::Const(_) => {
                let v = e.create_var(DataType::UInt32, Some(label));
                e.mov(v, value, false);
                v
            }
        }
    }

    /// Write a guest register. Writes to r15 apply the pipeline offset
    /// and report a block boundary.
    pub(super) fn write_gpr(
        &self,
        e: &mut Emitter,
        reg: u8,
        value: Value,
    ) -> bool {
        if reg == REG_PC {
            let adjusted = match value {
                Value::Const(c) => Value::imm(c.value.wrapping_add(8)),
                Value::Var(v) => {
                    let pc = e.create_var(DataType::UInt32, Some("pc"));
                    e.add(Some(pc), v, Value::imm(8), false);
                    Value::Var(pc)
                }
            };
            e.store_gpr(self.gpr(REG_PC), adjusted);
            true
        } else {
            e.store_gpr(self.gpr(reg), value);
            false
        }
    }

    /// `base ± offset`, folded when both sides are constants.
    pub(super) fn add_offset(
        &self,
        e: &mut Emitter,
        base: Value,
        offset: Value,
        add: bool,
    ) -> Value {
        if let (Some(b), Some(o)) = (base.as_const(), offset.as_const()) {
            let v = if add {
                b.wrapping_add(o)
            } else {
                b.wrapping_sub(o)
            };
            return Value::imm(v);
        }
        let lhs = self.to_var(e, base, "base");
        let result = e.create_var(DataType::UInt32, Some("indexed"));
        let op = if add { AluOp::Add } else { AluOp::Sub };
        e.alu(op, Some(result), lhs, offset, false);
        Value::Var(result)
    }

    // -- Flag folds (load CPSR, fold host flags, store CPSR) --

    pub(super) fn emit_update_nzcv(&self, e: &mut Emitter) {
        let cpsr_in = e.create_var(DataType::UInt32, Some("cpsr_in"));
        let cpsr_out = e.create_var(DataType::UInt32, Some("cpsr_out"));
        e.load_cpsr(cpsr_in);
        e.update_nzcv(cpsr_out, cpsr_in);
        e.store_cpsr(cpsr_out);
    }

    pub(super) fn emit_update_nzc(&self, e: &mut Emitter) {
        let cpsr_in = e.create_var(DataType::UInt32, Some("cpsr_in"));
        let cpsr_out = e.create_var(DataType::UInt32, Some("cpsr_out"));
        e.load_cpsr(cpsr_in);
        e.update_nzc(cpsr_out, cpsr_in);
        e.store_cpsr(cpsr_out);
    }

    pub(super) fn emit_update_nz(&self, e: &mut Emitter) {
        let cpsr_in = e.create_var(DataType::UInt32, Some("cpsr_in"));
        let cpsr_out = e.create_var(DataType::UInt32, Some("cpsr_out"));
        e.load_cpsr(cpsr_in);
        e.update_nz(cpsr_out, cpsr_in);
        e.store_cpsr(cpsr_out);
    }

    pub(super) fn emit_update_q(&self, e: &mut Emitter) {
        let cpsr_in = e.create_var(DataType::UInt32, Some("cpsr_in"));
        let cpsr_out = e.create_var(DataType::UInt32, Some("cpsr_out"));
        e.load_cpsr(cpsr_in);
        e.update_q(cpsr_out, cpsr_in);
        e.store_cpsr(cpsr_out);
    }

    /// Resolve a shifted register operand outside data processing
    /// (single data transfer offsets). Never updates the guest carry.
    pub(super) fn shift_by_imm_no_flags(
        &self,
        e: &mut Emitter,
        reg_value: Value,
        kind: ShiftType,
        amount: u8,
    ) -> Value {
        if kind == ShiftType::Lsl && amount == 0 {
            return reg_value;
        }
        let operand = self.to_var(e, reg_value, "offset");
        let result = e.create_var(DataType::UInt32, Some("shifted"));
        match (kind, amount) {
            (ShiftType::Ror, 0) => {
                // RRX: rotate through the guest carry.
                let cpsr = e.create_var(DataType::UInt32, Some("cpsr"));
                e.load_cpsr(cpsr);
                e.set_carry(cpsr);
                e.ror(result, operand, Value::imm(0), false);
            }
            (ShiftType::Lsr, 0) | (ShiftType::Asr, 0) => {
                // Amount 0 encodes a shift by 32.
                e.shift(kind, result, operand, Value::imm(32), false);
            }
            _ => {
                e.shift(kind, result, operand, Value::imm(amount as u32), false);
            }
        }
        Value::Var(result)
    }

    /// Resolve data-processing operand 2, arranging for the host
    /// carry to hold the shifter carry-out when `want_carry` is set.
    pub(super) fn resolve_op2(
        &self,
        e: &mut Emitter,
        dp: &DataProcessing,
        want_carry: bool,
    ) -> (Value, ShifterCarry) {
        if dp.immediate {
            let value = dp.op2_imm.value.rotate_right(dp.op2_imm.shift);
            if want_carry && dp.op2_imm.shift != 0 {
                // Rotation carry-out is the result's top bit, known at
                // translation time.
                let carry = if value >> 31 != 0 {
                    PsrFlags::C.bits()
                } else {
                    0
                };
                e.set_carry(Value::imm(carry));
                return (Value::imm(value), ShifterCarry::HostCarry);
            }
            return (Value::imm(value), ShifterCarry::Unchanged);
        }

        let spec = dp.op2_reg.shift;
        let pc_off = if spec.immediate { 8 } else { 12 };
        let operand = self.read_gpr_with(e, dp.op2_reg.reg, pc_off);
        let carry_out = if want_carry {
            ShifterCarry::HostCarry
        } else {
            ShifterCarry::Unchanged
        };

        if spec.immediate {
            let amount = spec.amount_imm as u32;
            match (spec.kind, amount) {
                (ShiftType::Lsl, 0) => (operand, ShifterCarry::Unchanged),
                (ShiftType::Ror, 0) => {
                    // RRX consumes the guest carry.
                    let cpsr = e.create_var(DataType::UInt32, Some("cpsr"));
                    e.load_cpsr(cpsr);
                    e.set_carry(cpsr);
                    let var = self.to_var(e, operand, "op2");
                    let result =
                        e.create_var(DataType::UInt32, Some("shifted"));
                    e.ror(result, var, Value::imm(0), want_carry);
                    (Value::Var(result), carry_out)
                }
                _ => {
                    let effective = match (spec.kind, amount) {
                        (ShiftType::Lsr, 0) | (ShiftType::Asr, 0) => 32,
                        _ => amount,
                    };
                    let var = self.to_var(e, operand, "op2");
                    let result =
                        e.create_var(DataType::UInt32, Some("shifted"));
                    e.shift(
                        spec.kind,
                        result,
                        var,
                        Value::imm(effective),
                        want_carry,
                    );
                    (Value::Var(result), carry_out)
                }
            }
        } else {
            // Register-specified amount: only the low byte counts, and
            // an amount of 0 must leave the guest carry intact, so the
            // carry is seeded from the CPSR first.
            let amount = self.read_gpr_with(e, spec.amount_reg, 12);
            if want_carry {
                let cpsr = e.create_var(DataType::UInt32, Some("cpsr"));
                e.load_cpsr(cpsr);
                e.set_carry(cpsr);
            }
            let var = self.to_var(e, operand, "op2");
            let result = e.create_var(DataType::UInt32, Some("shifted"));
            e.shift(spec.kind, result, var, amount, want_carry);
            (Value::Var(result), carry_out)
        }
    }

    // -- Data processing --

    fn data_processing(&mut self, dp: DataProcessing) -> Step {
        let writes_dst = !dp.opcode.is_test();
        let pc_dst = writes_dst && dp.reg_dst == REG_PC;

        if pc_dst && dp.condition != Condition::Al {
            self.store_fallthrough_pc();
        }

        let mut e = Emitter::new();
        let set_host = dp.set_flags && !pc_dst;
        let want_carry = set_host && dp.opcode.is_logical();

        let (op2, shifter_carry) = self.resolve_op2(&mut e, &dp, want_carry);

        let result = if writes_dst {
            Some(e.create_var(DataType::UInt32, Some("result")))
        } else {
            None
        };

        match dp.opcode {
            DpOpcode::Mov => e.mov(result.unwrap(), op2, set_host),
            DpOpcode::Mvn => e.mvn(result.unwrap(), op2, set_host),
            _ => {
                let pc_off = if !dp.immediate && !dp.op2_reg.shift.immediate
                {
                    12
                } else {
                    8
                };
                let op1 = self.read_gpr_with(&mut e, dp.reg_op1, pc_off);
                let lhs = self.to_var(&mut e, op1, "op1");
                let alu = match dp.opcode {
                    DpOpcode::And => AluOp::And,
                    DpOpcode::Eor => AluOp::Eor,
                    DpOpcode::Sub => AluOp::Sub,
                    DpOpcode::Rsb => AluOp::Rsb,
                    DpOpcode::Add => AluOp::Add,
                    DpOpcode::Adc => AluOp::Adc,
                    DpOpcode::Sbc => AluOp::Sbc,
                    DpOpcode::Rsc => AluOp::Rsc,
                    DpOpcode::Tst => AluOp::And,
                    DpOpcode::Teq => AluOp::Eor,
                    DpOpcode::Cmp => AluOp::Sub,
                    DpOpcode::Cmn => AluOp::Add,
                    DpOpcode::Orr => AluOp::Orr,
                    DpOpcode::Bic => AluOp::Bic,
                    DpOpcode::Mov | DpOpcode::Mvn => unreachable!(),
                };
                if alu.has_carry_in() {
                    let cpsr = e.create_var(DataType::UInt32, Some("cpsr"));
                    e.load_cpsr(cpsr);
                    e.set_carry(cpsr);
                }
                e.alu(alu, result, lhs, op2, set_host);
            }
        }

        if set_host {
            if dp.opcode.is_logical() {
                match shifter_carry {
                    ShifterCarry::HostCarry => self.emit_update_nzc(&mut e),
                    ShifterCarry::Unchanged => self.emit_update_nz(&mut e),
                }
            } else {
                self.emit_update_nzcv(&mut e);
            }
        }

        let mut terminate = false;
        if pc_dst {
            if dp.set_flags {
                // Exception return: CPSR := SPSR of the current mode.
                let spsr = e.create_var(DataType::UInt32, Some("spsr"));
                e.load_spsr(self.mode, spsr);
                e.store_cpsr(spsr);
            }
            self.write_gpr(&mut e, REG_PC, Value::Var(result.unwrap()));
            terminate = true;
        } else if let Some(r) = result {
            self.write_gpr(&mut e, dp.reg_dst, Value::Var(r));
        }

        self.push(dp.condition, e);
        if terminate {
            Step::Terminate
        } else {
            Step::Advance
        }
    }

    // -- Branches --

    fn branch_relative(&mut self, b: BranchRelative) -> Step {
        let target = self.pc_visible().wrapping_add(b.offset as u32);

        if b.condition != Condition::Al {
            self.store_fallthrough_pc();
        }

        let mut e = Emitter::new();
        if b.link {
            e.store_gpr(
                self.gpr(REG_LR),
                Value::imm(self.address.wrapping_add(4)),
            );
        }
        if b.exchange {
            let cpsr = e.create_var(DataType::UInt32, Some("cpsr"));
            e.load_cpsr(cpsr);
            let cpsr_out = e.create_var(DataType::UInt32, Some("cpsr_out"));
            e.orr(Some(cpsr_out), cpsr, Value::imm(PsrFlags::T.bits()), false);
            e.store_cpsr(cpsr_out);
            // Thumb pipeline offset for the entered state; the next
            // block's key carries the Thumb bit and refuses.
            e.store_gpr(
                self.gpr(REG_PC),
                Value::imm(target.wrapping_add(4)),
            );
        } else {
            e.store_gpr(
                self.gpr(REG_PC),
                Value::imm(target.wrapping_add(8)),
            );
        }
        self.push(b.condition, e);

        if !b.exchange {
            self.block.branch_target =
                BlockKey::new(target, self.mode, false);
        }
        Step::Terminate
    }

    fn branch_exchange(&mut self, b: BranchExchange) -> Step {
        if b.condition != Condition::Al {
            self.store_fallthrough_pc();
        }

        let mut e = Emitter::new();
        let target = self.read_gpr(&mut e, b.reg);
        let target = self.to_var(&mut e, target, "target");
        if b.link {
            e.store_gpr(
                self.gpr(REG_LR),
                Value::imm(self.address.wrapping_add(4)),
            );
        }

        // T := target bit 0
        let t = e.create_var(DataType::UInt32, Some("tbit"));
        e.and(Some(t), target, Value::imm(1), false);
        let t_shifted = e.create_var(DataType::UInt32, None);
        e.lsl(t_shifted, t, Value::imm(5), false);
        let cpsr = e.create_var(DataType::UInt32, Some("cpsr"));
        e.load_cpsr(cpsr);
        let cleared = e.create_var(DataType::UInt32, None);
        e.bic(Some(cleared), cpsr, Value::imm(PsrFlags::T.bits()), false);
        let cpsr_out = e.create_var(DataType::UInt32, Some("cpsr_out"));
        e.orr(Some(cpsr_out), cleared, Value::Var(t_shifted), false);
        e.store_cpsr(cpsr_out);

        // PC := (target & !3) + 8 in ARM state, (target & !1) + 4 in
        // Thumb; the cleared bits are 3 - 2t and the offset 8 - 4t.
        // A Thumb target then refuses at the next block.
        let t2 = e.create_var(DataType::UInt32, None);
        e.lsl(t2, t, Value::imm(1), false);
        let clear = e.create_var(DataType::UInt32, None);
        e.rsb(Some(clear), t2, Value::imm(3), false);
        let masked = e.create_var(DataType::UInt32, None);
        e.bic(Some(masked), target, Value::Var(clear), false);
        let t4 = e.create_var(DataType::UInt32, None);
        e.lsl(t4, t, Value::imm(2), false);
        let offset = e.create_var(DataType::UInt32, None);
        e.rsb(Some(offset), t4, Value::imm(8), false);
        let pc = e.create_var(DataType::UInt32, Some("pc"));
        e.add(Some(pc), masked, Value::Var(offset), false);
        e.store_gpr(self.gpr(REG_PC), pc);

        self.push(b.condition, e);
        Step::Terminate
    }

    // -- Status register transfers --

    fn move_register_status(&mut self, op: MoveRegisterStatus) -> Step {
        let pc_dst = op.reg_dst == REG_PC;
        if pc_dst && op.condition != Condition::Al {
            self.store_fallthrough_pc();
        }

        let mut e = Emitter::new();
        let psr = e.create_var(DataType::UInt32, Some("psr"));
        if op.spsr {
            e.load_spsr(self.mode, psr);
        } else {
            e.load_cpsr(psr);
        }
        let terminate = self.write_gpr(&mut e, op.reg_dst, Value::Var(psr));
        self.push(op.condition, e);
        if terminate {
            Step::Terminate
        } else {
            Step::Advance
        }
    }

    fn move_status_register(&mut self, op: MoveStatusRegister) -> Step {
        let mut mask: u32 = 0;
        if op.fsxc & 1 != 0 {
            mask |= 0x0000_00FF;
        }
        if op.fsxc & 2 != 0 {
            mask |= 0x0000_FF00;
        }
        if op.fsxc & 4 != 0 {
            mask |= 0x00FF_0000;
        }
        if op.fsxc & 8 != 0 {
            mask |= 0xFF00_0000;
        }
        // User mode may only touch the flags byte.
        if self.mode == Mode::User {
            mask &= 0xFF00_0000;
        }

        // A control-byte CPSR write can change mode or state; the
        // block key no longer matches past this point.
        let control = !op.spsr && mask & 0xFF != 0;
        if control {
            self.store_fallthrough_pc();
        }

        let mut e = Emitter::new();
        let psr_in = e.create_var(DataType::UInt32, Some("psr_in"));
        if op.spsr {
            e.load_spsr(self.mode, psr_in);
        } else {
            e.load_cpsr(psr_in);
        }
        let cleared = e.create_var(DataType::UInt32, None);
        e.bic(Some(cleared), psr_in, Value::imm(mask), false);

        let value: Value = if op.immediate {
            Value::imm(op.imm & mask)
        } else {
            let v = self.read_gpr(&mut e, op.reg);
            let var = self.to_var(&mut e, v, "value");
            let masked = e.create_var(DataType::UInt32, None);
            e.and(Some(masked), var, Value::imm(mask), false);
            Value::Var(masked)
        };

        let psr_out = e.create_var(DataType::UInt32, Some("psr_out"));
        e.orr(Some(psr_out), cleared, value, false);
        if op.spsr {
            e.store_spsr(self.mode, psr_out);
        } else {
            e.store_cpsr(psr_out);
        }
        self.push(op.condition, e);

        if control {
            Step::Terminate
        } else {
            Step::Advance
        }
    }

    // -- Exceptions --

    fn exception(&mut self, op: Exception) -> Step {
        if op.condition != Condition::Al {
            self.store_fallthrough_pc();
        }
        let vector = self
            .exception_base
            .wrapping_add(op.exception.vector_offset());

        let mut e = Emitter::new();
        let cpsr = e.create_var(DataType::UInt32, Some("cpsr"));
        e.load_cpsr(cpsr);
        e.store_spsr(Mode::Supervisor, cpsr);
        // Enter Supervisor, mask IRQ, leave Thumb state.
        let cleared = e.create_var(DataType::UInt32, None);
        e.bic(
            Some(cleared),
            cpsr,
            Value::imm(0x1F | PsrFlags::T.bits()),
            false,
        );
        let cpsr_out = e.create_var(DataType::UInt32, Some("cpsr_out"));
        e.orr(
            Some(cpsr_out),
            cleared,
            Value::imm(Mode::Supervisor as u32 | PsrFlags::I.bits()),
            false,
        );
        e.store_cpsr(cpsr_out);
        // Return address is the next instruction.
        e.store_gpr(
            GuestReg::new(Mode::Supervisor, REG_LR),
            Value::imm(self.address.wrapping_add(4)),
        );
        e.store_gpr(
            GuestReg::new(Mode::Supervisor, REG_PC),
            Value::imm(vector.wrapping_add(8)),
        );
        self.push(op.condition, e);

        self.block.branch_target =
            BlockKey::new(vector, Mode::Supervisor, false);
        Step::Terminate
    }
}

impl DecodeSink for BlockBuilder<'_> {
    type Output = Step;

    fn data_processing(&mut self, op: DataProcessing) -> Step {
        BlockBuilder::data_processing(self, op)
    }

    fn move_status_register(&mut self, op: MoveStatusRegister) -> Step {
        BlockBuilder::move_status_register(self, op)
    }

    fn move_register_status(&mut self, op: MoveRegisterStatus) -> Step {
        BlockBuilder::move_register_status(self, op)
    }

    fn multiply(&mut self, op: Multiply) -> Step {
        BlockBuilder::multiply(self, op)
    }

    fn multiply_long(&mut self, op: MultiplyLong) -> Step {
        BlockBuilder::multiply_long(self, op)
    }

    fn single_data_swap(&mut self, op: SingleDataSwap) -> Step {
        BlockBuilder::single_data_swap(self, op)
    }

    fn branch_exchange(&mut self, op: BranchExchange) -> Step {
        BlockBuilder::branch_exchange(self, op)
    }

    fn halfword_signed_transfer(
        &mut self,
        op: HalfwordSignedTransfer,
    ) -> Step {
        BlockBuilder::halfword_signed_transfer(self, op)
    }

    fn single_data_transfer(&mut self, op: SingleDataTransfer) -> Step {
        BlockBuilder::single_data_transfer(self, op)
    }

    fn block_data_transfer(&mut self, op: BlockDataTransfer) -> Step {
        BlockBuilder::block_data_transfer(self, op)
    }

    fn branch_relative(&mut self, op: BranchRelative) -> Step {
        BlockBuilder::branch_relative(self, op)
    }

    fn coprocessor_register_transfer(
        &mut self,
        _op: CoprocessorRegisterTransfer,
    ) -> Step {
        // Coprocessor execution is not part of the core.
        Step::Refuse
    }

    fn exception(&mut self, op: Exception) -> Step {
        BlockBuilder::exception(self, op)
    }

    fn count_leading_zeros(&mut self, op: CountLeadingZeros) -> Step {
        BlockBuilder::count_leading_zeros(self, op)
    }

    fn saturating_add_sub(&mut self, op: SaturatingAddSub) -> Step {
        BlockBuilder::saturating_add_sub(self, op)
    }

    fn signed_halfword_multiply(
        &mut self,
        op: SignedHalfwordMultiply,
    ) -> Step {
        BlockBuilder::signed_halfword_multiply(self, op)
    }

    fn signed_word_halfword_multiply(
        &mut self,
        op: SignedWordHalfwordMultiply,
    ) -> Step {
        BlockBuilder::signed_word_halfword_multiply(self, op)
    }

    fn signed_halfword_multiply_long(
        &mut self,
        op: SignedHalfwordMultiplyLong,
    ) -> Step {
        BlockBuilder::signed_halfword_multiply_long(self, op)
    }

    fn undefined(&mut self, _word: u32) -> Step {
        Step::Refuse
    }
}
