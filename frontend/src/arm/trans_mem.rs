//! Translation of the load/store families: single data transfer,
//! halfword/signed transfer, block data transfer and swap.

use armjit_core::emitter::Emitter;
use armjit_core::opcode::MemAccess;
use armjit_core::state::{Mode, REG_PC};
use armjit_core::types::{Condition, DataType};
use armjit_core::value::{GuestReg, Value};

use super::insn::*;
use super::trans::{BlockBuilder, Step};

impl BlockBuilder<'_> {
    pub(super) fn single_data_transfer(
        &mut self,
        op: SingleDataTransfer,
    ) -> Step {
        let pc_dst = op.load && op.reg_dst == REG_PC;
        if pc_dst && op.condition != Condition::Al {
            self.store_fallthrough_pc();
        }

        let mut e = Emitter::new();
        let base = self.read_gpr(&mut e, op.reg_base);
        let offset: Value = if op.immediate {
            Value::imm(op.offset_imm)
        } else {
            let r = self.read_gpr(&mut e, op.offset_reg.reg);
            self.shift_by_imm_no_flags(
                &mut e,
                r,
                op.offset_reg.shift,
                op.offset_reg.amount,
            )
        };

        let indexed = self.add_offset(&mut e, base, offset, op.add);
        let addr_val = if op.pre_increment { indexed } else { base };
        let addr = self.to_var(&mut e, addr_val, "addr");

        let access = if op.byte {
            MemAccess::byte()
        } else {
            MemAccess::word()
        };

        // Post-indexing always writes the base back; pre-indexing only
        // with the W bit. Base r15 writeback is unpredictable and
        // skipped.
        let writeback =
            (!op.pre_increment || op.writeback) && op.reg_base != REG_PC;

        let mut terminate = pc_dst;
        if op.load {
            let data = e.create_var(DataType::UInt32, Some("data"));
            e.load_mem(data, addr, access);
            if writeback {
                self.write_gpr(&mut e, op.reg_base, indexed);
            }
            // Destination store comes last: on writeback with
            // dst == base, the loaded value wins.
            terminate |= self.write_gpr(&mut e, op.reg_dst, Value::Var(data));
        } else {
            let value = if op.reg_dst == REG_PC {
                // Stored r15 reads two words ahead of the visible PC.
                Value::imm(self.address.wrapping_add(12))
            } else {
                self.read_gpr(&mut e, op.reg_dst)
            };
            e.store_mem(value, addr, access);
            if writeback {
                self.write_gpr(&mut e, op.reg_base, indexed);
            }
        }

        self.push(op.condition, e);
        if terminate {
            Step::Terminate
        } else {
            Step::Advance
        }
    }

    pub(super) fn halfword_signed_transfer(
        &mut self,
        op: HalfwordSignedTransfer,
    ) -> Step {
        // Store forms of the signed rows are LDRD/STRD territory and
        // stay untranslated.
        if !op.load && op.opcode != 1 {
            return Step::Refuse;
        }

        let pc_dst = op.load && op.reg_dst == REG_PC;
        if pc_dst && op.condition != Condition::Al {
            self.store_fallthrough_pc();
        }

        let mut e = Emitter::new();
        let base = self.read_gpr(&mut e, op.reg_base);
        let offset: Value = if op.immediate {
            Value::imm(op.offset_imm)
        } else {
            self.read_gpr(&mut e, op.offset_reg)
        };

        let indexed = self.add_offset(&mut e, base, offset, op.add);
        let addr_val = if op.pre_increment { indexed } else { base };
        let addr = self.to_var(&mut e, addr_val, "addr");

        let writeback =
            (!op.pre_increment || op.writeback) && op.reg_base != REG_PC;

        let mut terminate = pc_dst;
        if op.load {
            let access = match op.opcode {
                1 => MemAccess::half(),
                2 => MemAccess::signed_byte(),
                _ => MemAccess::signed_half(),
            };
            let data = e.create_var(DataType::UInt32, Some("data"));
            e.load_mem(data, addr, access);
            if writeback {
                self.write_gpr(&mut e, op.reg_base, indexed);
            }
            terminate |= self.write_gpr(&mut e, op.reg_dst, Value::Var(data));
        } else {
            let value = if op.reg_dst == REG_PC {
                Value::imm(self.address.wrapping_add(12))
            } else {
                self.read_gpr(&mut e, op.reg_dst)
            };
            e.store_mem(value, addr, MemAccess::half());
            if writeback {
                self.write_gpr(&mut e, op.reg_base, indexed);
            }
        }

        self.push(op.condition, e);
        if terminate {
            Step::Terminate
        } else {
            Step::Advance
        }
    }

    pub(super) fn block_data_transfer(
        &mut self,
        op: BlockDataTransfer,
    ) -> Step {
        let list = op.reg_list;
        // An empty list transfers r15 only and moves the base by 0x40
        // (ARM7 behavior for an unpredictable encoding).
        let empty = list == 0;
        let pc_in_list = empty || list & 0x8000 != 0;
        let pc_dst = op.load && pc_in_list;
        if pc_dst && op.condition != Condition::Al {
            self.store_fallthrough_pc();
        }

        let mut e = Emitter::new();
        let base_val = self.read_gpr(&mut e, op.reg_base);
        let base = self.to_var(&mut e, base_val, "base");

        let regs: Vec<u8> = if empty {
            vec![REG_PC]
        } else {
            (0u8..16).filter(|r| list & (1 << r) != 0).collect()
        };
        let size: u32 = if empty { 0x40 } else { 4 * regs.len() as u32 };

        // Transfers run from the lowest address upwards regardless of
        // direction; only the base offset differs.
        let start: i32 = match (op.add, op.pre_increment) {
            (true, false) => 0,
            (true, true) => 4,
            (false, false) => 4 - size as i32,
            (false, true) => -(size as i32),
        };

        // LDM with the base in the list keeps the loaded value.
        let writeback = op.writeback
            && op.reg_base != REG_PC
            && !(op.load && !empty && list & (1 << op.reg_base) != 0);
        // S bit: user-bank transfer, unless this is LDM with r15
        // (which restores CPSR from SPSR instead).
        let user_bank = op.user_mode && !pc_dst;
        let bank_mode = if user_bank { Mode::User } else { self.mode };

        let mut terminate = false;
        for (i, &r) in regs.iter().enumerate() {
            let rel = start.wrapping_add(4 * i as i32) as u32;
            let a = e.create_var(DataType::UInt32, Some("addr"));
            e.add(Some(a), base, Value::imm(rel), false);

            if op.load {
                let data = e.create_var(DataType::UInt32, None);
                e.load_mem(data, a, MemAccess::word());
                if r == REG_PC {
                    if op.user_mode {
                        let spsr =
                            e.create_var(DataType::UInt32, Some("spsr"));
                        e.load_spsr(self.mode, spsr);
                        e.store_cpsr(spsr);
                    }
                    self.write_gpr(&mut e, REG_PC, Value::Var(data));
                    terminate = true;
                } else {
                    e.store_gpr(GuestReg::new(bank_mode, r), data);
                }
            } else {
                let value: Value = if r == REG_PC {
                    Value::imm(self.address.wrapping_add(12))
                } else {
                    let v = e.create_var(DataType::UInt32, None);
                    e.load_gpr(GuestReg::new(bank_mode, r), v);
                    Value::Var(v)
                };
                e.store_mem(value, a, MemAccess::word());
            }
        }

        if writeback {
            let delta = if op.add { size } else { size.wrapping_neg() };
            let wb = e.create_var(DataType::UInt32, Some("wb"));
            e.add(Some(wb), base, Value::imm(delta), false);
            e.store_gpr(self.gpr(op.reg_base), wb);
        }

        self.push(op.condition, e);
        if terminate {
            Step::Terminate
        } else {
            Step::Advance
        }
    }

    pub(super) fn single_data_swap(&mut self, op: SingleDataSwap) -> Step {
        let pc_dst = op.reg_dst == REG_PC;
        if pc_dst && op.condition != Condition::Al {
            self.store_fallthrough_pc();
        }

        let mut e = Emitter::new();
        let base = self.read_gpr(&mut e, op.reg_base);
        let addr = self.to_var(&mut e, base, "addr");
        let access = if op.byte {
            MemAccess::byte()
        } else {
            MemAccess::word()
        };

        let old = e.create_var(DataType::UInt32, Some("old"));
        e.load_mem(old, addr, access);
        let src = if op.reg_src == REG_PC {
            Value::imm(self.address.wrapping_add(12))
        } else {
            self.read_gpr(&mut e, op.reg_src)
        };
        e.store_mem(src, addr, access);
        let terminate = self.write_gpr(&mut e, op.reg_dst, Value::Var(old));

        self.push(op.condition, e);
        if terminate {
            Step::Terminate
        } else {
            Step::Advance
        }
    }
}
