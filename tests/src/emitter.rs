//! Emitter tests: variable allocation, append order and dump output.

use armjit_core::dump::{dump_micro_block, fmt_op};
use armjit_core::emitter::Emitter;
use armjit_core::opcode::Opcode;
use armjit_core::state::Mode;
use armjit_core::types::{Condition, DataType};
use armjit_core::value::{GuestReg, Value};
use armjit_core::MicroBlock;

#[test]
fn create_var_allocates_fresh_handles() {
    let mut e = Emitter::new();
    let a = e.create_var(DataType::UInt32, Some("a"));
    let b = e.create_var(DataType::UInt32, None);
    assert_ne!(a, b);
    assert_eq!(e.num_vars(), 2);
    assert_eq!(e.var(a).label, Some("a"));
    assert_eq!(e.var(b).label, None);
    assert_eq!(e.var(a).ty, DataType::UInt32);
}

#[test]
fn ops_are_appended_in_program_order() {
    let mut e = Emitter::new();
    let r0 = GuestReg::new(Mode::User, 0);
    let v = e.create_var(DataType::UInt32, None);
    let sum = e.create_var(DataType::UInt32, None);
    e.load_gpr(r0, v);
    e.add(Some(sum), v, Value::imm(1), false);
    e.store_gpr(r0, sum);

    let opcodes: Vec<Opcode> =
        e.code().iter().map(|op| op.opcode()).collect();
    assert_eq!(
        opcodes,
        vec![Opcode::LoadGpr, Opcode::Add, Opcode::StoreGpr]
    );
}

#[test]
fn flag_only_alu_forms_have_no_result() {
    let mut e = Emitter::new();
    let v = e.create_var(DataType::UInt32, None);
    e.load_gpr(GuestReg::new(Mode::User, 1), v);
    e.sub(None, v, Value::imm(0), true);

    let cmp = &e.code()[1];
    let mut defs = 0;
    cmp.for_each_def(|_| defs += 1);
    assert_eq!(defs, 0);
    assert!(cmp.updates_host_flags());
}

#[test]
fn dump_renders_ops_and_condition() {
    let mut mb = MicroBlock::new(Condition::Ne);
    let e = &mut mb.emitter;
    let v = e.create_var(DataType::UInt32, None);
    e.load_gpr(GuestReg::new(Mode::Supervisor, 3), v);
    let out = e.create_var(DataType::UInt32, None);
    e.add(Some(out), v, Value::imm(4), true);
    e.store_gpr(GuestReg::new(Mode::Supervisor, 3), out);

    let text = dump_micro_block(&mb);
    assert!(text.starts_with("[ne]\n"), "{text}");
    assert!(text.contains("ldgpr v0, r3.svc"), "{text}");
    assert!(text.contains("add.s v1, v0, #0x4"), "{text}");
    assert!(text.contains("stgpr r3.svc, v1"), "{text}");
}

#[test]
fn dump_memory_access_suffixes() {
    use armjit_core::opcode::MemAccess;
    let mut e = Emitter::new();
    let addr = e.create_var(DataType::UInt32, None);
    e.mov(addr, Value::imm(0x100), false);
    let data = e.create_var(DataType::UInt32, None);
    e.load_mem(data, addr, MemAccess::signed_half());
    assert_eq!(fmt_op(&e.code()[1]), "ldmem.sh v1, [v0]");
}
