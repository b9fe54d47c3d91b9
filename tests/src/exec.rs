//! End-to-end tests: guest programs through the full decode →
//! translate → optimize → verify → execute pipeline.

use pretty_assertions::assert_eq;

use armjit_core::state::{Mode, PsrFlags, REG_LR, REG_PC};
use armjit_exec::{Descriptor, Jit};

use crate::util::*;

const RAM_SIZE: usize = 0x1_0000;

fn make_jit(words: &[u32]) -> Jit<TestMemory> {
    make_jit_at(0, words)
}

fn make_jit_at(address: u32, words: &[u32]) -> Jit<TestMemory> {
    let mut memory = TestMemory::new(RAM_SIZE);
    memory.load_words(address, words);
    let mut jit = Jit::new(Descriptor {
        memory,
        exception_base: 0,
    });
    jit.reset();
    if address != 0 {
        jit.set_gpr(REG_PC, address);
    }
    jit
}

fn flags(jit: &Jit<TestMemory>) -> PsrFlags {
    jit.get_cpsr().flags()
        & (PsrFlags::N | PsrFlags::Z | PsrFlags::C | PsrFlags::V | PsrFlags::Q)
}

/// Run until the guest halts on the terminator word.
fn run_to_halt(jit: &mut Jit<TestMemory>) -> i32 {
    let executed = jit.run(10_000);
    assert!(jit.is_halted(), "program did not reach the terminator");
    executed
}

#[test]
fn mov_immediate_executes() {
    // mov r0, #1 from an all-zero register state.
    let mut jit = make_jit(&[mov_imm(0, 1), UNDEF]);
    let before = jit.get_cpsr();
    let executed = run_to_halt(&mut jit);
    assert_eq!(executed, 1);
    assert_eq!(jit.get_gpr(0), 1);
    // PC advanced by one instruction (visible value keeps the
    // pipeline offset).
    assert_eq!(jit.get_gpr(REG_PC), 4 + 8);
    assert_eq!(jit.get_cpsr(), before);
}

#[test]
fn self_loop_consumes_the_whole_budget() {
    let mut jit = make_jit_at(0x1000, &[branch_self(0x1000)]);
    let executed = jit.run(16);
    assert_eq!(executed, 16);
    assert_eq!(jit.get_gpr(REG_PC), 0x1008);
    assert!(!jit.is_halted());
    // One block, compiled once, re-dispatched from the cache.
    assert_eq!(jit.cached_blocks(), 1);
    assert_eq!(jit.stats().blocks_compiled, 1);
    assert!(jit.stats().cache_hits >= 15);
}

#[test]
fn adds_sets_zero_and_carry() {
    // mvn r0, #0 ; adds r1, r0, #1  =>  r1 = 0, Z and C set.
    let mut jit = make_jit(&[
        mvn_imm(0, 0),
        dp_imm(OP_ADD, true, 0, 1, 0, 1),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(0), 0xFFFF_FFFF);
    assert_eq!(jit.get_gpr(1), 0);
    assert_eq!(flags(&jit), PsrFlags::Z | PsrFlags::C);
}

#[test]
fn subs_borrow_clears_carry() {
    // mov r0, #0 ; subs r1, r0, #1  =>  r1 = -1, N set, C clear.
    let mut jit = make_jit(&[
        mov_imm(0, 0),
        dp_imm(OP_SUB, true, 0, 1, 0, 1),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(1), 0xFFFF_FFFF);
    assert_eq!(flags(&jit), PsrFlags::N);
}

#[test]
fn subs_overflow_sets_v() {
    // mov r0, #0x80000000 ; subs r1, r0, #1  =>  V set (min - 1).
    let mut jit = make_jit(&[
        dp_imm(OP_MOV, false, 0, 0, 4, 0x80),
        dp_imm(OP_SUB, true, 0, 1, 0, 1),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(1), 0x7FFF_FFFF);
    assert_eq!(flags(&jit), PsrFlags::C | PsrFlags::V);
}

#[test]
fn movs_rotated_immediate_sets_carry_from_rotation() {
    // movs r0, #0x80000000 (0x80 ror 8): N set, C = bit 31.
    let mut jit = make_jit(&[dp_imm(OP_MOV, true, 0, 0, 4, 0x80), UNDEF]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(0), 0x8000_0000);
    assert_eq!(flags(&jit), PsrFlags::N | PsrFlags::C);
}

#[test]
fn movs_without_rotation_preserves_carry() {
    // Set C first, then movs r0, #1: C must survive.
    let mut jit = make_jit(&[
        mvn_imm(0, 0),
        dp_imm(OP_ADD, true, 0, 1, 0, 1), // C := 1
        dp_imm(OP_MOV, true, 0, 2, 0, 1), // no rotation
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(2), 1);
    assert!(flags(&jit).contains(PsrFlags::C));
    assert!(!flags(&jit).contains(PsrFlags::Z));
}

#[test]
fn register_shift_by_32_via_register_amount() {
    // mov r0, #1 ; mov r1, #32 ; movs r2, r0, lsl r1
    // => r2 = 0, C = bit 0 of r0, Z set.
    let mut jit = make_jit(&[
        mov_imm(0, 1),
        mov_imm(1, 32),
        dp_rs(OP_MOV, true, 0, 2, 1, 0, 0),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(2), 0);
    assert!(flags(&jit).contains(PsrFlags::C));
    assert!(flags(&jit).contains(PsrFlags::Z));
}

#[test]
fn register_shift_amount_zero_preserves_carry() {
    // C set beforehand; lsl by r1 = 0 keeps value and carry.
    let mut jit = make_jit(&[
        mvn_imm(0, 0),
        dp_imm(OP_ADD, true, 0, 3, 0, 1), // C := 1, r3 = 0
        mov_imm(1, 0),
        mov_imm(0, 7),
        dp_rs(OP_MOV, true, 0, 2, 1, 0, 0),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(2), 7);
    assert!(flags(&jit).contains(PsrFlags::C));
}

#[test]
fn lsr_imm_zero_encodes_shift_by_32() {
    // movs r1, r0, lsr #0 is LSR #32: result 0, C = bit 31.
    let mut jit = make_jit(&[
        dp_imm(OP_MOV, false, 0, 0, 4, 0x80), // r0 = 0x80000000
        dp_reg(OP_MOV, true, 0, 1, 0, 1, 0),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(1), 0);
    assert!(flags(&jit).contains(PsrFlags::Z));
    assert!(flags(&jit).contains(PsrFlags::C));
}

#[test]
fn rrx_rotates_through_carry() {
    // C := 1, then movs r1, r0, rrx with r0 = 0.
    let mut jit = make_jit(&[
        mvn_imm(0, 0),
        dp_imm(OP_ADD, true, 0, 1, 0, 1), // C := 1
        mov_imm(0, 0),
        dp_reg(OP_MOV, true, 0, 1, 0, 3, 0), // rrx
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(1), 0x8000_0000);
    // Carry out is bit 0 of the operand (0).
    assert!(!flags(&jit).contains(PsrFlags::C));
    assert!(flags(&jit).contains(PsrFlags::N));
}

#[test]
fn adc_consumes_guest_carry() {
    // C := 1 via adds, then adc r2, r3, #0 with r3 = 0 gives 1.
    let mut jit = make_jit(&[
        mvn_imm(0, 0),
        mov_imm(3, 0),
        dp_imm(OP_ADD, true, 0, 1, 0, 1), // C := 1
        dp_imm(OP_ADC, false, 3, 2, 0, 0),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(2), 1);
}

#[test]
fn cmp_sets_flags_without_writing() {
    let mut jit = make_jit(&[
        mov_imm(0, 5),
        dp_imm(OP_CMP, true, 0, 0, 0, 5),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(0), 5);
    assert!(flags(&jit).contains(PsrFlags::Z));
    assert!(flags(&jit).contains(PsrFlags::C));
}

#[test]
fn countdown_loop_terminates() {
    // mov r0, #5 ; loop: subs r0, r0, #1 ; bne loop ; b .
    let program = [
        mov_imm(0, 5),
        dp_imm(OP_SUB, true, 0, 0, 0, 1),
        branch_cc(1, 8, 4, false), // bne 4
        branch_self(12),
    ];
    let mut jit = make_jit(&program);
    let executed = jit.run(100);
    assert_eq!(executed, 100);
    assert_eq!(jit.get_gpr(0), 0);
    assert!(flags(&jit).contains(PsrFlags::Z));
    // Spinning on the final branch.
    assert_eq!(jit.get_gpr(REG_PC), 12 + 8);
}

#[test]
fn conditional_instruction_skips_effects_when_false() {
    // cmp r0, #1 (r0 = 0, so NE) ; moveq r1, #7 must not fire.
    let mut jit = make_jit(&[
        mov_imm(1, 3),
        dp_imm(OP_CMP, true, 0, 0, 0, 1),
        dp_imm_cc(0, OP_MOV, false, 0, 1, 0, 7),
        UNDEF,
    ]);
    let executed = run_to_halt(&mut jit);
    // Skipped instructions still consume their cycle.
    assert_eq!(executed, 3);
    assert_eq!(jit.get_gpr(1), 3);
}

#[test]
fn str_ldr_roundtrip() {
    let mut jit = make_jit(&[
        mov_imm(0, 0x80), // base 0x80... within RAM
        mov_imm(1, 42),
        str_imm(1, 0, 0x20),
        ldr_imm(2, 0, 0x20),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(2), 42);
    assert_eq!(jit.memory().word_at(0xA0), 42);
}

#[test]
fn byte_and_halfword_transfers() {
    let mut jit = make_jit(&[
        mov_imm(0, 0x80),
        mvn_imm(1, 0),            // 0xFFFFFFFF
        strh(1, 0, 0),            // stores 0xFFFF
        ldrh(2, 0, 0),            // 0x0000FFFF
        ldrsh(3, 0, 0),           // sign-extended
        strb_imm(1, 0, 8),
        ldrb_imm(4, 0, 8),        // 0xFF
        ldrsb(5, 0, 8),           // sign-extended byte
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(2), 0xFFFF);
    assert_eq!(jit.get_gpr(3), 0xFFFF_FFFF);
    assert_eq!(jit.get_gpr(4), 0xFF);
    assert_eq!(jit.get_gpr(5), 0xFFFF_FFFF);
}

#[test]
fn unaligned_word_load_rotates() {
    let mut jit = make_jit(&[
        mov_imm(0, 0x80),
        ldr_imm(1, 0, 1), // address 0x81
        UNDEF,
    ]);
    jit.memory_mut().load_words(0x80, &[0x1122_3344]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(1), 0x1122_3344u32.rotate_right(8));
}

#[test]
fn post_indexed_writeback() {
    // ldr r1, [r0], #4 twice walks an array.
    let mut jit = make_jit(&[
        mov_imm(0, 0x80),
        sdt(true, false, false, true, false, 0, 1, 4),
        sdt(true, false, false, true, false, 0, 2, 4),
        UNDEF,
    ]);
    jit.memory_mut().load_words(0x80, &[10, 20]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(1), 10);
    assert_eq!(jit.get_gpr(2), 20);
    assert_eq!(jit.get_gpr(0), 0x88);
}

#[test]
fn block_transfer_roundtrip() {
    // stmia r0!, {r1-r3} then ldmia r4!, {r5-r7}.
    let mut jit = make_jit(&[
        mov_imm(0, 0x80),
        mov_imm(4, 0x80),
        mov_imm(1, 11),
        mov_imm(2, 22),
        mov_imm(3, 33),
        stmia_wb(0, 0b1110),
        ldmia_wb(4, 0b1110_0000),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(0), 0x8C);
    assert_eq!(jit.get_gpr(4), 0x8C);
    assert_eq!(jit.get_gpr(5), 11);
    assert_eq!(jit.get_gpr(6), 22);
    assert_eq!(jit.get_gpr(7), 33);
    assert_eq!(jit.memory().word_at(0x84), 22);
}

#[test]
fn block_load_of_pc_branches() {
    // Push a return target, then ldmia r0, {pc}.
    let mut jit = make_jit(&[
        mov_imm(0, 0x80),
        bdt(true, false, true, false, false, 0, 0x8000),
        UNDEF,
        branch_self(0xC), // target block
    ]);
    jit.memory_mut().load_words(0x80, &[0xC]);
    let executed = jit.run(10);
    assert!(!jit.is_halted());
    assert_eq!(executed, 10);
    assert_eq!(jit.get_gpr(REG_PC), 0xC + 8);
}

#[test]
fn swap_exchanges_memory_and_register() {
    let mut jit = make_jit(&[
        mov_imm(0, 0x80),
        mov_imm(1, 9),
        swp(false, 2, 1, 0),
        UNDEF,
    ]);
    jit.memory_mut().load_words(0x80, &[77]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(2), 77);
    assert_eq!(jit.memory().word_at(0x80), 9);
}

#[test]
fn multiply_and_accumulate() {
    let mut jit = make_jit(&[
        mov_imm(2, 6),
        mov_imm(3, 7),
        mul(1, 2, 3),
        mov_imm(4, 100),
        mla(5, 2, 3, 4),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(1), 42);
    assert_eq!(jit.get_gpr(5), 142);
}

#[test]
fn multiply_sets_nz_and_preserves_c() {
    // C := 1, then muls of zero: Z set, C untouched.
    let mut jit = make_jit(&[
        mvn_imm(0, 0),
        dp_imm(OP_ADD, true, 0, 1, 0, 1), // C := 1
        mov_imm(2, 0),
        mov_imm(3, 7),
        mul_s(4, 2, 3),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(4), 0);
    assert!(flags(&jit).contains(PsrFlags::Z));
    assert!(flags(&jit).contains(PsrFlags::C));
}

#[test]
fn long_multiplies() {
    // umull: 0xFFFFFFFF * 2 = 0x1_FFFFFFFE.
    let mut jit = make_jit(&[
        mvn_imm(2, 0),
        mov_imm(3, 2),
        mull(false, false, false, 1, 0, 2, 3),
        // smull: -1 * 2 = -2.
        mull(true, false, false, 5, 4, 2, 3),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(0), 0xFFFF_FFFE);
    assert_eq!(jit.get_gpr(1), 1);
    assert_eq!(jit.get_gpr(4), 0xFFFF_FFFE);
    assert_eq!(jit.get_gpr(5), 0xFFFF_FFFF);
}

#[test]
fn umlal_accumulates() {
    // 3 * 4 accumulated onto 0x00000001:0xFFFFFFFF.
    let mut jit = make_jit(&[
        mov_imm(2, 3),
        mov_imm(3, 4),
        mvn_imm(0, 0),      // lo = 0xFFFFFFFF
        mov_imm(1, 1),      // hi = 1
        mull(false, true, false, 1, 0, 2, 3),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(0), 11);
    assert_eq!(jit.get_gpr(1), 2);
}

#[test]
fn count_leading_zeros() {
    let mut jit = make_jit(&[
        mov_imm(0, 1),
        clz(1, 0),
        mov_imm(2, 0),
        clz(3, 2),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(1), 31);
    assert_eq!(jit.get_gpr(3), 32);
}

#[test]
fn saturating_add_sets_q() {
    // r0 = 0x7F000000; qadd r1, r0, r0 saturates.
    let mut jit = make_jit(&[
        dp_imm(OP_MOV, false, 0, 0, 4, 0x7F),
        qop(false, false, 1, 0, 0),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(1), 0x7FFF_FFFF);
    assert!(flags(&jit).contains(PsrFlags::Q));
}

#[test]
fn saturating_sub_without_saturation_leaves_q_clear() {
    let mut jit = make_jit(&[
        mov_imm(0, 5),
        mov_imm(1, 3),
        qop(true, false, 2, 0, 1), // qsub r2, r0, r1
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(2), 2);
    assert!(!flags(&jit).contains(PsrFlags::Q));
}

#[test]
fn qdadd_doubles_with_saturation() {
    // qdadd r2, r0, r1 with r1 = 0x7F000000: the doubling of r1
    // saturates to 0x7FFFFFFF, then 1 + 0x7FFFFFFF saturates again.
    let mut jit = make_jit(&[
        mov_imm(0, 1),
        dp_imm(OP_MOV, false, 0, 1, 4, 0x7F),
        qop(false, true, 2, 0, 1),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(2), 0x7FFF_FFFF);
    assert!(flags(&jit).contains(PsrFlags::Q));
}

#[test]
fn signed_halfword_multiplies() {
    // r0 = 0x0001_0002: bottom half 2, top half 1.
    let mut jit = make_jit(&[
        mov_imm(0, 2),
        dp_imm(OP_ORR, false, 0, 0, 8, 1), // | 0x10000
        smulxy(1, 0, 0, false, false),     // 2 * 2
        smulxy(2, 0, 0, true, true),       // 1 * 1
        smulxy(3, 0, 0, false, true),      // 2 * 1
        mov_imm(4, 10),
        smlaxy(5, 0, 0, 4, false, false),  // 2 * 2 + 10
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(1), 4);
    assert_eq!(jit.get_gpr(2), 1);
    assert_eq!(jit.get_gpr(3), 2);
    assert_eq!(jit.get_gpr(5), 14);
    assert!(!flags(&jit).contains(PsrFlags::Q));
}

#[test]
fn smla_accumulate_overflow_sets_q() {
    // 2 * 2 + 0x7FFFFFFF overflows: the result wraps (no
    // saturation) and Q is set.
    let mut jit = make_jit(&[
        mov_imm(0, 2),
        dp_imm(OP_MVN, false, 0, 4, 4, 0x80), // r4 = 0x7FFFFFFF
        smlaxy(5, 0, 0, 4, false, false),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(5), 0x8000_0003);
    assert!(flags(&jit).contains(PsrFlags::Q));
}

#[test]
fn smlaw_accumulate_overflow_sets_q() {
    // (0x7FFFFFFF * 2) >> 16 is 0xFFFF; adding 0x7FFFFFFF wraps
    // and raises Q.
    let mut jit = make_jit(&[
        dp_imm(OP_MVN, false, 0, 2, 4, 0x80), // r2 = 0x7FFFFFFF
        mov_imm(1, 2),
        dp_imm(OP_MVN, false, 0, 4, 4, 0x80), // r4 = 0x7FFFFFFF
        smlawy(6, 2, 1, 4, false),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(6), 0x8000_FFFE);
    assert!(flags(&jit).contains(PsrFlags::Q));
}

#[test]
fn msr_flag_writes_and_mrs() {
    let mut jit = make_jit(&[
        msr_imm(false, 0x8, 2, 0x0F), // flags := 0xF0000000
        mrs(0, false),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(
        flags(&jit),
        PsrFlags::N | PsrFlags::Z | PsrFlags::C | PsrFlags::V
    );
    assert_eq!(jit.get_gpr(0) & 0xF000_0000, 0xF000_0000);
    // Mode untouched by a flags-only write.
    assert_eq!(jit.get_cpsr().mode(), Mode::Supervisor);
}

#[test]
fn msr_control_write_switches_mode() {
    // msr cpsr_c, #0xD2: IRQ mode, IRQs masked.
    let mut jit = make_jit(&[
        msr_imm(false, 0x1, 0, 0xD2),
        branch_self(4),
    ]);
    jit.run(4);
    assert!(!jit.is_halted());
    assert_eq!(jit.get_cpsr().mode(), Mode::Irq);
    assert!(jit.get_cpsr().irq_disabled());
}

#[test]
fn svc_enters_supervisor_through_the_vector() {
    // Vector at exception_base + 8 spins.
    let mut jit = make_jit(&[svc(0x42)]);
    jit.memory_mut().load_words(0x8, &[branch_self(0x8)]);
    // Start from IRQ mode so the bank switch is visible.
    let mut cpsr = jit.get_cpsr();
    cpsr.set_mode(Mode::Irq);
    jit.set_cpsr(cpsr);
    let entry_cpsr = jit.get_cpsr();

    jit.run(8);
    assert!(!jit.is_halted());
    assert_eq!(jit.get_cpsr().mode(), Mode::Supervisor);
    assert!(jit.get_cpsr().irq_disabled());
    assert_eq!(jit.get_spsr(Mode::Supervisor), entry_cpsr);
    assert_eq!(jit.get_gpr_in(Mode::Supervisor, REG_LR), 4);
    assert_eq!(jit.get_gpr(REG_PC), 0x8 + 8);
}

#[test]
fn exception_return_restores_cpsr() {
    // svc at 0; handler at 8: movs pc, lr. Back at 4: spin.
    let mut jit = make_jit(&[
        svc(0),
        branch_self(4),
        dp_reg(OP_MOV, true, 0, 15, 0, 0, 14), // movs pc, lr
    ]);
    let entry_cpsr = jit.get_cpsr();
    jit.run(8);
    assert!(!jit.is_halted());
    assert_eq!(jit.get_cpsr(), entry_cpsr);
    assert_eq!(jit.get_gpr(REG_PC), 4 + 8);
}

#[test]
fn irq_is_delivered_when_unmasked() {
    let mut jit = make_jit(&[branch_self(0)]);
    jit.memory_mut().load_words(0x18, &[branch_self(0x18)]);
    // Unmask IRQs.
    let mut cpsr = jit.get_cpsr();
    cpsr.set_flag(PsrFlags::I, false);
    jit.set_cpsr(cpsr);
    let before = jit.get_cpsr();

    *jit.irq_line() = true;
    let executed = jit.run(10);
    assert_eq!(executed, 10);
    assert_eq!(jit.get_cpsr().mode(), Mode::Irq);
    assert!(jit.get_cpsr().irq_disabled());
    assert_eq!(jit.get_spsr(Mode::Irq), before);
    // LR_irq = preempted PC - 4 in ARM state.
    assert_eq!(jit.get_gpr_in(Mode::Irq, REG_LR), 8 - 4);
    assert_eq!(jit.get_gpr(REG_PC), 0x18 + 8);
}

#[test]
fn masked_irq_is_not_delivered() {
    let mut jit = make_jit(&[branch_self(0)]);
    *jit.irq_line() = true; // reset leaves I set
    jit.run(4);
    assert_eq!(jit.get_cpsr().mode(), Mode::Supervisor);
    assert_eq!(jit.get_gpr(REG_PC), 8);
}

#[test]
fn irq_wait_returns_zero_without_lookup() {
    let mut jit = make_jit(&[branch_self(0)]);
    jit.wait_for_irq();
    assert!(jit.is_waiting_for_irq());
    assert_eq!(jit.run(0), 0);
    assert_eq!(jit.run(100), 0);
    assert_eq!(jit.stats().lookups, 0);

    jit.cancel_irq_wait();
    assert_eq!(jit.run(4), 4);
}

#[test]
fn asserted_line_clears_irq_wait() {
    let mut jit = make_jit(&[branch_self(0)]);
    jit.wait_for_irq();
    // Line asserted but IRQs masked: wait is cancelled, execution
    // resumes without a handshake.
    *jit.irq_line() = true;
    let executed = jit.run(4);
    assert_eq!(executed, 4);
    assert!(!jit.is_waiting_for_irq());
    assert_eq!(jit.get_cpsr().mode(), Mode::Supervisor);
}

#[test]
fn range_flush_picks_up_rewritten_code() {
    // mov r0, #1 ; b 0, then rewrite the mov and flush.
    let mut jit = make_jit(&[mov_imm(0, 1), branch(4, 0)]);
    jit.run(4);
    assert_eq!(jit.get_gpr(0), 1);

    let new_word = mov_imm(0, 2);
    jit.memory_mut().load_words(0, &[new_word]);
    // Still cached: old code body keeps running.
    jit.run(4);
    assert_eq!(jit.get_gpr(0), 1);
    // A flush of a disjoint range changes nothing.
    jit.clear_icache_range(0x400, 0x500);
    jit.run(4);
    assert_eq!(jit.get_gpr(0), 1);
    // A covering flush forces retranslation.
    jit.clear_icache_range(0, 7);
    jit.run(4);
    assert_eq!(jit.get_gpr(0), 2);
}

#[test]
fn full_flush_forces_retranslation() {
    let mut jit = make_jit(&[mov_imm(0, 1), branch(4, 0)]);
    jit.run(4);
    assert!(jit.cached_blocks() > 0);
    jit.memory_mut().load_words(0, &[mov_imm(0, 3)]);
    jit.clear_icache();
    assert_eq!(jit.cached_blocks(), 0);
    jit.run(4);
    assert_eq!(jit.get_gpr(0), 3);
}

#[test]
fn set_pc_applies_pipeline_offset() {
    let mut jit = make_jit(&[branch_self(0)]);
    jit.set_gpr(REG_PC, 0x1000);
    assert_eq!(jit.get_gpr(REG_PC), 0x1008);

    // Thumb state halves the instruction width.
    let mut cpsr = jit.get_cpsr();
    cpsr.set_flag(PsrFlags::T, true);
    jit.set_cpsr(cpsr);
    jit.set_gpr(REG_PC, 0x2000);
    assert_eq!(jit.get_gpr(REG_PC), 0x2004);
}

#[test]
fn thumb_entry_halts_the_guest() {
    // bx r0 with bit 0 set: the next block key is Thumb and the
    // translator refuses it.
    let mut jit = make_jit(&[mov_imm(0, 0x81), bx(0), UNDEF]);
    jit.run(10);
    assert!(jit.is_halted());
    assert!(jit.get_cpsr().thumb());
    // Thumb pipeline: PC = (0x81 & !1) + 4.
    assert_eq!(jit.get_gpr(REG_PC), 0x84);
}

#[test]
fn bx_to_arm_address_continues() {
    let mut jit = make_jit(&[mov_imm(0, 0x40), bx(0), UNDEF]);
    jit.memory_mut().load_words(0x40, &[branch_self(0x40)]);
    jit.run(6);
    assert!(!jit.is_halted());
    assert!(!jit.get_cpsr().thumb());
    assert_eq!(jit.get_gpr(REG_PC), 0x48);
}

#[test]
fn speculative_compilation_warms_the_cache() {
    // b 8 ; (unreachable) ; b . : the chain is compiled up front.
    let mut jit = make_jit(&[
        branch(0, 8),
        UNDEF,
        branch_self(8),
    ]);
    let executed = jit.run(1);
    assert_eq!(executed, 1);
    // Both the root and its static target are already cached.
    assert_eq!(jit.cached_blocks(), 2);
    assert_eq!(jit.stats().blocks_compiled, 2);
}

#[test]
fn reset_restores_power_up_state() {
    let mut jit = make_jit(&[mov_imm(0, 1), branch_self(4)]);
    jit.run(8);
    assert!(jit.cached_blocks() > 0);
    jit.reset();
    assert_eq!(jit.cached_blocks(), 0);
    assert_eq!(jit.get_gpr(0), 0);
    assert_eq!(jit.get_gpr(REG_PC), 8);
    assert!(!jit.is_halted());
    assert_eq!(jit.get_cpsr().mode(), Mode::Supervisor);
}

#[test]
fn bic_and_tst() {
    let mut jit = make_jit(&[
        mov_imm(0, 0xFF),
        dp_imm(OP_BIC, false, 0, 1, 0, 0x0F), // r1 = 0xF0
        dp_imm(OP_TST, true, 1, 0, 0, 0x0F),  // Z set
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(1), 0xF0);
    assert!(flags(&jit).contains(PsrFlags::Z));
}

#[test]
fn rsb_reverses_operands() {
    let mut jit = make_jit(&[
        mov_imm(0, 3),
        dp_imm(OP_RSB, false, 0, 1, 0, 10), // r1 = 10 - 3
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(1), 7);
}

#[test]
fn pc_operand_reads_pipeline_value() {
    // At address 4: add r0, pc, #0 -> r0 = 12.
    let mut jit = make_jit(&[
        mov_imm(1, 0),
        dp_imm(OP_ADD, false, 15, 0, 0, 0),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.get_gpr(0), 4 + 8);
}

#[test]
fn str_of_pc_stores_address_plus_twelve() {
    // At address 4: str pc, [r0] with r0 = 0x80.
    let mut jit = make_jit(&[
        mov_imm(0, 0x80),
        str_imm(15, 0, 0),
        UNDEF,
    ]);
    run_to_halt(&mut jit);
    assert_eq!(jit.memory().word_at(0x80), 4 + 12);
}
