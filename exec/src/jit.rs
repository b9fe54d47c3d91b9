//! The CPU object: dispatch loop, IRQ delivery and state accessors.

use std::collections::VecDeque;

use hashbrown::HashSet;

use armjit_backend::{opt, Backend, CompileError, Interpreter};
use armjit_core::block::{BasicBlock, BlockKey};
use armjit_core::memory::Memory;
use armjit_core::state::{
    Mode, PsrFlags, State, StatusRegister, REG_LR, REG_PC,
};
use armjit_frontend::Translator;

use crate::block_cache::BlockCache;

/// Bound on speculative compilation of statically known branch
/// targets.
pub const SPECULATIVE_DEPTH: u32 = 8;

/// Compilation failure for one block.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("translation refused for block at {address:#010x}")]
    Translation { address: u32 },
    #[error(transparent)]
    Backend(#[from] CompileError),
}

/// Construction parameters for a CPU.
pub struct Descriptor<M> {
    pub memory: M,
    /// Guest base address of the exception vectors.
    pub exception_base: u32,
}

/// Counters for the lookup/compile pipeline.
#[derive(Debug, Default, Clone)]
pub struct JitStats {
    pub lookups: u64,
    pub cache_hits: u64,
    pub blocks_compiled: u64,
    pub flushes: u64,
}

/// A guest CPU driven by dynamic translation.
///
/// Not internally synchronized: exactly one host thread may call into
/// it at a time, and cache control must not race `run`.
pub struct Jit<M: Memory, B: Backend = Interpreter> {
    state: State,
    translator: Translator,
    cache: BlockCache,
    backend: B,
    memory: M,
    exception_base: u32,
    irq_line: bool,
    wait_for_irq: bool,
    halted: bool,
    cycles_to_run: i32,
    stats: JitStats,
}

impl<M: Memory> Jit<M> {
    pub fn new(descriptor: Descriptor<M>) -> Self {
        Self::with_backend(descriptor, Interpreter::new())
    }
}

impl<M: Memory, B: Backend> Jit<M, B> {
    pub fn with_backend(descriptor: Descriptor<M>, backend: B) -> Self {
        Self {
            state: State::new(),
            translator: Translator::new(descriptor.exception_base),
            cache: BlockCache::new(),
            backend,
            memory: descriptor.memory,
            exception_base: descriptor.exception_base,
            irq_line: false,
            wait_for_irq: false,
            halted: false,
            cycles_to_run: 0,
            stats: JitStats::default(),
        }
    }

    pub fn reset(&mut self) {
        self.irq_line = false;
        self.wait_for_irq = false;
        self.halted = false;
        self.cycles_to_run = 0;
        self.state.reset();
        self.cache.flush();
    }

    // -- IRQ surface --

    pub fn irq_line(&mut self) -> &mut bool {
        &mut self.irq_line
    }

    pub fn wait_for_irq(&mut self) {
        self.wait_for_irq = true;
    }

    pub fn cancel_irq_wait(&mut self) {
        self.wait_for_irq = false;
    }

    pub fn is_waiting_for_irq(&self) -> bool {
        self.wait_for_irq
    }

    /// Whether the guest hit an untranslatable instruction; it stays
    /// halted at that PC until `reset`.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    // -- Cache control --

    pub fn clear_icache(&mut self) {
        self.cache.flush();
        self.stats.flushes += 1;
    }

    pub fn clear_icache_range(&mut self, address_lo: u32, address_hi: u32) {
        self.cache.flush_range(address_lo, address_hi);
        self.stats.flushes += 1;
    }

    pub fn stats(&self) -> &JitStats {
        &self.stats
    }

    pub fn cached_blocks(&self) -> usize {
        self.cache.len()
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    // -- Dispatch loop --

    /// Step the guest forward by a budget of cycles; returns how many
    /// were executed.
    pub fn run(&mut self, cycles: i32) -> i32 {
        if self.halted {
            return 0;
        }
        if self.is_waiting_for_irq() && !self.irq_line {
            return 0;
        }

        self.cycles_to_run += cycles;
        let start_cycles = self.cycles_to_run;

        while self.cycles_to_run > 0 {
            if self.irq_line {
                self.signal_irq();
            }

            let key = BlockKey::from_state(&self.state);
            self.stats.lookups += 1;
            if self.cache.get(key).is_some() {
                self.stats.cache_hits += 1;
            } else if let Err(err) = self.compile(key) {
                log::warn!(
                    "halting guest at {:#010x}: {err}",
                    key.address()
                );
                self.halted = true;
                let executed = start_cycles - self.cycles_to_run;
                self.cycles_to_run = 0;
                return executed;
            }

            let block =
                self.cache.get(key).expect("block missing after compile");
            self.cycles_to_run = self.backend.call(
                block,
                &mut self.state,
                &mut self.memory,
                self.cycles_to_run,
            );

            if self.is_waiting_for_irq() {
                let executed = start_cycles - self.cycles_to_run;
                self.cycles_to_run = 0;
                return executed;
            }
        }
        start_cycles - self.cycles_to_run
    }

    /// IRQ handshake: bank the CPSR, enter IRQ mode with IRQs masked
    /// in ARM state, and vector through the exception base.
    fn signal_irq(&mut self) {
        self.wait_for_irq = false;

        let cpsr = self.state.cpsr();
        if cpsr.irq_disabled() {
            return;
        }

        self.state.set_spsr(Mode::Irq, cpsr);

        let pc = self.state.gpr(cpsr.mode(), REG_PC);
        let lr = if cpsr.thumb() {
            pc
        } else {
            pc.wrapping_sub(4)
        };

        let mut entry = cpsr;
        entry.set_mode(Mode::Irq);
        entry.set_flag(PsrFlags::I, true);
        entry.set_flag(PsrFlags::T, false);
        self.state.set_cpsr(entry);

        self.state.set_gpr(Mode::Irq, REG_LR, lr);
        self.state.set_gpr(
            Mode::Irq,
            REG_PC,
            self.exception_base.wrapping_add(0x18 + 2 * 4),
        );
    }

    /// Compile `root` plus, speculatively, the chain of statically
    /// known branch targets behind it (bounded work queue with a
    /// visited set). Only the root's failure is fatal.
    fn compile(&mut self, root: BlockKey) -> Result<(), Error> {
        let mut queue = VecDeque::from([(root, 0u32)]);
        let mut visited = HashSet::new();
        visited.insert(root);

        while let Some((key, depth)) = queue.pop_front() {
            if self.cache.get(key).is_some() {
                continue;
            }
            match self.build_block(key) {
                Ok(block) => {
                    let target = block.branch_target;
                    self.cache.set(key, block);
                    self.stats.blocks_compiled += 1;
                    if !target.is_none()
                        && depth < SPECULATIVE_DEPTH
                        && visited.insert(target)
                    {
                        queue.push_back((target, depth + 1));
                    }
                }
                Err(err) => {
                    if key == root {
                        return Err(err);
                    }
                    log::debug!(
                        "speculative compile skipped at {:#010x}: {err}",
                        key.address()
                    );
                }
            }
        }
        Ok(())
    }

    fn build_block(&mut self, key: BlockKey) -> Result<BasicBlock, Error> {
        let mut block = BasicBlock::new(key);
        if !self.translator.translate(&mut block, &mut self.memory) {
            return Err(Error::Translation {
                address: key.address(),
            });
        }
        for mb in &mut block.micro_blocks {
            opt::eliminate_dead_code(mb);
        }
        self.backend.compile(&mut block)?;
        log::trace!(
            "compiled block {:#010x} ({} instructions)",
            key.address(),
            block.num_instructions
        );
        Ok(block)
    }

    // -- Architectural state accessors --

    pub fn get_gpr(&self, reg: u8) -> u32 {
        self.get_gpr_in(self.state.cpsr().mode(), reg)
    }

    pub fn get_gpr_in(&self, mode: Mode, reg: u8) -> u32 {
        self.state.gpr(mode, reg)
    }

    pub fn set_gpr(&mut self, reg: u8, value: u32) {
        self.set_gpr_in(self.state.cpsr().mode(), reg, value);
    }

    /// Set a register; writing the PC applies the two-instruction
    /// pipeline offset for the current state.
    pub fn set_gpr_in(&mut self, mode: Mode, reg: u8, value: u32) {
        self.state.set_gpr(mode, reg, value);
        if reg == REG_PC {
            let offset = if self.state.cpsr().thumb() {
                2 * 2
            } else {
                2 * 4
            };
            let adjusted =
                self.state.gpr(mode, REG_PC).wrapping_add(offset);
            self.state.set_gpr(mode, REG_PC, adjusted);
        }
    }

    pub fn get_cpsr(&self) -> StatusRegister {
        self.state.cpsr()
    }

    pub fn set_cpsr(&mut self, value: StatusRegister) {
        self.state.set_cpsr(value);
    }

    pub fn get_spsr(&self, mode: Mode) -> StatusRegister {
        self.state.spsr(mode)
    }

    pub fn set_spsr(&mut self, mode: Mode, value: StatusRegister) {
        self.state.set_spsr(mode, value);
    }
}
