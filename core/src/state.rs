//! Guest architectural state: banked register file and status registers.

use bitflags::bitflags;

/// Number of general-purpose registers per mode.
pub const NUM_GPRS: usize = 16;

/// Stack pointer register index.
pub const REG_SP: u8 = 13;
/// Link register index.
pub const REG_LR: u8 = 14;
/// Program counter register index.
pub const REG_PC: u8 = 15;

/// ARM operating modes (CPSR bits 4..0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Mode {
    User = 0x10,
    Fiq = 0x11,
    Irq = 0x12,
    Supervisor = 0x13,
    Abort = 0x17,
    Undefined = 0x1B,
    System = 0x1F,
}

impl Mode {
    /// Decode a 5-bit mode field. Returns `None` for the reserved
    /// encodings.
    pub const fn from_bits(bits: u32) -> Option<Mode> {
        match bits & 0x1F {
            0x10 => Some(Mode::User),
            0x11 => Some(Mode::Fiq),
            0x12 => Some(Mode::Irq),
            0x13 => Some(Mode::Supervisor),
            0x17 => Some(Mode::Abort),
            0x1B => Some(Mode::Undefined),
            0x1F => Some(Mode::System),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Mode::User => "usr",
            Mode::Fiq => "fiq",
            Mode::Irq => "irq",
            Mode::Supervisor => "svc",
            Mode::Abort => "abt",
            Mode::Undefined => "und",
            Mode::System => "sys",
        }
    }

    /// Index into the r13/r14 and SPSR banks.
    /// User and System share the user bank and have no SPSR.
    const fn bank(self) -> usize {
        match self {
            Mode::User | Mode::System => 0,
            Mode::Fiq => 1,
            Mode::Irq => 2,
            Mode::Supervisor => 3,
            Mode::Abort => 4,
            Mode::Undefined => 5,
        }
    }
}

bitflags! {
    /// CPSR/SPSR flag and control bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PsrFlags: u32 {
        const N = 1 << 31;
        const Z = 1 << 30;
        const C = 1 << 29;
        const V = 1 << 28;
        /// Sticky saturation flag (ARMv5TE).
        const Q = 1 << 27;
        /// IRQ disable.
        const I = 1 << 7;
        /// FIQ disable.
        const F = 1 << 6;
        /// Thumb state.
        const T = 1 << 5;
    }
}

/// A program status register (CPSR or SPSR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusRegister(u32);

impl StatusRegister {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub fn flags(self) -> PsrFlags {
        PsrFlags::from_bits_truncate(self.0)
    }

    pub fn set_flag(&mut self, flag: PsrFlags, on: bool) {
        if on {
            self.0 |= flag.bits();
        } else {
            self.0 &= !flag.bits();
        }
    }

    /// The current mode. Reserved mode encodings read as User; writing
    /// them into the CPSR is unpredictable on hardware.
    pub fn mode(self) -> Mode {
        Mode::from_bits(self.0).unwrap_or(Mode::User)
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.0 = (self.0 & !0x1F) | mode as u32;
    }

    pub fn thumb(self) -> bool {
        self.flags().contains(PsrFlags::T)
    }

    pub fn irq_disabled(self) -> bool {
        self.flags().contains(PsrFlags::I)
    }
}

/// Banked guest register file plus status registers.
///
/// r0-r7 are shared by every mode, r8-r12 are double-banked for FIQ,
/// r13/r14 have one bank per privileged mode, r15 is shared. One SPSR
/// per privileged mode.
#[derive(Debug, Clone)]
pub struct State {
    common: [u32; 8],
    /// r8-r12: [non-FIQ, FIQ].
    banked_high: [[u32; 5]; 2],
    /// r13-r14 per bank (usr/sys, fiq, irq, svc, abt, und).
    banked_low: [[u32; 2]; 6],
    r15: u32,
    cpsr: StatusRegister,
    /// SPSR per bank; slot 0 (usr/sys) is unused storage, reads of it
    /// alias the CPSR.
    spsr: [StatusRegister; 6],
}

impl State {
    pub fn new() -> Self {
        let mut state = Self {
            common: [0; 8],
            banked_high: [[0; 5]; 2],
            banked_low: [[0; 2]; 6],
            r15: 0,
            cpsr: StatusRegister::default(),
            spsr: [StatusRegister::default(); 6],
        };
        state.reset();
        state
    }

    /// Reset to the architectural power-up state: Supervisor mode,
    /// IRQ and FIQ masked, ARM state, entry at address 0. r15 carries
    /// the two-instruction pipeline offset.
    pub fn reset(&mut self) {
        self.common = [0; 8];
        self.banked_high = [[0; 5]; 2];
        self.banked_low = [[0; 2]; 6];
        self.r15 = 2 * 4;
        self.cpsr = StatusRegister::from_raw(
            Mode::Supervisor as u32 | (PsrFlags::I | PsrFlags::F).bits(),
        );
        self.spsr = [StatusRegister::default(); 6];
    }

    pub fn gpr(&self, mode: Mode, reg: u8) -> u32 {
        *self.gpr_ref(mode, reg)
    }

    pub fn set_gpr(&mut self, mode: Mode, reg: u8, value: u32) {
        *self.gpr_mut(mode, reg) = value;
    }

    fn gpr_ref(&self, mode: Mode, reg: u8) -> &u32 {
        match reg {
            0..=7 => &self.common[reg as usize],
            8..=12 => {
                let fiq = (mode == Mode::Fiq) as usize;
                &self.banked_high[fiq][reg as usize - 8]
            }
            13..=14 => &self.banked_low[mode.bank()][reg as usize - 13],
            15 => &self.r15,
            _ => panic!("GPR index out of range: {reg}"),
        }
    }

    fn gpr_mut(&mut self, mode: Mode, reg: u8) -> &mut u32 {
        match reg {
            0..=7 => &mut self.common[reg as usize],
            8..=12 => {
                let fiq = (mode == Mode::Fiq) as usize;
                &mut self.banked_high[fiq][reg as usize - 8]
            }
            13..=14 => &mut self.banked_low[mode.bank()][reg as usize - 13],
            15 => &mut self.r15,
            _ => panic!("GPR index out of range: {reg}"),
        }
    }

    pub fn cpsr(&self) -> StatusRegister {
        self.cpsr
    }

    pub fn cpsr_mut(&mut self) -> &mut StatusRegister {
        &mut self.cpsr
    }

    pub fn set_cpsr(&mut self, value: StatusRegister) {
        self.cpsr = value;
    }

    /// Read the SPSR of `mode`. User and System have no SPSR; reads
    /// alias the CPSR, the usual treatment of this unpredictable case.
    pub fn spsr(&self, mode: Mode) -> StatusRegister {
        match mode {
            Mode::User | Mode::System => self.cpsr,
            _ => self.spsr[mode.bank()],
        }
    }

    pub fn set_spsr(&mut self, mode: Mode, value: StatusRegister) {
        match mode {
            Mode::User | Mode::System => self.cpsr = value,
            _ => self.spsr[mode.bank()] = value,
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}
