//! armdump: disassemble ARM instruction words and dump the IR the
//! translator produces for them.
//!
//! Usage: `armdump <hex-word>...`

use std::env;
use std::process;

use armjit_core::block::{BasicBlock, BlockKey};
use armjit_core::dump::dump_block;
use armjit_core::memory::{Bus, Memory};
use armjit_core::state::Mode;
use armjit_frontend::Translator;

/// The canonical permanently-undefined encoding, used to terminate
/// translation past the supplied words.
const UNDEFINED_WORD: u32 = 0xE7F0_00F0;

struct FlatMemory {
    data: Vec<u8>,
}

impl FlatMemory {
    fn from_words(words: &[u32]) -> Self {
        Self {
            data: words.iter().flat_map(|w| w.to_le_bytes()).collect(),
        }
    }

    fn read(&self, address: u32, size: usize) -> u32 {
        let mut value = 0u32;
        for i in 0..size {
            let byte = self
                .data
                .get(address as usize + i)
                .copied()
                .unwrap_or(0);
            value |= (byte as u32) << (8 * i);
        }
        value
    }
}

impl Memory for FlatMemory {
    fn fast_read_code_u32(&mut self, address: u32) -> u32 {
        if address as usize + 4 > self.data.len() {
            return UNDEFINED_WORD;
        }
        self.read(address, 4)
    }

    fn read_u8(&mut self, address: u32, _bus: Bus) -> u8 {
        self.read(address, 1) as u8
    }

    fn read_u16(&mut self, address: u32, _bus: Bus) -> u16 {
        self.read(address, 2) as u16
    }

    fn read_u32(&mut self, address: u32, _bus: Bus) -> u32 {
        self.read(address, 4)
    }

    fn write_u8(&mut self, address: u32, value: u8, _bus: Bus) {
        if let Some(slot) = self.data.get_mut(address as usize) {
            *slot = value;
        }
    }

    fn write_u16(&mut self, address: u32, value: u16, bus: Bus) {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.write_u8(address + i as u32, byte, bus);
        }
    }

    fn write_u32(&mut self, address: u32, value: u32, bus: Bus) {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.write_u8(address + i as u32, byte, bus);
        }
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("usage: armdump <hex-word>...");
        process::exit(1);
    }

    let mut words = Vec::new();
    for arg in &args {
        let digits = arg.trim_start_matches("0x");
        match u32::from_str_radix(digits, 16) {
            Ok(word) => words.push(word),
            Err(_) => {
                eprintln!("not a hex instruction word: {arg}");
                process::exit(1);
            }
        }
    }

    for (i, word) in words.iter().enumerate() {
        let pc = (i * 4) as u32;
        println!(
            "{pc:08x}  {word:08x}  {}",
            armjit_disas::print_insn_arm(pc, *word)
        );
    }

    let mut memory = FlatMemory::from_words(&words);
    let mut translator = Translator::new(0);
    let mut block =
        BasicBlock::new(BlockKey::new(0, Mode::Supervisor, false));

    println!();
    if translator.translate(&mut block, &mut memory) {
        print!("{}", dump_block(&block));
    } else {
        println!("block refused");
    }
}
