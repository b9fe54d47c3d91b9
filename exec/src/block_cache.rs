//! Basic block cache.
//!
//! Blocks live in an arena; the map resolves keys to arena slots.
//! Eviction retires slots for reuse. The interpreter backend holds no
//! pointers into evicted code, so retirement is immediate; a
//! machine-code backend must confirm no host code is in flight first.

use armjit_core::block::{BasicBlock, BlockKey};
use hashbrown::HashMap;

#[derive(Debug, Default)]
pub struct BlockCache {
    map: HashMap<BlockKey, usize>,
    blocks: Vec<Option<BasicBlock>>,
    free: Vec<usize>,
}

impl BlockCache {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            blocks: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, key: BlockKey) -> Option<&BasicBlock> {
        self.map
            .get(&key)
            .map(|&idx| self.blocks[idx].as_ref().expect("retired slot in map"))
    }

    /// Insert a block, taking ownership and replacing any prior entry
    /// for the key.
    pub fn set(&mut self, key: BlockKey, block: BasicBlock) {
        if let Some(&idx) = self.map.get(&key) {
            self.blocks[idx] = Some(block);
            return;
        }
        let idx = match self.free.pop() {
            Some(idx) => {
                self.blocks[idx] = Some(block);
                idx
            }
            None => {
                self.blocks.push(Some(block));
                self.blocks.len() - 1
            }
        };
        self.map.insert(key, idx);
    }

    /// Evict everything.
    pub fn flush(&mut self) {
        self.map.clear();
        self.blocks.clear();
        self.free.clear();
    }

    /// Evict every block whose guest instruction span intersects
    /// `[address_lo, address_hi]`.
    pub fn flush_range(&mut self, address_lo: u32, address_hi: u32) {
        let blocks = &self.blocks;
        let mut dead = Vec::new();
        self.map.retain(|_, idx| {
            let block =
                blocks[*idx].as_ref().expect("retired slot in map");
            let (start, end) = block.span();
            let intersects = start <= address_hi && address_lo < end;
            if intersects {
                dead.push(*idx);
            }
            !intersects
        });
        for idx in dead {
            self.blocks[idx] = None;
            self.free.push(idx);
        }
    }
}
