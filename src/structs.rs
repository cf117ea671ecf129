use crate::config::*;

/// Physical index of a block slot, `0..MAX_BLOCKS`.
pub type BlockId = u16;

/// Directory record binding a file name to its size and first block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub size: u16,
    pub head: Option<BlockId>,
}

impl Entry {
    pub const FREE: Self = Self {
        name: String::new(),
        size: 0,
        head: None,
    };

    pub fn new(name: &str, head: Option<BlockId>) -> Self {
        Self {
            name: name.to_string(),
            size: 0,
            head,
        }
    }

    pub fn is_free(&self) -> bool {
        self.name.is_empty()
    }
}

/// Chain link of one block slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockNode {
    pub block_id: BlockId,
    pub next: Option<BlockId>,
}

impl BlockNode {
    pub fn new(block_id: BlockId) -> Self {
        Self { block_id, next: None }
    }
}

/// Space accounting snapshot, taken under a single lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub files: usize,
    pub used_blocks: usize,
    pub free_blocks: usize,
}

impl Usage {
    /// Every block slot except the reserved one is either free or in a live chain.
    pub fn is_consistent(&self) -> bool {
        self.used_blocks + self.free_blocks == MAX_BLOCKS - 1
    }
}
