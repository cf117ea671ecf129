//! Management of the block bitmap and the block chain arena.
//! The bitmap tracks which block slots are occupied, the arena stores one `next` link per slot,
//! so a file's content is the chain reachable from its entry's head.

use bitvec::prelude::*;

use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::{BlockId, BlockNode};

#[derive(Debug, Clone)]
pub struct BlockAllocator {
    // A set bit means occupied (reserved or part of a chain).
    used: BitVec,
    nodes: Vec<BlockNode>,
}

impl BlockAllocator {
    /// Every slot free except the reserved metadata slot.
    pub fn new() -> Self {
        let mut used = bitvec![0; MAX_BLOCKS];
        used.set(RESERVED_BLOCK as usize, true);
        let nodes = (0..MAX_BLOCKS as BlockId).map(BlockNode::new).collect();
        Self { used, nodes }
    }

    pub fn count_free(&self) -> usize {
        self.used.count_zeros()
    }

    pub fn is_free(&self, block_id: BlockId) -> bool {
        !self.used[block_id as usize]
    }

    pub fn node(&self, block_id: BlockId) -> &BlockNode {
        &self.nodes[block_id as usize]
    }

    pub fn nodes(&self) -> &[BlockNode] {
        &self.nodes
    }

    /// Allocates `n` free slots in ascending order and links them into one chain.
    /// Returns the chain in order, its head first. Nothing changes if fewer than `n` are free.
    pub fn allocate_chain(&mut self, n: usize) -> Result<Vec<BlockId>> {
        if self.count_free() < n {
            return Err(FsError::NoSpace);
        }

        let chain: Vec<BlockId> = self
            .used
            .iter_zeros()
            .take(n)
            .map(|i| i as BlockId)
            .collect();

        for (i, &block_id) in chain.iter().enumerate() {
            self.used.set(block_id as usize, true);
            self.nodes[block_id as usize].next = chain.get(i + 1).copied();
        }

        Ok(chain)
    }

    /// Frees every slot reachable from `head` and resets its link.
    /// Returns the released slots in chain order; an empty chain is a no-op.
    pub fn release_chain(&mut self, head: Option<BlockId>) -> Vec<BlockId> {
        let released = self.chain(head);
        for &block_id in &released {
            self.used.set(block_id as usize, false);
            self.nodes[block_id as usize].next = None;
        }
        released
    }

    /// Slots of the chain starting at `head`, in order.
    /// The walk stops after MAX_BLOCKS steps, so a corrupted link cannot loop forever.
    pub fn chain(&self, head: Option<BlockId>) -> Vec<BlockId> {
        let mut chain = Vec::new();
        let mut cursor = head;
        while let Some(block_id) = cursor {
            if block_id as usize >= MAX_BLOCKS
                || block_id == RESERVED_BLOCK
                || chain.len() == MAX_BLOCKS
            {
                log::warn!("chain from {:?} broken at block {}", head, block_id);
                break;
            }
            chain.push(block_id);
            cursor = self.nodes[block_id as usize].next;
        }
        chain
    }

    pub fn chain_len(&self, head: Option<BlockId>) -> usize {
        self.chain(head).len()
    }
}

impl Default for BlockAllocator {
    fn default() -> Self {
        Self::new()
    }
}
