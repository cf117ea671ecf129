//! Byte-exact encoding of the volume onto a block device.
//!
//! Device layout:
//! - Block 0: metadata region, `MAX_FILES` entry records followed by `MAX_BLOCKS` index records
//! - Blocks 1..=MAX_BLOCKS: data slot `i` lives in device block `i + 1`,
//!   i.e. at byte offset `BLOCK_SIZE + i * BLOCK_SIZE`
//!
//! Entry record: name (zero padded), size (u16 BE), head (i16 BE, -1 for none).
//! Index record: block id (u16 BE), next (i16 BE, -1 for none).

use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::{BlockId, BlockNode, Entry};
use crate::BlockDevice;

const NO_BLOCK: i16 = -1;

fn trim_zero(name: &[u8]) -> &[u8] {
    let mut end = name.len();
    while end > 0 && name[end - 1] == 0 {
        end -= 1;
    }
    &name[..end]
}

fn encode_link(link: Option<BlockId>) -> [u8; 2] {
    link.map_or(NO_BLOCK, |id| id as i16).to_be_bytes()
}

fn decode_link(bytes: [u8; 2]) -> Option<BlockId> {
    match i16::from_be_bytes(bytes) {
        n if n < 0 => None,
        n => Some(n as BlockId),
    }
}

pub fn encode_entry(entry: &Entry) -> [u8; ENTRY_SIZE] {
    let mut record = [0u8; ENTRY_SIZE];
    let name = entry.name.as_bytes();
    let len = name.len().min(MAX_FILE_NAME_LEN);
    record[..len].copy_from_slice(&name[..len]);
    record[MAX_FILE_NAME_LEN..MAX_FILE_NAME_LEN + 2].copy_from_slice(&entry.size.to_be_bytes());
    record[MAX_FILE_NAME_LEN + 2..].copy_from_slice(&encode_link(entry.head));
    record
}

pub fn decode_entry(record: &[u8]) -> Entry {
    let name = trim_zero(&record[..MAX_FILE_NAME_LEN]);
    Entry {
        name: String::from_utf8_lossy(name).into_owned(),
        size: u16::from_be_bytes([record[MAX_FILE_NAME_LEN], record[MAX_FILE_NAME_LEN + 1]]),
        head: decode_link([record[MAX_FILE_NAME_LEN + 2], record[MAX_FILE_NAME_LEN + 3]]),
    }
}

pub fn encode_node(node: &BlockNode) -> [u8; INDEX_SIZE] {
    let mut record = [0u8; INDEX_SIZE];
    record[..2].copy_from_slice(&node.block_id.to_be_bytes());
    record[2..].copy_from_slice(&encode_link(node.next));
    record
}

pub fn decode_node(record: &[u8]) -> BlockNode {
    BlockNode {
        block_id: u16::from_be_bytes([record[0], record[1]]),
        next: decode_link([record[2], record[3]]),
    }
}

fn entry_offset(slot: usize) -> Result<usize> {
    if slot >= MAX_FILES {
        return Err(FsError::InvalidSlot(slot));
    }
    Ok(ENTRY_TABLE_START + slot * ENTRY_SIZE)
}

fn node_offset(block_id: BlockId) -> Result<usize> {
    if block_id as usize >= MAX_BLOCKS {
        return Err(FsError::InvalidBlockId(block_id as usize));
    }
    Ok(INDEX_TABLE_START + block_id as usize * INDEX_SIZE)
}

/// Device block holding data slot `block_id`.
pub fn data_block(block_id: BlockId) -> Result<usize> {
    if block_id as usize >= MAX_BLOCKS {
        return Err(FsError::InvalidBlockId(block_id as usize));
    }
    Ok(METADATA_BLOCK_ID + 1 + block_id as usize)
}

/// Overwrites one record inside the metadata block in place.
fn patch_metadata(device: &impl BlockDevice, offset: usize, record: &[u8]) -> Result<()> {
    let mut buf = [0u8; BLOCK_SIZE];
    device.read_block(METADATA_BLOCK_ID, &mut buf)?;
    buf[offset..offset + record.len()].copy_from_slice(record);
    device.write_block(METADATA_BLOCK_ID, &buf)
}

pub fn write_entry(device: &impl BlockDevice, slot: usize, entry: &Entry) -> Result<()> {
    patch_metadata(device, entry_offset(slot)?, &encode_entry(entry))
}

pub fn read_entry(device: &impl BlockDevice, slot: usize) -> Result<Entry> {
    let offset = entry_offset(slot)?;
    let mut buf = [0u8; BLOCK_SIZE];
    device.read_block(METADATA_BLOCK_ID, &mut buf)?;
    Ok(decode_entry(&buf[offset..offset + ENTRY_SIZE]))
}

pub fn write_node(device: &impl BlockDevice, node: &BlockNode) -> Result<()> {
    patch_metadata(device, node_offset(node.block_id)?, &encode_node(node))
}

pub fn read_node(device: &impl BlockDevice, block_id: BlockId) -> Result<BlockNode> {
    let offset = node_offset(block_id)?;
    let mut buf = [0u8; BLOCK_SIZE];
    device.read_block(METADATA_BLOCK_ID, &mut buf)?;
    Ok(decode_node(&buf[offset..offset + INDEX_SIZE]))
}

/// Writes a whole metadata block from the in-memory tables.
pub fn format_metadata(device: &impl BlockDevice, entries: &[Entry], nodes: &[BlockNode]) -> Result<()> {
    let mut buf = [0u8; BLOCK_SIZE];
    for (slot, entry) in entries.iter().enumerate() {
        let offset = entry_offset(slot)?;
        buf[offset..offset + ENTRY_SIZE].copy_from_slice(&encode_entry(entry));
    }
    for node in nodes {
        let offset = node_offset(node.block_id)?;
        buf[offset..offset + INDEX_SIZE].copy_from_slice(&encode_node(node));
    }
    device.write_block(METADATA_BLOCK_ID, &buf)
}

/// Writes at most one block of payload, zero padding the rest of the slot.
pub fn write_payload(device: &impl BlockDevice, block_id: BlockId, data: &[u8]) -> Result<()> {
    let mut buf = [0u8; BLOCK_SIZE];
    let len = data.len().min(BLOCK_SIZE);
    buf[..len].copy_from_slice(&data[..len]);
    device.write_block(data_block(block_id)?, &buf)
}

pub fn read_payload(device: &impl BlockDevice, block_id: BlockId, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
    device.read_block(data_block(block_id)?, buf)
}

pub fn zero_block(device: &impl BlockDevice, block_id: BlockId) -> Result<()> {
    device.write_block(data_block(block_id)?, &[0u8; BLOCK_SIZE])
}
