use std::fmt::Write as _;

use parking_lot::RwLock;

use crate::bitmap::BlockAllocator;
use crate::config::*;
use crate::directory::{validate_name, DirectoryTable};
use crate::disk;
use crate::error::{FsError, Result};
use crate::structs::{BlockId, Entry, Usage};
use crate::BlockDevice;

/// Everything the lock guards: the in-memory tables and the device they are persisted to.
#[derive(Debug)]
struct Volume<D: BlockDevice> {
    device: D,
    dir: DirectoryTable,
    blocks: BlockAllocator,
}

impl<D: BlockDevice> Volume<D> {
    fn lookup(&self, name: &str) -> Result<usize> {
        self.dir
            .find_by_name(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))
    }

    fn persist_nodes(&self, block_ids: &[BlockId]) -> Result<()> {
        for &block_id in block_ids {
            disk::write_node(&self.device, self.blocks.node(block_id))?;
        }
        Ok(())
    }

    /// Zeroes the payloads of released blocks and persists their reset links.
    fn scrub(&self, released: &[BlockId]) -> Result<()> {
        for &block_id in released {
            disk::zero_block(&self.device, block_id)?;
        }
        self.persist_nodes(released)
    }

    fn read_chain(&self, entry: &Entry) -> Result<Vec<u8>> {
        let size = entry.size as usize;
        let mut data = Vec::with_capacity(size);
        let mut buf = [0u8; BLOCK_SIZE];
        for block_id in self.blocks.chain(entry.head) {
            if data.len() >= size {
                break;
            }
            disk::read_payload(&self.device, block_id, &mut buf)?;
            let take = (size - data.len()).min(BLOCK_SIZE);
            data.extend_from_slice(&buf[..take]);
        }
        Ok(data)
    }

    fn usage(&self) -> Usage {
        Usage {
            files: self.dir.live().count(),
            used_blocks: self
                .dir
                .live()
                .map(|(_, e)| self.blocks.chain_len(e.head))
                .sum(),
            free_blocks: self.blocks.count_free(),
        }
    }
}

/// The file manager shared by every client connection.
/// Reads and listings run concurrently; create, delete and write are exclusive
/// for their whole duration, device writes included.
#[derive(Debug)]
pub struct FileSystem<D: BlockDevice> {
    volume: RwLock<Volume<D>>,
}

impl<D: BlockDevice> FileSystem<D> {
    /// Initializes a fresh volume on `device`, wiping whatever it held before.
    pub fn format(device: D) -> Result<Self> {
        if device.num_blocks() < DISK_BLOCKS {
            return Err(FsError::DeviceTooSmall {
                found: device.num_blocks(),
                needed: DISK_BLOCKS,
            });
        }

        let dir = DirectoryTable::new();
        let blocks = BlockAllocator::new();
        disk::format_metadata(&device, dir.entries(), blocks.nodes())?;
        for block_id in 0..MAX_BLOCKS as BlockId {
            disk::zero_block(&device, block_id)?;
        }
        device.flush()?;

        log::info!(
            "formatted volume: {} entry slots, {} blocks of {} bytes, {} free",
            MAX_FILES,
            MAX_BLOCKS,
            BLOCK_SIZE,
            blocks.count_free()
        );

        Ok(Self {
            volume: RwLock::new(Volume { device, dir, blocks }),
        })
    }

    pub fn create_file(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let mut vol = self.volume.write();
        if vol.dir.find_by_name(name).is_some() {
            return Err(FsError::AlreadyExists(name.to_string()));
        }
        let slot = vol.dir.allocate_slot()?;
        // Even an empty file holds a head block until its first write.
        let chain = vol.blocks.allocate_chain(1)?;
        let entry = Entry::new(name, chain.first().copied());
        vol.dir.set(slot, entry.clone());

        // Tables are committed; from here on a failure only leaves the disk stale.
        vol.persist_nodes(&chain)?;
        disk::write_entry(&vol.device, slot, &entry)?;
        log::debug!("create {} -> slot {}, head {:?}", name, slot, entry.head);
        Ok(())
    }

    pub fn delete_file(&self, name: &str) -> Result<()> {
        let mut vol = self.volume.write();
        let slot = vol.lookup(name)?;
        let head = vol.dir.get(slot).head;

        let released = vol.blocks.release_chain(head);
        vol.dir.free(slot);

        vol.scrub(&released)?;
        disk::write_entry(&vol.device, slot, &Entry::FREE)?;
        log::debug!("delete {} from slot {}, released {:?}", name, slot, released);
        Ok(())
    }

    /// Replaces the whole content of `name`.
    /// The blocks currently held by the file count as available for the new content.
    pub fn write_file(&self, name: &str, data: &[u8]) -> Result<()> {
        let mut vol = self.volume.write();
        let slot = vol.lookup(name)?;
        let old_head = vol.dir.get(slot).head;

        let needed = data.len().div_ceil(BLOCK_SIZE);
        let available = vol.blocks.count_free() + vol.blocks.chain_len(old_head);
        if available < needed {
            log::debug!("write {}: {} blocks needed, {} available", name, needed, available);
            return Err(FsError::NoSpace);
        }

        // Passing the accounting check keeps data.len() within MAX_FILE_SIZE.
        let released = vol.blocks.release_chain(old_head);
        let chain = vol.blocks.allocate_chain(needed)?;
        let entry = Entry {
            name: name.to_string(),
            size: data.len() as u16,
            head: chain.first().copied(),
        };
        vol.dir.set(slot, entry.clone());

        // Tables are committed; from here on a failure only leaves the disk stale.
        vol.scrub(&released)?;
        for (block_id, payload) in chain.iter().zip(data.chunks(BLOCK_SIZE)) {
            disk::write_payload(&vol.device, *block_id, payload)?;
        }
        vol.persist_nodes(&chain)?;
        disk::write_entry(&vol.device, slot, &entry)?;
        log::debug!("write {}: {} bytes in blocks {:?}", name, data.len(), chain);
        Ok(())
    }

    pub fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let vol = self.volume.read();
        let slot = vol.lookup(name)?;
        let entry = vol.dir.get(slot);
        if entry.size == 0 {
            return Ok(Vec::new());
        }
        vol.read_chain(entry)
    }

    /// Names of all live files, in slot order.
    pub fn list_files(&self) -> Vec<String> {
        self.volume.read().dir.names()
    }

    pub fn stat(&self, name: &str) -> Result<Entry> {
        let vol = self.volume.read();
        let slot = vol.lookup(name)?;
        Ok(vol.dir.get(slot).clone())
    }

    /// Block slots holding the content of `name`, in order.
    pub fn chain(&self, name: &str) -> Result<Vec<BlockId>> {
        let vol = self.volume.read();
        let slot = vol.lookup(name)?;
        Ok(vol.blocks.chain(vol.dir.get(slot).head))
    }

    /// Snapshot of every directory slot, free ones included.
    pub fn entries(&self) -> Vec<Entry> {
        self.volume.read().dir.entries().to_vec()
    }

    pub fn free_blocks(&self) -> usize {
        self.volume.read().blocks.count_free()
    }

    pub fn usage(&self) -> Usage {
        self.volume.read().usage()
    }

    pub fn flush(&self) -> Result<()> {
        self.volume.read().device.flush()
    }

    pub fn dump(&self) -> String {
        let vol = self.volume.read();
        let usage = vol.usage();
        let mut out = format!(
            "files {}/{}, blocks used {}, free {}\n",
            usage.files, MAX_FILES, usage.used_blocks, usage.free_blocks
        );
        for (slot, entry) in vol.dir.live() {
            let _ = writeln!(
                out,
                "  [{}] {:<width$} {:>5} bytes  chain {:?}",
                slot,
                entry.name,
                entry.size,
                vol.blocks.chain(entry.head),
                width = MAX_FILE_NAME_LEN
            );
        }
        let bitmap: String = (0..MAX_BLOCKS as BlockId)
            .map(|id| match id {
                RESERVED_BLOCK => 'R',
                id if vol.blocks.is_free(id) => '.',
                _ => '#',
            })
            .collect();
        let _ = write!(out, "  bitmap {}", bitmap);
        out
    }
}

