//! Common utilities for tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chainfs::{BlockDevice, Error, FileSystem, Result, BLOCK_SIZE, DISK_BLOCKS, MAX_BLOCKS};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr) => {
        println!("{}[test] {}{}", crate::common::ORANGE, $msg, crate::common::RESET)
    };
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// In-memory block device. Clones share the same storage, so a test can keep a handle
/// to inspect raw bytes after handing the disk to a file system.
#[derive(Clone)]
pub struct RamDisk {
    inner: Arc<Mutex<Vec<u8>>>,
    num_blocks: usize,
}

impl RamDisk {
    /// Creates a new RamDisk with the specified number of blocks.
    /// Each block is BLOCK_SIZE bytes.
    pub fn new(num_blocks: usize) -> Self {
        let size = num_blocks * BLOCK_SIZE;
        let inner = Arc::new(Mutex::new(vec![0u8; size]));
        RamDisk { inner, num_blocks }
    }

    /// Copy of the raw bytes of one device block.
    pub fn raw_block(&self, block_id: usize) -> Vec<u8> {
        let data = self.inner.lock().unwrap();
        data[block_id * BLOCK_SIZE..(block_id + 1) * BLOCK_SIZE].to_vec()
    }
}

impl BlockDevice for RamDisk {
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()> {
        if block_id >= self.num_blocks {
            return Err(Error::InvalidBlockId(block_id));
        }
        let start = block_id * BLOCK_SIZE;
        let end = start + BLOCK_SIZE;
        let data = self.inner.lock().unwrap();
        buf.copy_from_slice(&data[start..end]);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<()> {
        if block_id >= self.num_blocks {
            return Err(Error::InvalidBlockId(block_id));
        }
        let start = block_id * BLOCK_SIZE;
        let end = start + BLOCK_SIZE;
        let mut data = self.inner.lock().unwrap();
        data[start..end].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        // In a RAM disk, flushing is a no-op since data is already in memory.
        Ok(())
    }
}

/// RAM disk whose writes can be switched to fail, to check the volume after a storage error.
/// Reads keep working so the tables can still be inspected.
#[derive(Clone)]
pub struct FlakyDisk {
    disk: RamDisk,
    failing: Arc<AtomicBool>,
}

impl FlakyDisk {
    pub fn new(num_blocks: usize) -> Self {
        FlakyDisk {
            disk: RamDisk::new(num_blocks),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Every write from now on fails with an I/O error.
    pub fn fail_writes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    pub fn raw_block(&self, block_id: usize) -> Vec<u8> {
        self.disk.raw_block(block_id)
    }
}

impl BlockDevice for FlakyDisk {
    fn num_blocks(&self) -> usize {
        self.disk.num_blocks()
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()> {
        self.disk.read_block(block_id, buf)
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::other("injected write failure")));
        }
        self.disk.write_block(block_id, buf)
    }

    fn flush(&self) -> Result<()> {
        self.disk.flush()
    }
}

/// Freshly formatted file system on a RAM disk of exactly the volume size.
pub fn ram_fs() -> (FileSystem<RamDisk>, RamDisk) {
    let rd = RamDisk::new(DISK_BLOCKS);
    let fs = FileSystem::format(rd.clone()).unwrap();
    (fs, rd)
}

/// Free blocks must always equal the non-reserved slots not held by a live chain.
pub fn assert_accounting(fs: &FileSystem<impl BlockDevice>) {
    let used: usize = fs
        .list_files()
        .iter()
        .map(|name| fs.chain(name).unwrap().len())
        .sum();
    assert_eq!(fs.free_blocks(), MAX_BLOCKS - 1 - used, "free block accounting broken:\n{}", fs.dump());
    assert!(fs.usage().is_consistent());
}

/// Freshly formatted file system on a disk whose writes can be made to fail.
pub fn flaky_fs() -> (FileSystem<FlakyDisk>, FlakyDisk) {
    let fd = FlakyDisk::new(DISK_BLOCKS);
    let fs = FileSystem::format(fd.clone()).unwrap();
    (fs, fd)
}

/// No block slot may belong to two live files.
pub fn assert_disjoint(fs: &FileSystem<impl BlockDevice>) {
    let mut seen = Vec::new();
    for name in fs.list_files() {
        for block_id in fs.chain(&name).unwrap() {
            assert!(!seen.contains(&block_id), "block {} shared by two files:\n{}", block_id, fs.dump());
            seen.push(block_id);
        }
    }
}
