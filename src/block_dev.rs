use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;

use crate::config::{BLOCK_SIZE, DISK_BLOCKS, DISK_SIZE};
use crate::error::{FsError, Result};

pub trait BlockDevice: Send + Sync {
    /// Returns the number of blocks in the block device.
    fn num_blocks(&self) -> usize;

    /// Reads a block of data from the block device.
    /// buf.len() must be equal to block_size().
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()>;

    /// Writes a block of data to the block device.
    /// buf.len() must be equal to block_size().
    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<()>;

    /// Flushes any buffered data to the block device.
    fn flush(&self) -> Result<()>;

    /// Returns the size of each block in bytes.
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }
}

/// Block device backed by a single host file.
/// Every access is an explicit seek followed by a read or write, serialized by the inner mutex
/// so concurrent readers never race on the file offset.
#[derive(Debug)]
pub struct FileDisk {
    inner: Mutex<File>,
    num_blocks: usize,
}

impl FileDisk {
    /// Opens (or creates) the backing file and sizes it to hold the whole volume.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;
        if file.metadata()?.len() < DISK_SIZE as u64 {
            file.set_len(DISK_SIZE as u64)?;
        }
        Ok(FileDisk {
            inner: Mutex::new(file),
            num_blocks: DISK_BLOCKS,
        })
    }

    fn check(&self, block_id: usize, len: usize) -> Result<u64> {
        if block_id >= self.num_blocks {
            return Err(FsError::InvalidBlockId(block_id));
        }
        if len != BLOCK_SIZE {
            return Err(FsError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("buffer of {len} bytes, expected {BLOCK_SIZE}"),
            )));
        }
        Ok((block_id * BLOCK_SIZE) as u64)
    }
}

impl BlockDevice for FileDisk {
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()> {
        let offset = self.check(block_id, buf.len())?;
        let mut file = self.inner.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<()> {
        let offset = self.check(block_id, buf.len())?;
        let mut file = self.inner.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut file = self.inner.lock();
        file.flush()?;
        file.sync_data()?;
        Ok(())
    }
}
