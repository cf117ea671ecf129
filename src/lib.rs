//! Chainfs is a tiny single-volume file system living in one fixed-size backing file.
//! Flat namespace, whole-file reads and writes, no permissions or timestamps.
//!
//! Chainfs's linear layout:
//! - Metadata block: entry records, then one index record per block slot
//! - Data blocks: `MAX_BLOCKS` slots of `BLOCK_SIZE` bytes
//!
//! A file is an entry (name, size, head) plus a singly linked chain of block slots.
//!
//! Chainfs's layers (from bottom to top):
//! 1. Block Device: storage abstraction, `FileDisk` for a host file.     Device synchronization  | Fs implemented or user supplied
//! 2. Disk: byte-exact encoding of records and payloads.                  Called under volume lock | Fs implemented
//! 3. Directory/Bitmap: entry table, free set and chain arena.           Called under volume lock | Fs implemented
//! 4. FileSystem: create/delete/write/read/list behind one RwLock.       Volume synchronization  | Fs implemented
//! 5. Server: line protocol, one thread per connection.                                           | Fs implemented

mod config;
mod block_dev;
mod structs;
mod bitmap;
mod directory;
mod fs;
mod error;
pub mod disk;
pub mod server;

pub use block_dev::{BlockDevice, FileDisk};
pub use config::*;
pub use structs::*;
pub use bitmap::BlockAllocator;
pub use directory::{validate_name, DirectoryTable};
pub use fs::FileSystem;
pub use server::{handle_command, Reply, Server};
pub use error::FsError as Error;
pub use error::Result;
