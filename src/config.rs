pub const BLOCK_SIZE: usize = 128;
pub const MAX_FILES: usize = 5; // Number of directory slots
pub const MAX_BLOCKS: usize = 10; // Number of data block slots
pub const RESERVED_BLOCK: u16 = 0; // Block slot hosting the metadata region, never allocated

pub const MAX_FILE_NAME_LEN: usize = 11;
pub const MAX_FILE_SIZE: usize = i16::MAX as usize; // Size field is a signed 16-bit quantity

pub const ENTRY_SIZE: usize = MAX_FILE_NAME_LEN + 2 + 2; // name + size + head
pub const INDEX_SIZE: usize = 2 + 2; // block id + next

pub const METADATA_BLOCK_ID: usize = 0; // Device block holding entry and index records
pub const ENTRY_TABLE_START: usize = 0;
pub const INDEX_TABLE_START: usize = ENTRY_TABLE_START + MAX_FILES * ENTRY_SIZE;
pub const METADATA_SIZE: usize = INDEX_TABLE_START + MAX_BLOCKS * INDEX_SIZE;

pub const DISK_BLOCKS: usize = MAX_BLOCKS + 1; // Metadata block followed by the data slots
pub const DISK_SIZE: usize = DISK_BLOCKS * BLOCK_SIZE;

const _: () = assert!(METADATA_SIZE <= BLOCK_SIZE);
const _: () = assert!(MAX_BLOCKS <= i16::MAX as usize);
// Any content larger than the size field can hold already fails the block accounting.
const _: () = assert!(MAX_BLOCKS * BLOCK_SIZE <= MAX_FILE_SIZE);
