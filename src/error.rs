use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("file {0} does not exist")]
    NotFound(String),
    #[error("file {0} already exists")]
    AlreadyExists(String),
    #[error("maximum number of files reached")]
    CapacityExceeded,
    #[error("file too large")]
    NoSpace,
    #[error("filename too large")]
    NameTooLong,
    #[error("invalid filename")]
    InvalidName,
    #[error("directory slot {0} is out of range")]
    InvalidSlot(usize),
    #[error("block {0} is out of range")]
    InvalidBlockId(usize),
    #[error("device has {found} blocks, {needed} required")]
    DeviceTooSmall { found: usize, needed: usize },
    #[error("storage failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, FsError>;
