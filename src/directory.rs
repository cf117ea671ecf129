//! The directory table: a fixed number of entry slots, one per file.
//! Slots are handed out lowest index first, so reuse order is deterministic.

use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::Entry;

/// Checks a file name can be stored in an entry record and carried by the text protocol.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == '\0') {
        return Err(FsError::InvalidName);
    }
    if name.len() > MAX_FILE_NAME_LEN {
        return Err(FsError::NameTooLong);
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DirectoryTable {
    entries: Vec<Entry>,
}

impl DirectoryTable {
    pub fn new() -> Self {
        Self {
            entries: vec![Entry::FREE; MAX_FILES],
        }
    }

    /// Slot index of the live entry called `name`.
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        self.entries.iter().position(|e| e.name == name)
    }

    /// First free slot in slot order. The slot stays free until the caller fills it.
    pub fn allocate_slot(&self) -> Result<usize> {
        self.entries
            .iter()
            .position(Entry::is_free)
            .ok_or(FsError::CapacityExceeded)
    }

    pub fn free(&mut self, slot: usize) {
        self.entries[slot] = Entry::FREE;
    }

    pub fn get(&self, slot: usize) -> &Entry {
        &self.entries[slot]
    }

    pub fn set(&mut self, slot: usize, entry: Entry) {
        self.entries[slot] = entry;
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Live entries with their slot index, in slot order.
    pub fn live(&self) -> impl Iterator<Item = (usize, &Entry)> {
        self.entries.iter().enumerate().filter(|(_, e)| !e.is_free())
    }

    pub fn names(&self) -> Vec<String> {
        self.live().map(|(_, e)| e.name.clone()).collect()
    }
}

impl Default for DirectoryTable {
    fn default() -> Self {
        Self::new()
    }
}
