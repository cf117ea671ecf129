mod common;

use common::ram_fs;
use chainfs::disk::{self, decode_entry, encode_entry, encode_node};
use chainfs::{BlockNode, Entry, BLOCK_SIZE, ENTRY_SIZE, INDEX_SIZE, INDEX_TABLE_START, MAX_BLOCKS, MAX_FILES};

fn entry_bytes(raw: &[u8], slot: usize) -> &[u8] {
    &raw[slot * ENTRY_SIZE..(slot + 1) * ENTRY_SIZE]
}

fn index_bytes(raw: &[u8], block_id: usize) -> &[u8] {
    let start = INDEX_TABLE_START + block_id * INDEX_SIZE;
    &raw[start..start + INDEX_SIZE]
}

#[test]
fn test_entry_record() {
    let entry = Entry {
        name: "notes.txt".to_string(),
        size: 300,
        head: Some(3),
    };
    let record = encode_entry(&entry);
    assert_eq!(&record[..9], b"notes.txt");
    assert_eq!(&record[9..11], &[0, 0]);
    assert_eq!(&record[11..13], &[0x01, 0x2C]); // 300 big-endian
    assert_eq!(&record[13..15], &[0x00, 0x03]);
    assert_eq!(decode_entry(&record), entry);

    let free = encode_entry(&Entry::FREE);
    assert_eq!(&free[..13], &[0u8; 13]);
    assert_eq!(&free[13..15], &[0xFF, 0xFF]); // -1
    assert_eq!(decode_entry(&free), Entry::FREE);
}

#[test]
fn test_index_record() {
    let tail = encode_node(&BlockNode { block_id: 4, next: None });
    assert_eq!(tail, [0x00, 0x04, 0xFF, 0xFF]);
    let linked = encode_node(&BlockNode { block_id: 4, next: Some(7) });
    assert_eq!(linked, [0x00, 0x04, 0x00, 0x07]);
}

#[test]
fn test_formatted_metadata() {
    let (_fs, rd) = ram_fs();
    let raw = rd.raw_block(0);
    for slot in 0..MAX_FILES {
        assert_eq!(decode_entry(entry_bytes(&raw, slot)), Entry::FREE);
    }
    for block_id in 0..MAX_BLOCKS {
        let node = disk::decode_node(index_bytes(&raw, block_id));
        assert_eq!(node, BlockNode::new(block_id as u16));
    }
}

#[test]
fn test_persisted_entry_and_chain() {
    let (fs, rd) = ram_fs();
    fs.create_file("x").unwrap();
    fs.create_file("y").unwrap();
    fs.write_file("y", &vec![0xAB; 2 * BLOCK_SIZE + 10]).unwrap();

    let raw = rd.raw_block(0);
    let x = decode_entry(entry_bytes(&raw, 0));
    assert_eq!(x, Entry { name: "x".into(), size: 0, head: Some(1) });
    let y_raw = entry_bytes(&raw, 1);
    assert_eq!(&y_raw[..1], b"y");
    assert_eq!(&y_raw[11..13], &((2 * BLOCK_SIZE + 10) as u16).to_be_bytes());
    assert_eq!(&y_raw[13..15], &[0x00, 0x02]);

    // y's chain 2 -> 3 -> 4 is on disk as well.
    assert_eq!(disk::read_node(&rd, 2).unwrap().next, Some(3));
    assert_eq!(disk::read_node(&rd, 3).unwrap().next, Some(4));
    assert_eq!(disk::read_node(&rd, 4).unwrap().next, None);
    assert_eq!(disk::read_entry(&rd, 1).unwrap(), fs.stat("y").unwrap());
}

#[test]
fn test_payload_offsets_and_padding() {
    let (fs, rd) = ram_fs();
    fs.create_file("p").unwrap();
    fs.write_file("p", &vec![0x41; BLOCK_SIZE + 5]).unwrap();
    assert_eq!(fs.chain("p").unwrap(), vec![1, 2]);

    // slot i lives at byte offset BLOCK_SIZE + i * BLOCK_SIZE, i.e. device block i + 1
    assert_eq!(rd.raw_block(2), vec![0x41; BLOCK_SIZE]);
    let last = rd.raw_block(3);
    assert_eq!(&last[..5], &[0x41; 5]);
    assert!(last[5..].iter().all(|&b| b == 0), "final block must be zero padded");
}

#[test]
fn test_released_blocks_are_zeroed() {
    let (fs, rd) = ram_fs();
    fs.create_file("a").unwrap();
    fs.write_file("a", &vec![0xEE; 3 * BLOCK_SIZE]).unwrap();
    let chain = fs.chain("a").unwrap();

    fs.write_file("a", b"tiny").unwrap();
    for &block_id in &chain[1..] {
        assert_eq!(rd.raw_block(block_id as usize + 1), vec![0u8; BLOCK_SIZE]);
    }

    fs.delete_file("a").unwrap();
    for &block_id in &chain {
        assert_eq!(rd.raw_block(block_id as usize + 1), vec![0u8; BLOCK_SIZE]);
        assert_eq!(disk::read_node(&rd, block_id).unwrap().next, None);
    }
    assert_eq!(disk::read_entry(&rd, 0).unwrap(), Entry::FREE);
}
