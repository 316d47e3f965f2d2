//! Byte-level copy/insert delta encoding.
//!
//! A delta is a sequence of instructions that rebuild a target from a
//! reference:
//!
//! ```text
//! 0x00 <len:varint> <len bytes>       insert literal bytes
//! 0x01 <offset:varint> <len:varint>   copy len bytes from reference[offset..]
//! ```
//!
//! Varints are LEB128. Matches are found greedily through a 4-byte block
//! index over the reference, then extended as far as they go.

use rustc_hash::FxHashMap;

/// Shortest run worth a copy instruction
pub const MIN_MATCH: usize = 4;

const OP_INSERT: u8 = 0x00;
const OP_COPY: u8 = 0x01;

/// Encode `target` as a delta against `reference`
#[must_use]
pub fn encode(reference: &[u8], target: &[u8]) -> Vec<u8> {
    let index = BlockIndex::build(reference);
    let mut out = Vec::with_capacity(target.len() / 4 + 8);
    let mut literal_start = 0;
    let mut pos = 0;

    while pos + MIN_MATCH <= target.len() {
        match index.longest_match(reference, &target[pos..]) {
            Some((offset, len)) => {
                emit_insert(&mut out, &target[literal_start..pos]);
                emit_copy(&mut out, offset, len);
                pos += len;
                literal_start = pos;
            }
            None => pos += 1,
        }
    }
    emit_insert(&mut out, &target[literal_start..]);
    out
}

/// Rebuild a target from `reference` and `delta`; `None` if the delta is malformed
#[must_use]
pub fn apply(reference: &[u8], delta: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    let mut cursor = delta;
    while let Some((&op, rest)) = cursor.split_first() {
        cursor = rest;
        match op {
            OP_INSERT => {
                let (len, rest) = read_varint(cursor)?;
                let len = usize::try_from(len).ok()?;
                let bytes = rest.get(..len)?;
                out.extend_from_slice(bytes);
                cursor = &rest[len..];
            }
            OP_COPY => {
                let (offset, rest) = read_varint(cursor)?;
                let (len, rest) = read_varint(rest)?;
                let start = usize::try_from(offset).ok()?;
                let end = start.checked_add(usize::try_from(len).ok()?)?;
                out.extend_from_slice(reference.get(start..end)?);
                cursor = rest;
            }
            _ => return None,
        }
    }
    Some(out)
}

/// First reference offset of every distinct 4-byte block
struct BlockIndex {
    blocks: FxHashMap<[u8; MIN_MATCH], usize>,
}

impl BlockIndex {
    fn build(reference: &[u8]) -> Self {
        let mut blocks = FxHashMap::default();
        for (offset, window) in reference.windows(MIN_MATCH).enumerate() {
            let mut key = [0u8; MIN_MATCH];
            key.copy_from_slice(window);
            blocks.entry(key).or_insert(offset);
        }
        Self { blocks }
    }

    fn longest_match(&self, reference: &[u8], target: &[u8]) -> Option<(usize, usize)> {
        let mut key = [0u8; MIN_MATCH];
        key.copy_from_slice(target.get(..MIN_MATCH)?);
        let &offset = self.blocks.get(&key)?;
        let len = reference[offset..]
            .iter()
            .zip(target)
            .take_while(|(a, b)| a == b)
            .count();
        (len >= MIN_MATCH).then_some((offset, len))
    }
}

fn emit_insert(out: &mut Vec<u8>, bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    out.push(OP_INSERT);
    write_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

fn emit_copy(out: &mut Vec<u8>, offset: usize, len: usize) {
    out.push(OP_COPY);
    write_varint(out, offset as u64);
    write_varint(out, len as u64);
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn read_varint(input: &[u8]) -> Option<(u64, &[u8])> {
    let mut value = 0u64;
    for (i, &byte) in input.iter().enumerate().take(10) {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, &input[i + 1..]));
        }
    }
    None
}
