// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Chunked content store and block-wise windows.
//!
//! Content lives in an immutable snapshot swapped atomically on every write,
//! so a reader always sees a length that matches the bytes it reads. The
//! transport slices large bodies into blocks across several exchanges; the
//! snapshot etag lets it notice a write landing mid-transfer.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::config::ConfigError;
use crate::error::SiteError;

/// Filler appended by the default padding policy.
pub const DEFAULT_FILLER: &[u8] = b"0123456789\n";

/// Content is padded until its length exceeds this many bytes.
pub const DEFAULT_PAD_THRESHOLD: usize = 1024;

// ---------------------------------------------------------------------------
// Padding policy
// ---------------------------------------------------------------------------

/// Pads short content with a filler sequence so it always spans several
/// blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddingPolicy {
    filler: Vec<u8>,
    threshold: usize,
}

impl PaddingPolicy {
    pub fn new(filler: impl Into<Vec<u8>>, threshold: usize) -> Result<Self, SiteError> {
        let filler = filler.into();
        if filler.is_empty() && threshold > 0 {
            return Err(
                ConfigError::Invalid("padding filler must not be empty".into()).into(),
            );
        }
        Ok(Self { filler, threshold })
    }

    /// Never pads.
    pub fn none() -> Self {
        Self {
            filler: Vec::new(),
            threshold: 0,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Append whole filler sequences while `content.len() <= threshold`.
    pub fn apply(&self, mut content: Vec<u8>) -> Vec<u8> {
        if self.filler.is_empty() {
            return content;
        }
        while content.len() <= self.threshold {
            content.extend_from_slice(&self.filler);
        }
        content
    }
}

impl Default for PaddingPolicy {
    fn default() -> Self {
        Self {
            filler: DEFAULT_FILLER.to_vec(),
            threshold: DEFAULT_PAD_THRESHOLD,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable view of the stored content at one version.
#[derive(Debug, PartialEq, Eq)]
pub struct ContentSnapshot {
    bytes: Vec<u8>,
    etag: u64,
}

impl ContentSnapshot {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Version bumped on every mutation of the store.
    pub fn etag(&self) -> u64 {
        self.etag
    }

    /// Up to `max_len` bytes from `offset`, clipped to the content length.
    pub fn read(&self, offset: usize, max_len: usize) -> &[u8] {
        let start = offset.min(self.bytes.len());
        let end = start.saturating_add(max_len).min(self.bytes.len());
        &self.bytes[start..end]
    }

    /// Serve one block-wise window. The returned option has `more` set when
    /// further blocks follow.
    pub fn read_block(&self, block: BlockOption) -> Result<(&[u8], BlockOption), SiteError> {
        let offset = block.offset();
        if offset >= self.bytes.len() && !(offset == 0 && self.bytes.is_empty()) {
            return Err(SiteError::BadRequest(format!(
                "block {} starts past the end of {} bytes",
                block.num,
                self.bytes.len()
            )));
        }
        let data = self.read(offset, block.size());
        let more = offset + data.len() < self.bytes.len();
        Ok((
            data,
            BlockOption {
                num: block.num,
                more,
                size_exponent: block.size_exponent,
            },
        ))
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Byte payload that may exceed a single message, with range reads and
/// atomic replacement.
#[derive(Debug)]
pub struct ChunkedContent {
    current: ArcSwap<ContentSnapshot>,
    policy: PaddingPolicy,
    /// Serializes writers so etags stay strictly increasing.
    write_lock: Mutex<()>,
}

impl ChunkedContent {
    /// Create a store; `initial` is padded like any replacement.
    pub fn new(initial: impl Into<Vec<u8>>, policy: PaddingPolicy) -> Self {
        let bytes = policy.apply(initial.into());
        Self {
            current: ArcSwap::from_pointee(ContentSnapshot { bytes, etag: 0 }),
            policy,
            write_lock: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Arc<ContentSnapshot> {
        self.current.load_full()
    }

    pub fn read(&self, offset: usize, max_len: usize) -> Vec<u8> {
        self.current.load().read(offset, max_len).to_vec()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    pub fn etag(&self) -> u64 {
        self.current.load().etag
    }

    pub fn policy(&self) -> &PaddingPolicy {
        &self.policy
    }

    /// Swap in new content, padded per policy. Returns the new snapshot.
    pub fn replace(&self, content: impl Into<Vec<u8>>) -> Arc<ContentSnapshot> {
        let bytes = self.policy.apply(content.into());
        let _guard = self.write_lock.lock();
        let etag = self.current.load().etag + 1;
        let next = Arc::new(ContentSnapshot { bytes, etag });
        self.current.store(Arc::clone(&next));
        next
    }

    /// Concatenate without re-padding.
    pub fn append(&self, data: &[u8]) -> Arc<ContentSnapshot> {
        let _guard = self.write_lock.lock();
        let prev = self.current.load();
        let mut bytes = Vec::with_capacity(prev.len() + data.len());
        bytes.extend_from_slice(prev.bytes());
        bytes.extend_from_slice(data);
        let next = Arc::new(ContentSnapshot {
            bytes,
            etag: prev.etag + 1,
        });
        self.current.store(Arc::clone(&next));
        next
    }
}

// ---------------------------------------------------------------------------
// Block option
// ---------------------------------------------------------------------------

/// Block-wise transfer position: block number, more-flag and size exponent.
/// Block size is `2^(size_exponent + 4)`, i.e. 16 to 1024 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockOption {
    pub num: u32,
    pub more: bool,
    pub size_exponent: u8,
}

impl BlockOption {
    pub const MAX_SIZE_EXPONENT: u8 = 6;
    /// Block numbers are 20 bits on the wire.
    pub const MAX_NUM: u32 = (1 << 20) - 1;

    pub fn new(num: u32, more: bool, size_exponent: u8) -> Result<Self, SiteError> {
        if size_exponent > Self::MAX_SIZE_EXPONENT {
            return Err(SiteError::BadRequest(format!(
                "block size exponent {} out of range",
                size_exponent
            )));
        }
        if num > Self::MAX_NUM {
            return Err(SiteError::BadRequest(format!(
                "block number {} out of range",
                num
            )));
        }
        Ok(Self {
            num,
            more,
            size_exponent,
        })
    }

    /// Smallest exponent whose block size is at least `size` (capped at 1024).
    pub fn exponent_for(size: usize) -> u8 {
        let mut szx = 0u8;
        while szx < Self::MAX_SIZE_EXPONENT && (16usize << szx) < size {
            szx += 1;
        }
        szx
    }

    pub fn size(&self) -> usize {
        16usize << self.size_exponent
    }

    pub fn offset(&self) -> usize {
        self.num as usize * self.size()
    }

    /// Option value encoding: `num << 4 | more << 3 | szx`.
    pub fn encode(&self) -> u32 {
        (self.num << 4) | (u32::from(self.more) << 3) | u32::from(self.size_exponent)
    }

    pub fn decode(value: u32) -> Result<Self, SiteError> {
        let szx = (value & 0x7) as u8;
        if szx == 7 {
            return Err(SiteError::BadRequest("reserved block size exponent 7".into()));
        }
        Self::new(value >> 4, value & 0x8 != 0, szx)
    }
}

// ---------------------------------------------------------------------------
// Inbound assembly
// ---------------------------------------------------------------------------

/// Collects the sequential blocks of one upload and yields the body once the
/// final block (more = false) arrives.
#[derive(Debug, Default)]
pub struct BlockAssembler {
    buffer: Vec<u8>,
    next_num: u32,
    size_exponent: Option<u8>,
}

impl BlockAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one block. Block 0 always restarts assembly. Returns the full
    /// body when `block.more` is false.
    pub fn insert(&mut self, block: BlockOption, data: &[u8]) -> Result<Option<Vec<u8>>, SiteError> {
        if block.num == 0 {
            self.reset();
        } else if block.num != self.next_num || self.size_exponent != Some(block.size_exponent) {
            let expected = self.next_num;
            self.reset();
            return Err(SiteError::RequestEntityIncomplete {
                expected,
                received: block.num,
            });
        }

        if block.more && data.len() != block.size() {
            self.reset();
            return Err(SiteError::BadRequest(format!(
                "intermediate block {} carries {} bytes, expected {}",
                block.num,
                data.len(),
                block.size()
            )));
        }

        self.size_exponent = Some(block.size_exponent);
        self.buffer.extend_from_slice(data);
        self.next_num = block.num + 1;

        if block.more {
            Ok(None)
        } else {
            let body = std::mem::take(&mut self.buffer);
            self.reset();
            Ok(Some(body))
        }
    }

    /// True when no upload is in progress.
    pub fn is_idle(&self) -> bool {
        self.size_exponent.is_none()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.next_num = 0;
        self.size_exponent = None;
    }
}

/// Split `data` into consecutive blocks of `2^(szx+4)` bytes.
pub fn split_blocks(data: &[u8], size_exponent: u8) -> Result<Vec<(BlockOption, Vec<u8>)>, SiteError> {
    let first = BlockOption::new(0, false, size_exponent)?;
    let size = first.size();
    if data.is_empty() {
        return Ok(vec![(first, Vec::new())]);
    }
    let total = data.len().div_ceil(size);
    let mut blocks = Vec::with_capacity(total);
    for (num, chunk) in data.chunks(size).enumerate() {
        let option = BlockOption::new(num as u32, num + 1 < total, size_exponent)?;
        blocks.push((option, chunk.to_vec()));
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_exceeds_threshold() {
        let store = ChunkedContent::new(Vec::new(), PaddingPolicy::default());
        store.replace(b"hi".to_vec());
        let snap = store.snapshot();
        assert!(snap.bytes().starts_with(b"hi"));
        assert!(snap.len() > DEFAULT_PAD_THRESHOLD);
        // Padding is made of whole filler sequences.
        assert_eq!((snap.len() - 2) % DEFAULT_FILLER.len(), 0);
    }

    #[test]
    fn test_long_content_not_padded() {
        let store = ChunkedContent::new(Vec::new(), PaddingPolicy::default());
        let long = vec![b'a'; 2000];
        store.replace(long.clone());
        assert_eq!(store.snapshot().bytes(), long.as_slice());
    }

    #[test]
    fn test_empty_filler_is_config_error() {
        let err = PaddingPolicy::new(Vec::new(), 16).unwrap_err();
        assert!(matches!(err, SiteError::Config(ConfigError::Invalid(_))));
        assert_eq!(
            err.response_code(),
            crate::message::ResponseCode::InternalServerError
        );
        assert!(PaddingPolicy::new(Vec::new(), 0).is_ok());
    }

    #[test]
    fn test_replace_length_at_least_input() {
        let store = ChunkedContent::new(Vec::new(), PaddingPolicy::default());
        for n in [0usize, 1, 1024, 1025, 4096] {
            store.replace(vec![7u8; n]);
            assert!(store.len() >= n);
            assert!(store.len() > DEFAULT_PAD_THRESHOLD);
        }
    }

    #[test]
    fn test_read_clips_to_length() {
        let store = ChunkedContent::new(b"abcdef".to_vec(), PaddingPolicy::none());
        assert_eq!(store.read(0, 3), b"abc");
        assert_eq!(store.read(4, 100), b"ef");
        assert!(store.read(6, 10).is_empty());
        assert!(store.read(600, 10).is_empty());
    }

    #[test]
    fn test_sequential_reads_reproduce_content() {
        let store = ChunkedContent::new(b"round trip".to_vec(), PaddingPolicy::default());
        let total = store.len();
        let mut out = Vec::new();
        let mut offset = 0;
        while offset < total {
            let chunk = store.read(offset, 64);
            offset += chunk.len();
            out.extend(chunk);
        }
        assert_eq!(out, store.snapshot().bytes());
    }

    #[test]
    fn test_append_does_not_pad() {
        let store = ChunkedContent::new(Vec::new(), PaddingPolicy::none());
        store.append(b"ab");
        store.append(b"cd");
        assert_eq!(store.snapshot().bytes(), b"abcd");
    }

    #[test]
    fn test_etag_increases_on_write() {
        let store = ChunkedContent::new(b"x".to_vec(), PaddingPolicy::none());
        let first = store.etag();
        store.replace(b"y".to_vec());
        let second = store.etag();
        store.append(b"z");
        assert!(second > first);
        assert!(store.etag() > second);
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let store = ChunkedContent::new(b"old".to_vec(), PaddingPolicy::none());
        let before = store.snapshot();
        store.replace(b"new content".to_vec());
        assert_eq!(before.bytes(), b"old");
        assert_eq!(before.len(), 3);
        assert_eq!(store.snapshot().bytes(), b"new content");
    }

    #[test]
    fn test_concurrent_readers_see_consistent_snapshots() {
        let store = Arc::new(ChunkedContent::new(vec![b'a'; 100], PaddingPolicy::none()));
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..200u8 {
                    let len = 50 + usize::from(i);
                    store.replace(vec![i; len]);
                }
            })
        };
        for _ in 0..500 {
            let snap = store.snapshot();
            let first = snap.bytes()[0];
            assert!(snap.bytes().iter().all(|&b| b == first));
        }
        writer.join().expect("writer");
    }

    #[test]
    fn test_block_option_codec() {
        let opt = BlockOption::new(5, true, 2).expect("valid");
        assert_eq!(opt.size(), 64);
        assert_eq!(opt.offset(), 320);
        assert_eq!(BlockOption::decode(opt.encode()).expect("decode"), opt);
        assert!(BlockOption::decode(0x7).is_err());
        assert!(BlockOption::new(0, false, 7).is_err());
    }

    #[test]
    fn test_exponent_for() {
        assert_eq!(BlockOption::exponent_for(1), 0);
        assert_eq!(BlockOption::exponent_for(16), 0);
        assert_eq!(BlockOption::exponent_for(17), 1);
        assert_eq!(BlockOption::exponent_for(1024), 6);
        assert_eq!(BlockOption::exponent_for(5000), 6);
    }

    #[test]
    fn test_read_block_windows() {
        let store = ChunkedContent::new(vec![1u8; 100], PaddingPolicy::none());
        let snap = store.snapshot();

        let (data, opt) = snap.read_block(BlockOption::new(0, false, 2).expect("opt")).expect("read");
        assert_eq!(data.len(), 64);
        assert!(opt.more);

        let (data, opt) = snap.read_block(BlockOption::new(1, false, 2).expect("opt")).expect("read");
        assert_eq!(data.len(), 36);
        assert!(!opt.more);

        assert!(snap.read_block(BlockOption::new(2, false, 2).expect("opt")).is_err());
    }

    #[test]
    fn test_assembler_in_order() {
        let body: Vec<u8> = (0..40u8).collect();
        let mut asm = BlockAssembler::new();
        let blocks = split_blocks(&body, 0).expect("split");
        assert_eq!(blocks.len(), 3);

        let mut result = None;
        for (opt, data) in blocks {
            result = asm.insert(opt, &data).expect("insert");
        }
        assert_eq!(result, Some(body));
        assert!(asm.is_idle());
    }

    #[test]
    fn test_assembler_out_of_order() {
        let mut asm = BlockAssembler::new();
        asm.insert(BlockOption::new(0, true, 0).expect("opt"), &[0u8; 16])
            .expect("first");
        let err = asm
            .insert(BlockOption::new(2, false, 0).expect("opt"), b"x")
            .unwrap_err();
        assert!(matches!(
            err,
            SiteError::RequestEntityIncomplete {
                expected: 1,
                received: 2
            }
        ));
        assert!(asm.is_idle());
    }

    #[test]
    fn test_assembler_restart_on_block_zero() {
        let mut asm = BlockAssembler::new();
        asm.insert(BlockOption::new(0, true, 0).expect("opt"), &[9u8; 16])
            .expect("first");
        let body = asm
            .insert(BlockOption::new(0, false, 0).expect("opt"), b"fresh")
            .expect("restart");
        assert_eq!(body, Some(b"fresh".to_vec()));
    }

    #[test]
    fn test_assembler_short_intermediate_block() {
        let mut asm = BlockAssembler::new();
        let err = asm
            .insert(BlockOption::new(0, true, 0).expect("opt"), b"short")
            .unwrap_err();
        assert!(matches!(err, SiteError::BadRequest(_)));
    }
}
