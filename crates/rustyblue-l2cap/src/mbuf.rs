//! Buffer chains backed by a fixed block pool
//!
//! An [`Mbuf`] is a chain of segments, each one occupying a single block of
//! an [`MbufPool`]. Dropping a chain (or trimming a segment away with
//! [`Mbuf::adjust_front`]) returns its blocks to the pool, so the pool's
//! block count is a hard bound on buffered data.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::BytesMut;

use crate::l2cap::types::{L2capError, L2capResult};

/// Space left in front of the first block of a fresh chain so that headers
/// can be prepended without taking another block.
pub const MBUF_LEADING_SPACE: usize = 8;

struct PoolInner {
    block_size: usize,
    block_count: usize,
    free: AtomicUsize,
}

/// Fixed-count pool of fixed-size buffer blocks
#[derive(Clone)]
pub struct MbufPool {
    inner: Arc<PoolInner>,
}

impl MbufPool {
    /// Create a pool of `block_count` blocks of `block_size` bytes each
    pub fn new(block_count: usize, block_size: usize) -> L2capResult<Self> {
        if block_size <= MBUF_LEADING_SPACE {
            return Err(L2capError::InvalidArgument(format!(
                "mbuf block size {} must exceed leading space {}",
                block_size, MBUF_LEADING_SPACE
            )));
        }

        Ok(Self {
            inner: Arc::new(PoolInner {
                block_size,
                block_count,
                free: AtomicUsize::new(block_count),
            }),
        })
    }

    /// Size of a single block in bytes
    pub fn block_size(&self) -> usize {
        self.inner.block_size
    }

    /// Total number of blocks
    pub fn block_count(&self) -> usize {
        self.inner.block_count
    }

    /// Number of blocks not currently held by a chain
    pub fn free_blocks(&self) -> usize {
        self.inner.free.load(Ordering::Acquire)
    }

    /// Get an empty chain. Blocks are taken lazily as data is added.
    pub fn get(&self) -> Mbuf {
        Mbuf {
            pool: self.clone(),
            segs: VecDeque::new(),
            len: 0,
        }
    }

    /// Get a chain holding a copy of `data`
    pub fn from_slice(&self, data: &[u8]) -> L2capResult<Mbuf> {
        let mut om = self.get();
        om.append(data)?;
        Ok(om)
    }

    fn take_block(&self) -> Option<BytesMut> {
        self.inner
            .free
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |free| free.checked_sub(1))
            .ok()
            .map(|_| BytesMut::zeroed(self.inner.block_size))
    }

    fn put_blocks(&self, count: usize) {
        if count > 0 {
            self.inner.free.fetch_add(count, Ordering::AcqRel);
        }
    }
}

impl fmt::Debug for MbufPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MbufPool")
            .field("block_size", &self.inner.block_size)
            .field("block_count", &self.inner.block_count)
            .field("free", &self.free_blocks())
            .finish()
    }
}

/// One block plus the window of it that holds chain data
struct Segment {
    block: BytesMut,
    start: usize,
    end: usize,
}

impl Segment {
    fn len(&self) -> usize {
        self.end - self.start
    }

    fn data(&self) -> &[u8] {
        &self.block[self.start..self.end]
    }
}

/// A chain of buffer segments
pub struct Mbuf {
    pool: MbufPool,
    segs: VecDeque<Segment>,
    len: usize,
}

impl Mbuf {
    /// Total number of data bytes in the chain
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the chain holds no data
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of segments (blocks) the chain occupies
    pub fn segment_count(&self) -> usize {
        self.segs.len()
    }

    /// The pool this chain draws its blocks from
    pub fn pool(&self) -> &MbufPool {
        &self.pool
    }

    /// Copy `dst.len()` bytes starting at `off` out of the chain.
    ///
    /// Fails with [`L2capError::MessageTooShort`] if the chain does not hold
    /// that many bytes past `off`. The copy may span any number of segments.
    pub fn copy_data(&self, off: usize, dst: &mut [u8]) -> L2capResult<()> {
        match off.checked_add(dst.len()) {
            Some(end) if end <= self.len => {}
            _ => return Err(L2capError::MessageTooShort),
        }

        let mut skip = off;
        let mut copied = 0;
        for seg in &self.segs {
            if copied == dst.len() {
                break;
            }

            let data = seg.data();
            if skip >= data.len() {
                skip -= data.len();
                continue;
            }

            let chunk = &data[skip..];
            let n = chunk.len().min(dst.len() - copied);
            dst[copied..copied + n].copy_from_slice(&chunk[..n]);
            copied += n;
            skip = 0;
        }

        Ok(())
    }

    /// Copy `len` bytes starting at `off` into a new vector
    pub fn copy_out(&self, off: usize, len: usize) -> L2capResult<Vec<u8>> {
        let mut out = vec![0u8; len];
        self.copy_data(off, &mut out)?;
        Ok(out)
    }

    /// Trim `len` bytes from the front of the chain.
    ///
    /// Trimming more than the chain holds empties it. Segments left with no
    /// data are returned to the pool.
    pub fn adjust_front(&mut self, len: usize) {
        let mut remaining = len.min(self.len);
        self.len -= remaining;

        let mut released = 0;
        while remaining > 0 {
            let Some(seg) = self.segs.front_mut() else {
                break;
            };

            let n = remaining.min(seg.len());
            seg.start += n;
            remaining -= n;

            if seg.len() == 0 {
                self.segs.pop_front();
                released += 1;
            }
        }
        self.pool.put_blocks(released);
    }

    /// Make room for `len` bytes at the front of the chain and return them.
    ///
    /// Uses leading space in the first segment when there is enough of it,
    /// otherwise links a new block in front. Neither path touches the
    /// existing payload. Fails with [`L2capError::OutOfMemory`] when a block
    /// is needed and the pool has none, or when `len` exceeds a block; the
    /// chain is unchanged in that case.
    pub fn prepend(&mut self, len: usize) -> L2capResult<&mut [u8]> {
        let fits_in_front = self.segs.front().is_some_and(|seg| seg.start >= len);

        if !fits_in_front {
            if len > self.pool.block_size() {
                return Err(L2capError::OutOfMemory);
            }
            let block = self.pool.take_block().ok_or(L2capError::OutOfMemory)?;
            let end = block.len();
            self.segs.push_front(Segment {
                block,
                start: end,
                end,
            });
        }

        let seg = self
            .segs
            .front_mut()
            .ok_or(L2capError::OutOfMemory)?;
        seg.start -= len;
        self.len += len;
        Ok(&mut seg.block[seg.start..seg.start + len])
    }

    /// Append a copy of `data` to the end of the chain, taking blocks as needed.
    ///
    /// On [`L2capError::OutOfMemory`] the bytes that fit remain appended.
    pub fn append(&mut self, data: &[u8]) -> L2capResult<()> {
        let mut rest = data;

        while !rest.is_empty() {
            let needs_block = self
                .segs
                .back()
                .map_or(true, |seg| seg.end == seg.block.len());

            if needs_block {
                let block = self.pool.take_block().ok_or(L2capError::OutOfMemory)?;
                let start = if self.segs.is_empty() {
                    MBUF_LEADING_SPACE
                } else {
                    0
                };
                self.segs.push_back(Segment {
                    block,
                    start,
                    end: start,
                });
            }

            if let Some(seg) = self.segs.back_mut() {
                let n = rest.len().min(seg.block.len() - seg.end);
                seg.block[seg.end..seg.end + n].copy_from_slice(&rest[..n]);
                seg.end += n;
                self.len += n;
                rest = &rest[n..];
            }
        }

        Ok(())
    }

    /// Flatten the chain into a contiguous vector
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for seg in &self.segs {
            out.extend_from_slice(seg.data());
        }
        out
    }
}

impl Drop for Mbuf {
    fn drop(&mut self) {
        self.pool.put_blocks(self.segs.len());
    }
}

impl fmt::Debug for Mbuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mbuf")
            .field("len", &self.len)
            .field("segments", &self.segs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_spans_blocks() {
        let pool = MbufPool::new(8, 16).unwrap();
        let data: Vec<u8> = (0..40).collect();
        let om = pool.from_slice(&data).unwrap();

        // First block carries leading space, so 8 + 16 + 16 bytes of room
        assert_eq!(om.len(), 40);
        assert_eq!(om.segment_count(), 3);
        assert_eq!(om.to_vec(), data);
        assert_eq!(pool.free_blocks(), 5);

        drop(om);
        assert_eq!(pool.free_blocks(), 8);
    }

    #[test]
    fn test_copy_data_across_segments() {
        let pool = MbufPool::new(8, 12).unwrap();
        let data: Vec<u8> = (0..20).collect();
        let om = pool.from_slice(&data).unwrap();
        assert!(om.segment_count() > 1);

        assert_eq!(om.copy_out(2, 6).unwrap(), vec![2, 3, 4, 5, 6, 7]);
        assert_eq!(om.copy_out(16, 4).unwrap(), vec![16, 17, 18, 19]);
        assert!(matches!(om.copy_out(17, 4), Err(L2capError::MessageTooShort)));
        assert!(matches!(om.copy_out(usize::MAX, 1), Err(L2capError::MessageTooShort)));
    }

    #[test]
    fn test_adjust_front_releases_blocks() {
        let pool = MbufPool::new(4, 12).unwrap();
        let data: Vec<u8> = (0..10).collect();
        let mut om = pool.from_slice(&data).unwrap();
        assert_eq!(om.segment_count(), 2);
        assert_eq!(pool.free_blocks(), 2);

        // First segment holds 4 bytes, second 12 (only 6 used)
        om.adjust_front(5);
        assert_eq!(om.len(), 5);
        assert_eq!(om.to_vec(), vec![5, 6, 7, 8, 9]);
        assert_eq!(om.segment_count(), 1);
        assert_eq!(pool.free_blocks(), 3);

        om.adjust_front(100);
        assert!(om.is_empty());
        assert_eq!(pool.free_blocks(), 4);
    }

    #[test]
    fn test_prepend_uses_leading_space() {
        let pool = MbufPool::new(2, 32).unwrap();
        let mut om = pool.from_slice(&[9, 9]).unwrap();

        om.prepend(4).unwrap().copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(om.segment_count(), 1);
        assert_eq!(om.to_vec(), vec![1, 2, 3, 4, 9, 9]);
        assert_eq!(pool.free_blocks(), 1);
    }

    #[test]
    fn test_prepend_links_new_block() {
        let pool = MbufPool::new(2, 32).unwrap();
        let mut om = pool.from_slice(&[7]).unwrap();
        om.prepend(MBUF_LEADING_SPACE).unwrap().fill(0xAA);

        // Leading space used up; next prepend needs a block
        om.prepend(2).unwrap().copy_from_slice(&[1, 2]);
        assert_eq!(om.segment_count(), 2);
        assert_eq!(om.len(), MBUF_LEADING_SPACE + 3);
        assert_eq!(&om.to_vec()[..3], &[1, 2, 0xAA]);
        assert_eq!(pool.free_blocks(), 0);

        // 30 bytes of leading space remain in the new block, pool is empty
        let before = om.to_vec();
        assert!(matches!(om.prepend(31), Err(L2capError::OutOfMemory)));
        assert_eq!(om.to_vec(), before);
        assert_eq!(om.len(), MBUF_LEADING_SPACE + 3);
    }

    #[test]
    fn test_prepend_on_empty_chain() {
        let pool = MbufPool::new(1, 16).unwrap();
        let mut om = pool.get();
        om.prepend(4).unwrap().copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(om.to_vec(), vec![1, 2, 3, 4]);
        assert!(matches!(pool.get().prepend(1), Err(L2capError::OutOfMemory)));
    }

    #[test]
    fn test_pool_rejects_tiny_blocks() {
        assert!(matches!(
            MbufPool::new(4, MBUF_LEADING_SPACE),
            Err(L2capError::InvalidArgument(_))
        ));
    }
}
