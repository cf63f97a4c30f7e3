//! Fixed-capacity channel pool
//!
//! Channel objects live in an arena of slots sized once by [`ChannelPool::init`].
//! Free slots are threaded on an index free list, so allocation and release
//! are O(1) and the pool never grows past its capacity.

use log::{debug, info};

use super::channel::L2capChannel;
use super::types::*;

/// Handle to a channel allocated from a [`ChannelPool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelHandle {
    index: u16,
    generation: u32,
}

impl ChannelHandle {
    /// Slot index of the channel within its pool
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

#[derive(Default)]
struct Slot {
    chan: L2capChannel,
    generation: u32,
    live: bool,
}

/// Fixed-capacity allocator of L2CAP channel objects
#[derive(Default)]
pub struct ChannelPool {
    slots: Vec<Slot>,
    free_list: Vec<u16>,
}

impl ChannelPool {
    /// Create an uninitialised pool. [`ChannelPool::alloc`] fails until
    /// [`ChannelPool::init`] succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool initialised for `capacity` channels
    pub fn with_capacity(capacity: usize) -> L2capResult<Self> {
        let mut pool = Self::new();
        pool.init(capacity)?;
        Ok(pool)
    }

    /// (Re)initialise the pool for `capacity` channels.
    ///
    /// Any previous backing region is released first, together with every
    /// channel still allocated from it. On failure the pool is left
    /// uninitialised.
    pub fn init(&mut self, capacity: usize) -> L2capResult<()> {
        self.release();

        if let Err(err) = self.build(capacity) {
            self.release();
            return Err(err);
        }

        info!("L2CAP channel pool initialised with {} slots", capacity);
        Ok(())
    }

    fn build(&mut self, capacity: usize) -> L2capResult<()> {
        if capacity == 0 || capacity > u16::MAX as usize + 1 {
            return Err(L2capError::InvalidArgument(format!(
                "channel pool capacity {} out of range",
                capacity
            )));
        }

        self.slots
            .try_reserve_exact(capacity)
            .map_err(|_| L2capError::OutOfMemory)?;
        self.free_list
            .try_reserve_exact(capacity)
            .map_err(|_| L2capError::OutOfMemory)?;

        self.slots.resize_with(capacity, Slot::default);
        // Lowest index is handed out first
        self.free_list.extend((0..capacity).rev().map(|i| i as u16));
        Ok(())
    }

    fn release(&mut self) {
        self.slots = Vec::new();
        self.free_list = Vec::new();
    }

    /// Whether the pool has a backing region
    pub fn is_initialized(&self) -> bool {
        !self.slots.is_empty()
    }

    /// Number of slots in the pool
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of channels currently allocated
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// Allocate a zero-initialised channel.
    ///
    /// Returns `None` when every slot is in use; only a [`ChannelPool::free`]
    /// makes a later attempt succeed.
    pub fn alloc(&mut self) -> Option<ChannelHandle> {
        let Some(index) = self.free_list.pop() else {
            debug!("L2CAP channel pool exhausted ({} slots)", self.slots.len());
            return None;
        };

        let slot = &mut self.slots[index as usize];
        slot.chan = L2capChannel::default();
        slot.live = true;

        Some(ChannelHandle {
            index,
            generation: slot.generation,
        })
    }

    /// Return a channel to the pool. Passing `None` does nothing.
    ///
    /// # Panics
    ///
    /// If the handle does not refer to a channel currently allocated from
    /// this pool (double free or foreign handle).
    pub fn free(&mut self, handle: impl Into<Option<ChannelHandle>>) {
        let Some(handle) = handle.into() else {
            return;
        };

        let slot = self
            .slots
            .get_mut(handle.index())
            .filter(|slot| slot.live && slot.generation == handle.generation);
        let Some(slot) = slot else {
            panic!("L2CAP channel pool: free of unowned handle {:?}", handle);
        };

        // Dropping the channel releases its handler and any buffer it holds
        slot.chan = L2capChannel::default();
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
    }

    /// Get an allocated channel
    pub fn get(&self, handle: ChannelHandle) -> Option<&L2capChannel> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.live && slot.generation == handle.generation)
            .map(|slot| &slot.chan)
    }

    /// Get an allocated channel mutably
    pub fn get_mut(&mut self, handle: ChannelHandle) -> Option<&mut L2capChannel> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.live && slot.generation == handle.generation)
            .map(|slot| &mut slot.chan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialised_pool() {
        let mut pool = ChannelPool::new();
        assert!(!pool.is_initialized());
        assert!(pool.alloc().is_none());
        pool.free(None::<ChannelHandle>);
    }

    #[test]
    fn test_init_rejects_bad_capacity() {
        let mut pool = ChannelPool::with_capacity(4).unwrap();
        assert!(matches!(pool.init(0), Err(L2capError::InvalidArgument(_))));
        // A failed init leaves nothing behind
        assert!(!pool.is_initialized());
        assert!(pool.alloc().is_none());

        assert!(matches!(
            pool.init(u16::MAX as usize + 2),
            Err(L2capError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_reinit_discards_channels() {
        let mut pool = ChannelPool::with_capacity(2).unwrap();
        let handle = pool.alloc().unwrap();
        pool.alloc().unwrap();
        assert!(pool.alloc().is_none());

        pool.init(3).unwrap();
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.live_count(), 0);
        assert!(pool.get(handle).is_none());
        for _ in 0..3 {
            assert!(pool.alloc().is_some());
        }
    }

    #[test]
    fn test_stale_handle_after_free() {
        let mut pool = ChannelPool::with_capacity(1).unwrap();
        let first = pool.alloc().unwrap();
        pool.free(first);

        let second = pool.alloc().unwrap();
        assert_eq!(first.index(), second.index());
        assert!(pool.get(first).is_none());
        assert!(pool.get(second).is_some());
    }

    #[test]
    #[should_panic(expected = "free of unowned handle")]
    fn test_double_free_panics() {
        let mut pool = ChannelPool::with_capacity(2).unwrap();
        let handle = pool.alloc().unwrap();
        pool.free(handle);
        pool.free(handle);
    }
}
