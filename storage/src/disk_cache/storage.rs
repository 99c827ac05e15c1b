use super::{block_count, Array, Config, Error, Metrics, Position};
use crate::Element;
use blockcache_runtime::{Blob, Storage};
use prometheus_client::registry::Registry;
use tracing::{debug, error, trace};

/// Bookkeeping for one block-sized region of the arena.
#[derive(Clone, Copy, Default)]
struct Slot {
    /// The tally value at the most recent access. Zero if never used.
    recency: u64,

    /// The block held by this slot, if any.
    block: Option<u64>,

    /// Whether the block was handed out mutably since it was loaded or last written back.
    dirty: bool,
}

/// State created by [Cache::init].
struct State<T: Element, B: Blob, const BLOCK_LEN: usize> {
    blob: B,
    block_count: u64,
    len: u64,

    /// The next recency stamp. Starts at 1 so that a zero recency means "never used".
    tally: u64,

    slots: Vec<Slot>,

    /// Element storage for every slot: slot `i` owns `data[i * BLOCK_LEN..(i + 1) * BLOCK_LEN]`.
    data: Vec<T>,

    /// Maps each block to the slot holding it.
    ///
    /// # Invariants
    ///
    /// `table[b] == Some(i)` if and only if `slots[i].block == Some(b)`.
    table: Vec<Option<usize>>,

    /// Encoded form of one block, reused across every transfer.
    scratch: Vec<u8>,
}

impl<T: Element, B: Blob, const BLOCK_LEN: usize> State<T, B, BLOCK_LEN> {
    const BLOCK_LEN_U64: u64 = BLOCK_LEN as u64;

    fn offset(&self, block: u64) -> u64 {
        // Cannot overflow: the blob was sized to hold every block.
        block * self.scratch.len() as u64
    }

    /// Pick the slot to reuse: any unoccupied slot, else the least recently accessed one. Ties
    /// go to the lowest index.
    fn victim(&self) -> usize {
        let mut victim = 0;
        let mut best = (true, u64::MAX);
        for (index, slot) in self.slots.iter().enumerate() {
            let key = (slot.block.is_some(), slot.recency);
            if key < best {
                best = key;
                victim = index;
            }
        }
        victim
    }

    /// Encode the elements of `slot` and write them to `block`'s position in the blob.
    fn write_back(&mut self, slot: usize, block: u64) -> Result<(), blockcache_runtime::Error> {
        let mut buf = self.scratch.as_mut_slice();
        for value in &self.data[slot * BLOCK_LEN..(slot + 1) * BLOCK_LEN] {
            value.write(&mut buf);
        }
        let offset = self.offset(block);
        self.blob.write_at(&self.scratch, offset)?;
        self.slots[slot].dirty = false;
        Ok(())
    }

    /// Make `block` resident, returning its slot.
    fn load(&mut self, block: u64, metrics: &Metrics) -> Result<usize, blockcache_runtime::Error> {
        let slot = self.victim();

        // Repurpose the slot, saving its contents first if they were modified
        let occupied = self.slots[slot].block;
        if let Some(old) = occupied {
            if self.slots[slot].dirty {
                self.write_back(slot, old)?;
                metrics.write_backs.inc();
            }
            self.table[old as usize] = None;
            self.slots[slot].block = None;
            metrics.evictions.inc();
            metrics.resident.dec();
            trace!(block = old, slot, "evicted block");
        }

        // Fill the slot from the blob
        let offset = self.offset(block);
        self.blob.read_at(&mut self.scratch, offset)?;
        let mut buf = self.scratch.as_slice();
        for value in &mut self.data[slot * BLOCK_LEN..(slot + 1) * BLOCK_LEN] {
            *value = T::read(&mut buf);
        }
        self.slots[slot] = Slot {
            recency: 0,
            block: Some(block),
            dirty: false,
        };
        self.table[block as usize] = Some(slot);
        metrics.resident.inc();
        trace!(block, slot, "loaded block");

        Ok(slot)
    }

    /// Write back every modified slot, returning how many were written.
    fn flush(&mut self, metrics: &Metrics) -> Result<usize, blockcache_runtime::Error> {
        let mut flushed = 0;
        for slot in 0..self.slots.len() {
            let Slot {
                block: Some(block),
                dirty: true,
                ..
            } = self.slots[slot]
            else {
                continue;
            };
            self.write_back(slot, block)?;
            metrics.write_backs.inc();
            flushed += 1;
        }
        self.blob.sync()?;
        Ok(flushed)
    }
}

/// A fixed-length array of `T` that keeps at most `pool_capacity` blocks of `BLOCK_LEN` elements
/// in memory and pages the rest to a [Blob] opened from `S`.
///
/// See the [module documentation](super) for the replacement and durability semantics.
pub struct Cache<T: Element, S: Storage, const BLOCK_LEN: usize> {
    storage: S,
    state: Option<State<T, S::Blob, BLOCK_LEN>>,
    poisoned: bool,
    metrics: Metrics,
}

impl<T: Element, S: Storage, const BLOCK_LEN: usize> Cache<T, S, BLOCK_LEN> {
    /// Create an uninitialized cache that will open its blob from `storage`.
    ///
    /// Every access fails with [Error::NotInitialized] until [Cache::init] succeeds.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            state: None,
            poisoned: false,
            metrics: Metrics::default(),
        }
    }

    /// Create and initialize a cache in one step.
    pub fn open(storage: S, cfg: Config) -> Result<Self, Error> {
        let mut cache = Self::new(storage);
        cache.init(cfg)?;
        Ok(cache)
    }

    /// Size the cache for `cfg.element_count` elements and allocate its backing blob.
    ///
    /// The pool never holds more slots than there are blocks, so a small array with a large
    /// `pool_capacity` allocates only what it can use.
    pub fn init(&mut self, cfg: Config) -> Result<(), Error> {
        if self.state.is_some() {
            return Err(Error::AlreadyInitialized);
        }

        // Size everything up front
        let block_count = block_count::<BLOCK_LEN>(cfg.element_count)?;
        let len = block_count
            .checked_mul(BLOCK_LEN as u64)
            .ok_or(Error::CapacityOverflow)?;
        let block_bytes = BLOCK_LEN
            .checked_mul(T::SIZE)
            .ok_or(Error::CapacityOverflow)?;
        let store_bytes = block_count
            .checked_mul(block_bytes as u64)
            .ok_or(Error::CapacityOverflow)?;
        let table_len = usize::try_from(block_count).map_err(|_| Error::CapacityOverflow)?;
        let slot_count = cfg.pool_capacity.get().min(table_len);
        let arena_len = slot_count
            .checked_mul(BLOCK_LEN)
            .ok_or(Error::CapacityOverflow)?;

        // Allocate the blob (zero-filled)
        let blob = self.storage.open().map_err(Error::StoreUnavailable)?;
        blob.resize(store_bytes).map_err(Error::StoreUnavailable)?;

        self.state = Some(State {
            blob,
            block_count,
            len,
            tally: 1,
            slots: vec![Slot::default(); slot_count],
            data: vec![T::zeroed(); arena_len],
            table: vec![None; table_len],
            scratch: vec![0; block_bytes],
        });
        debug!(
            block_count,
            pool_capacity = slot_count,
            store_bytes,
            "initialized disk cache"
        );
        Ok(())
    }

    /// Resolve `index` to its element, loading (and possibly evicting) as needed.
    fn locate(&mut self, index: u64, dirty: bool) -> Result<&mut T, Error> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }
        let state = self.state.as_mut().ok_or(Error::NotInitialized)?;
        if index >= state.len {
            return Err(Error::IndexOutOfRange(Position::Linear {
                index,
                len: state.len,
            }));
        }
        let block = index / State::<T, S::Blob, BLOCK_LEN>::BLOCK_LEN_U64;
        let offset = (index % State::<T, S::Blob, BLOCK_LEN>::BLOCK_LEN_U64) as usize;

        let slot = match state.table[block as usize] {
            Some(slot) => {
                self.metrics.hits.inc();
                slot
            }
            None => {
                self.metrics.misses.inc();
                match state.load(block, &self.metrics) {
                    Ok(slot) => slot,
                    Err(err) => {
                        error!(?err, block, "backing store fault, poisoning cache");
                        self.poisoned = true;
                        return Err(err.into());
                    }
                }
            }
        };

        let entry = &mut state.slots[slot];
        entry.recency = state.tally;
        entry.dirty |= dirty;
        state.tally += 1;

        Ok(&mut state.data[slot * BLOCK_LEN + offset])
    }

    /// Write every modified resident block to the backing store and sync it.
    ///
    /// Blocks stay resident. This is the only way to force a write-back short of eviction.
    pub fn sync(&mut self) -> Result<(), Error> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }
        let state = self.state.as_mut().ok_or(Error::NotInitialized)?;
        match state.flush(&self.metrics) {
            Ok(flushed) => {
                debug!(flushed, "synced disk cache");
                Ok(())
            }
            Err(err) => {
                error!(?err, "backing store fault during sync, poisoning cache");
                self.poisoned = true;
                Err(err.into())
            }
        }
    }

    /// The number of elements per block.
    pub const fn block_length(&self) -> usize {
        BLOCK_LEN
    }

    /// The number of addressable elements: the requested count rounded up to a whole block.
    ///
    /// Zero before [Cache::init].
    pub fn effective_element_count(&self) -> u64 {
        self.state.as_ref().map_or(0, |state| state.len)
    }

    /// The number of blocks in the backing store.
    pub fn block_count(&self) -> u64 {
        self.state.as_ref().map_or(0, |state| state.block_count)
    }

    /// The number of slots in the pool.
    pub fn pool_capacity(&self) -> usize {
        self.state.as_ref().map_or(0, |state| state.slots.len())
    }

    /// The number of blocks currently in memory.
    pub fn resident_blocks(&self) -> usize {
        self.state.as_ref().map_or(0, |state| {
            state.slots.iter().filter(|s| s.block.is_some()).count()
        })
    }

    /// Returns true if `block` is currently in memory.
    pub fn is_resident(&self, block: u64) -> bool {
        self.state.as_ref().is_some_and(|state| {
            usize::try_from(block)
                .ok()
                .and_then(|block| state.table.get(block))
                .is_some_and(Option::is_some)
        })
    }

    /// The number of resident blocks with modifications not yet written back.
    pub fn dirty_blocks(&self) -> usize {
        self.state.as_ref().map_or(0, |state| {
            state
                .slots
                .iter()
                .filter(|s| s.block.is_some() && s.dirty)
                .count()
        })
    }

    /// Returns true if a backing store fault has disabled the cache.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Counters and gauges describing cache activity.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Register this cache's metrics under the `disk_cache` prefix.
    pub fn register_metrics(&self, registry: &mut Registry) {
        self.metrics.register(registry.sub_registry_with_prefix("disk_cache"));
    }
}

impl<T: Element, S: Storage, const BLOCK_LEN: usize> Array for Cache<T, S, BLOCK_LEN> {
    type Item = T;

    fn len(&self) -> u64 {
        self.effective_element_count()
    }

    fn read(&mut self, index: u64) -> Result<T, Error> {
        self.locate(index, false).map(|value| value.clone())
    }

    /// The block holding `index` is marked modified whether or not the caller writes through
    /// the reference.
    fn get_mut(&mut self, index: u64) -> Result<&mut T, Error> {
        self.locate(index, true)
    }
}

impl<T: Element, S: Storage, const BLOCK_LEN: usize> Drop for Cache<T, S, BLOCK_LEN> {
    fn drop(&mut self) {
        let dirty = self.dirty_blocks();
        if dirty > 0 {
            debug!(dirty, "discarding modified blocks");
        }

        // Registered metrics outlive the cache
        self.metrics.resident.set(0);
    }
}
