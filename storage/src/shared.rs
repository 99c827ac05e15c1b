//! Share one [Array] between threads.
//!
//! Every operation on an [Array] takes `&mut self`, so a single array can only be driven from one
//! place at a time. [Shared] puts the array behind one mutex: each call holds the lock for exactly
//! one access (including any eviction and reload it triggers), which keeps replacement decisions
//! exact across all callers at the cost of serializing them.

use crate::disk_cache::{Array, Error};
use std::sync::{Arc, Mutex, MutexGuard};

/// A cloneable, thread-safe handle to an [Array].
pub struct Shared<A: Array> {
    inner: Arc<Mutex<A>>,
}

impl<A: Array> Clone for Shared<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: Array> Shared<A> {
    pub fn new(array: A) -> Self {
        Self {
            inner: Arc::new(Mutex::new(array)),
        }
    }

    /// Acquire exclusive access for a sequence of operations.
    ///
    /// Fails with [Error::LockPoisoned] if another holder panicked.
    pub fn lock(&self) -> Result<MutexGuard<'_, A>, Error> {
        self.inner.lock().map_err(|_| Error::LockPoisoned)
    }

    pub fn len(&self) -> Result<u64, Error> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.lock()?.is_empty())
    }

    /// Return the current value of element `index`.
    pub fn read(&self, index: u64) -> Result<A::Item, Error> {
        self.lock()?.read(index)
    }

    /// Overwrite element `index` with `value`.
    pub fn write(&self, index: u64, value: A::Item) -> Result<(), Error> {
        self.lock()?.write(index, value)
    }

    /// Apply `f` to element `index` while holding the lock, returning its result.
    pub fn update<R>(&self, index: u64, f: impl FnOnce(&mut A::Item) -> R) -> Result<R, Error> {
        let mut array = self.lock()?;
        let value = array.get_mut(index)?;
        Ok(f(value))
    }

    /// Recover the array if this is the last handle. Otherwise, return the handle unchanged.
    pub fn try_into_inner(self) -> Result<A, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex.into_inner().unwrap_or_else(|e| e.into_inner())),
            Err(inner) => Err(Self { inner }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk_cache::{Cache, Config, Reference};
    use blockcache_runtime::storage::memory::Storage as MemoryStorage;
    use blockcache_utils::NZUsize;
    use std::thread;

    #[test]
    fn test_shared_across_threads() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 2_000;

        let cache = Cache::<u64, _, 128>::open(
            MemoryStorage::default(),
            Config {
                element_count: THREADS * PER_THREAD,
                pool_capacity: NZUsize!(3),
            },
        )
        .unwrap();
        let shared = Shared::new(cache);

        // Each thread owns a strided set of indices so the writes interleave across blocks
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        let index = i * THREADS + t;
                        shared.write(index, index + 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Concurrent increments on a single element are never lost
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        shared.update(0, |value| *value += 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let len = shared.len().unwrap();
        assert_eq!(len, THREADS * PER_THREAD);
        assert_eq!(shared.read(0).unwrap(), 1 + THREADS * 100);
        for index in 1..len {
            assert_eq!(shared.read(index).unwrap(), index + 1);
        }

        let cache = shared.try_into_inner().ok().unwrap();
        assert!(cache.resident_blocks() <= 3);
    }

    #[test]
    fn test_try_into_inner_with_clones() {
        let shared = Shared::new(Reference::<u8, 4>::new(4).unwrap());
        let clone = shared.clone();
        let shared = shared.try_into_inner().err().unwrap();
        drop(clone);
        let reference = shared.try_into_inner().ok().unwrap();
        assert_eq!(reference.len(), 4);
    }

    #[test]
    fn test_lock_poisoned() {
        let shared = Shared::new(Reference::<u8, 4>::new(4).unwrap());
        let clone = shared.clone();
        let _ = thread::spawn(move || {
            let _guard = clone.lock().unwrap();
            panic!("holder failed");
        })
        .join();

        assert!(matches!(shared.read(0), Err(Error::LockPoisoned)));
        assert!(matches!(
            shared.update(0, |value| *value = 1),
            Err(Error::LockPoisoned)
        ));
    }

    #[test]
    fn test_errors_pass_through() {
        let shared = Shared::new(Reference::<u8, 4>::new(4).unwrap());
        assert!(matches!(shared.read(4), Err(Error::IndexOutOfRange(_))));
        assert!(matches!(
            shared.update(9, |_| ()),
            Err(Error::IndexOutOfRange(_))
        ));
        assert!(!shared.is_empty().unwrap());
    }
}
