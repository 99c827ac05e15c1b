use super::{block_count, Array, Error, Position};
use crate::Element;

/// A fully resident counterpart to [super::Cache].
///
/// Rounds `element_count` up to a whole number of `BLOCK_LEN` blocks exactly as the cache does,
/// but keeps every element in one contiguous vector. It never performs I/O, so the only runtime
/// failure is [Error::IndexOutOfRange]. Useful as an oracle in tests and as the backing array
/// when the data fits in memory.
pub struct Reference<T: Element, const BLOCK_LEN: usize> {
    data: Vec<T>,
}

impl<T: Element, const BLOCK_LEN: usize> Reference<T, BLOCK_LEN> {
    /// Allocate `element_count` (rounded up) zeroed elements.
    pub fn new(element_count: u64) -> Result<Self, Error> {
        let len = block_count::<BLOCK_LEN>(element_count)?
            .checked_mul(BLOCK_LEN as u64)
            .ok_or(Error::CapacityOverflow)?;
        let len = usize::try_from(len).map_err(|_| Error::CapacityOverflow)?;
        Ok(Self {
            data: vec![T::zeroed(); len],
        })
    }

    /// The number of elements per block.
    pub const fn block_length(&self) -> usize {
        BLOCK_LEN
    }

    /// All elements, in index order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    fn check(&self, index: u64) -> Result<usize, Error> {
        let len = self.data.len() as u64;
        if index >= len {
            return Err(Error::IndexOutOfRange(Position::Linear { index, len }));
        }
        Ok(index as usize)
    }
}

impl<T: Element, const BLOCK_LEN: usize> Array for Reference<T, BLOCK_LEN> {
    type Item = T;

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read(&mut self, index: u64) -> Result<T, Error> {
        let index = self.check(index)?;
        Ok(self.data[index].clone())
    }

    fn get_mut(&mut self, index: u64) -> Result<&mut T, Error> {
        let index = self.check(index)?;
        Ok(&mut self.data[index])
    }
}
