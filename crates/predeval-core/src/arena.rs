use crate::error::{EvalError, Result};
use crate::types::PartitionKey;

/// Partition grid derived from a split assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub repeats: usize,
    pub folds: usize,
    pub samples: usize,
}

impl Dimensions {
    pub fn new(repeats: usize, folds: usize, samples: usize) -> Self {
        Self { repeats, folds, samples }
    }

    /// Smallest grid containing every key; `None` if a dimension overflows.
    pub fn covering<'a>(keys: impl IntoIterator<Item = &'a PartitionKey>) -> Option<Self> {
        let mut dims = Self::new(0, 0, 0);
        for key in keys {
            dims.repeats = dims.repeats.max(key.repeat.checked_add(1)?);
            dims.folds = dims.folds.max(key.fold.checked_add(1)?);
            dims.samples = dims.samples.max(key.sample.checked_add(1)?);
        }
        Some(dims)
    }

    /// Number of partitions; `None` when the product overflows.
    pub fn partitions(&self) -> Option<usize> {
        self.repeats.checked_mul(self.folds)?.checked_mul(self.samples)
    }

    pub fn contains(&self, key: &PartitionKey) -> bool {
        key.repeat < self.repeats && key.fold < self.folds && key.sample < self.samples
    }

    /// Dense repeat-major index of `key`, or `None` outside the grid.
    pub fn index(&self, key: &PartitionKey) -> Option<usize> {
        self.contains(key)
            .then(|| (key.repeat * self.folds + key.fold) * self.samples + key.sample)
    }

    /// All keys in index order.
    pub fn keys(&self) -> impl Iterator<Item = PartitionKey> + '_ {
        (0..self.repeats).flat_map(move |r| {
            (0..self.folds).flat_map(move |f| (0..self.samples).map(move |s| PartitionKey::new(r, f, s)))
        })
    }
}

/// Flat storage of `width` slots per partition, addressed by `(PartitionKey, replicate)`.
#[derive(Debug, Clone)]
pub struct PartitionArena<T> {
    dims: Dimensions,
    width: usize,
    slots: Vec<T>,
}

impl<T> PartitionArena<T> {
    pub fn new(dims: Dimensions, width: usize, mut init: impl FnMut() -> T) -> Result<Self> {
        let len = dims
            .partitions()
            .and_then(|p| p.checked_mul(width))
            .ok_or_else(|| EvalError::InvalidSplits(format!("partition grid {dims:?} is too large")))?;
        let slots = (0..len).map(|_| init()).collect();
        Ok(Self { dims, width, slots })
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn width(&self) -> usize {
        self.width
    }

    fn slot(&self, key: &PartitionKey, replicate: usize) -> Option<usize> {
        if replicate >= self.width {
            return None;
        }
        self.dims.index(key).map(|i| i * self.width + replicate)
    }

    pub fn get(&self, key: &PartitionKey, replicate: usize) -> Option<&T> {
        self.slot(key, replicate).map(|i| &self.slots[i])
    }

    pub fn get_mut(&mut self, key: &PartitionKey, replicate: usize) -> Option<&mut T> {
        self.slot(key, replicate).map(move |i| &mut self.slots[i])
    }

    /// Every replicate of one partition.
    pub fn replicates(&self, key: &PartitionKey) -> Option<&[T]> {
        let start = self.slot(key, 0)?;
        Some(&self.slots[start..start + self.width])
    }

    pub fn iter(&self) -> impl Iterator<Item = (PartitionKey, &[T])> + '_ {
        self.dims.keys().zip(self.slots.chunks(self.width.max(1)))
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PartitionArena<U> {
        PartitionArena {
            dims: self.dims,
            width: self.width,
            slots: self.slots.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_is_dense_and_bounded() {
        let dims = Dimensions::new(2, 3, 2);
        let indices: Vec<usize> = dims.keys().filter_map(|k| dims.index(&k)).collect();
        assert_eq!(indices, (0..12).collect::<Vec<_>>());
        assert_eq!(dims.index(&PartitionKey::new(2, 0, 0)), None);
        assert_eq!(dims.index(&PartitionKey::new(0, 0, 2)), None);
    }

    #[test]
    fn test_replicates_are_separate_slots() {
        let dims = Dimensions::new(1, 2, 1);
        let mut arena = PartitionArena::new(dims, 2, || 0u32).unwrap();
        let key = PartitionKey::new(0, 1, 0);
        *arena.get_mut(&key, 1).unwrap() += 5;
        assert_eq!(arena.replicates(&key), Some(&[0, 5][..]));
        assert!(arena.get(&key, 2).is_none());

        let collected: Vec<(PartitionKey, Vec<u32>)> =
            arena.iter().map(|(k, slots)| (k, slots.to_vec())).collect();
        assert_eq!(collected[0], (PartitionKey::new(0, 0, 0), vec![0, 0]));
        assert_eq!(collected[1], (PartitionKey::new(0, 1, 0), vec![0, 5]));
    }

    #[test]
    fn test_covering_and_overflow() {
        let keys = [PartitionKey::new(0, 3, 0), PartitionKey::new(1, 0, 2)];
        assert_eq!(Dimensions::covering(&keys), Some(Dimensions::new(2, 4, 3)));
        assert_eq!(Dimensions::covering(&[PartitionKey::new(0, usize::MAX, 0)]), None);
        assert_eq!(Dimensions::new(usize::MAX, 2, 1).partitions(), None);
        assert!(PartitionArena::new(Dimensions::new(1, usize::MAX, 1), 2, || 0u8).is_err());
    }
}
