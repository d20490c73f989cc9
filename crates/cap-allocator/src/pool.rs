//! Untyped memory bookkeeping: the root item table and per-class pools.
//!
//! Root items are the untyped capabilities an allocator was seeded with.
//! They are never removed; they are only flagged as leased out and flagged
//! back on reset. Items produced by splitting live in a separate LIFO pool
//! per size class and are simply dropped on reset, since recycling their
//! root item revokes them in the kernel.

use arrayvec::ArrayVec;

use crate::{
    config::{self, MAX_UNTYPED_ITEMS, MAX_UNTYPED_SIZE, NUM_SIZE_CLASSES},
    cptr::CPtr,
};

/// An untyped item owned by an allocator for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootItem {
    cap: CPtr,
    size_bits: usize,
    available: bool,
}

impl RootItem {
    #[must_use]
    pub const fn cap(&self) -> CPtr {
        self.cap
    }

    #[must_use]
    pub const fn size_bits(&self) -> usize {
        self.size_bits
    }

    /// `false` while the item (or anything split from it) is leased out.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.available
    }
}

/// Split products of one size class.
///
/// A class is only split into when its pool is empty, and a split yields two
/// items of which one is handed out immediately, so two entries suffice.
#[derive(Debug, Clone, Default)]
struct SplitPool {
    items: ArrayVec<CPtr, 2>,
}

#[derive(Debug, Clone)]
pub(crate) struct UntypedPool {
    roots: ArrayVec<RootItem, MAX_UNTYPED_ITEMS>,
    splits: [SplitPool; NUM_SIZE_CLASSES],
}

impl UntypedPool {
    pub(crate) fn new() -> Self {
        Self {
            roots: ArrayVec::new(),
            splits: core::array::from_fn(|_| SplitPool::default()),
        }
    }

    pub(crate) fn roots(&self) -> &[RootItem] {
        &self.roots
    }

    pub(crate) fn is_full(&self) -> bool {
        self.roots.is_full()
    }

    /// Appends a root item, available for allocation.
    ///
    /// # Panics
    ///
    /// Panics if `size_bits` is not a supported size class or if the table
    /// is full.
    pub(crate) fn add_root(&mut self, cap: CPtr, size_bits: usize) {
        assert!(
            config::is_supported_size(size_bits),
            "unsupported untyped size class {size_bits} for {cap}"
        );
        let item = RootItem {
            cap,
            size_bits,
            available: true,
        };
        assert!(
            self.roots.try_push(item).is_ok(),
            "root untyped table is full ({MAX_UNTYPED_ITEMS} items), cannot add {cap}"
        );
    }

    /// Number of items of class `size_bits` that can be taken without
    /// splitting.
    pub(crate) fn pooled(&self, size_bits: usize) -> usize {
        let Some(index) = config::size_class_index(size_bits) else {
            return 0;
        };
        let available_roots = self
            .roots
            .iter()
            .filter(|item| item.available && item.size_bits == size_bits)
            .count();
        self.splits[index].items.len() + available_roots
    }

    /// Finds the smallest class at or above `size_bits` that can supply an
    /// item without splitting.
    pub(crate) fn source_class(&self, size_bits: usize) -> Option<usize> {
        config::size_class_index(size_bits)?;
        (size_bits..=MAX_UNTYPED_SIZE).find(|&bits| self.pooled(bits) > 0)
    }

    /// Takes an item of exactly `size_bits`, preferring split products over
    /// root items.
    pub(crate) fn take(&mut self, size_bits: usize) -> Option<CPtr> {
        let index = config::size_class_index(size_bits)?;
        if let Some(cap) = self.splits[index].items.pop() {
            return Some(cap);
        }
        let item = self
            .roots
            .iter_mut()
            .find(|item| item.available && item.size_bits == size_bits)?;
        item.available = false;
        Some(item.cap)
    }

    /// Records the two halves of a split of class `size_bits + 1`.
    ///
    /// # Panics
    ///
    /// Panics if the pool for `size_bits` was not empty.
    pub(crate) fn push_split(&mut self, size_bits: usize, halves: [CPtr; 2]) {
        let index = config::size_class_index(size_bits)
            .unwrap_or_else(|| panic!("split into unsupported size class {size_bits}"));
        let pool = &mut self.splits[index];
        assert!(
            pool.items.is_empty(),
            "split into size class {size_bits} while its pool is not empty"
        );
        pool.items.extend(halves);
    }

    /// Marks every leased root item available again and drops all split
    /// products. `recycle` is called for each leased root item first.
    pub(crate) fn reclaim<F>(&mut self, mut recycle: F) -> usize
    where
        F: FnMut(CPtr),
    {
        let mut reclaimed = 0;
        for item in self.roots.iter_mut().filter(|item| !item.available) {
            recycle(item.cap);
            item.available = true;
            reclaimed += 1;
        }
        for pool in &mut self.splits {
            pool.items.clear();
        }
        reclaimed
    }
}
