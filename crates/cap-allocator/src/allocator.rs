use log::{debug, trace, warn};

use crate::{
    config::{self, MAX_UNTYPED_ITEMS, MAX_UNTYPED_SIZE, MIN_UNTYPED_SIZE},
    cptr::{CNode, CPtr, CapRange, UntypedItem},
    error,
    kernel::{Kernel, ObjectType, RetypeRequest},
    pool::{RootItem, UntypedPool},
    slot::{SlotAllocator, SlotRange},
};

/// Allocator of capability slots and untyped memory.
///
/// Owns a window of free slots in one capability table and a set of root
/// untyped items. All state lives in the value itself, so any number of
/// independent allocators can coexist.
///
/// # Examples
///
/// ```
/// use cap_allocator::{Allocator, CNode, CPtr, SlotRange, UntypedItem};
/// use cap_allocator::testing::ModelKernel;
///
/// let kernel = ModelKernel::new();
/// kernel.insert_untyped(CPtr::new(500), 10);
///
/// let mut allocator = Allocator::new(
///     kernel,
///     CNode::new(CPtr::new(2), 32, 0),
///     SlotRange::new(16, 32),
///     &[UntypedItem::new(CPtr::new(500), 10)],
/// );
///
/// let first = allocator.alloc_untyped(4);
/// allocator.reset();
/// assert_eq!(allocator.alloc_untyped(4), first);
/// ```
#[derive(Debug)]
pub struct Allocator<K> {
    kernel: K,
    cnode: CNode,
    slots: SlotAllocator,
    untyped: UntypedPool,
}

impl<K> Allocator<K>
where
    K: Kernel,
{
    /// Creates an allocator over the slot window `slots` of `cnode`, seeded
    /// with `items`.
    ///
    /// # Panics
    ///
    /// Panics if there are more than [`MAX_UNTYPED_ITEMS`] items or if an
    /// item has an unsupported size class.
    pub fn new(kernel: K, cnode: CNode, slots: SlotRange, items: &[UntypedItem]) -> Self {
        assert!(
            items.len() <= MAX_UNTYPED_ITEMS,
            "too many untyped items: {} (max {MAX_UNTYPED_ITEMS})",
            items.len()
        );
        let mut allocator = Self {
            kernel,
            cnode,
            slots: SlotAllocator::new(slots),
            untyped: UntypedPool::new(),
        };
        for item in items {
            allocator.add_root_item(item.cap, item.size_bits);
        }
        debug!(
            "created allocator: slots {}..{}, {} root items",
            slots.first,
            slots.end(),
            items.len()
        );
        allocator
    }

    /// Creates a child allocator that takes over all untyped memory this
    /// allocator has available.
    ///
    /// Items are drained largest size class first. Resetting or destroying
    /// the child revokes only what the child created; resetting this
    /// allocator revokes everything, including the child's objects.
    ///
    /// If the child's root table fills up, draining stops and the remaining
    /// items stay with this allocator.
    pub fn create_child(&mut self, kernel: K, cnode: CNode, slots: SlotRange) -> Self {
        let mut child = Self::new(kernel, cnode, slots, &[]);
        'drain: for size_bits in (MIN_UNTYPED_SIZE..=MAX_UNTYPED_SIZE).rev() {
            loop {
                if child.untyped.is_full() {
                    warn!(
                        "child allocator root table is full, leaving remaining untyped memory with \
                         the parent"
                    );
                    break 'drain;
                }
                let Some(cap) = self.alloc_untyped(size_bits) else {
                    break;
                };
                child.add_root_item(cap, size_bits);
            }
        }
        debug!(
            "created child allocator with {} root items",
            child.untyped.roots().len()
        );
        child
    }

    /// Permanently adds an untyped item.
    ///
    /// The item is kept across resets, until the allocator is destroyed.
    ///
    /// # Panics
    ///
    /// Panics if `size_bits` is outside
    /// [`MIN_UNTYPED_SIZE`]`..=`[`MAX_UNTYPED_SIZE`] or if the root table is
    /// full.
    pub fn add_root_item(&mut self, cap: CPtr, size_bits: usize) {
        self.untyped.add_root(cap, size_bits);
        trace!("added root untyped {cap} ({size_bits} bits)");
    }

    #[must_use]
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.kernel
    }

    #[must_use]
    pub fn cnode(&self) -> CNode {
        self.cnode
    }

    #[must_use]
    pub fn slot_window(&self) -> SlotRange {
        self.slots.window()
    }

    /// Slots consumed since creation or the last reset.
    #[must_use]
    pub fn slots_used(&self) -> usize {
        self.slots.used()
    }

    #[must_use]
    pub fn slots_remaining(&self) -> usize {
        self.slots.remaining()
    }

    pub fn root_items(&self) -> impl Iterator<Item = &RootItem> {
        self.untyped.roots().iter()
    }

    /// Number of items of class `size_bits` available without splitting.
    #[must_use]
    pub fn pooled(&self, size_bits: usize) -> usize {
        self.untyped.pooled(size_bits)
    }

    /// Allocates an empty slot.
    pub fn alloc_slot(&mut self) -> Option<CPtr> {
        self.alloc_slots(1)
    }

    /// Allocates `count` contiguous empty slots and returns the first.
    ///
    /// Returns `None`, consuming nothing, if fewer than `count` remain.
    pub fn alloc_slots(&mut self, count: usize) -> Option<CPtr> {
        let index = self.slots.alloc(count)?;
        Some(self.cnode.cptr(index))
    }

    /// Returns a slot obtained from [`Self::alloc_slot`].
    ///
    /// Only the most recently allocated slot is handed out again; other
    /// slots stay consumed until the next [`Self::reset`].
    pub fn free_slot(&mut self, slot: CPtr) {
        let window = self.slots.window();
        let reused = self
            .cnode
            .index_of(slot)
            .filter(|&index| window.contains(index))
            .is_some_and(|index| self.slots.free(index));
        if !reused {
            trace!("slot {slot} is not reclaimed until reset");
        }
    }

    /// Allocates an untyped item of `2^size_bits` bytes.
    ///
    /// Splits larger items as needed. Returns `None` if `size_bits` is not a
    /// supported size class, or if memory or slots for the split results run
    /// out; in that case nothing is consumed.
    pub fn alloc_untyped(&mut self, size_bits: usize) -> Option<CPtr> {
        self.alloc_untyped_reserving(size_bits, 0)
    }

    /// Like [`Self::alloc_untyped`], but also fails unless `reserved_slots`
    /// slots are left over after the splits.
    pub(crate) fn alloc_untyped_reserving(
        &mut self,
        size_bits: usize,
        reserved_slots: usize,
    ) -> Option<CPtr> {
        if !config::is_supported_size(size_bits) {
            trace!("unsupported untyped size class {size_bits}");
            return None;
        }

        let source_bits = self.untyped.source_class(size_bits)?;
        let split_slots = 2 * (source_bits - size_bits);
        if self.slots.remaining() < split_slots + reserved_slots {
            trace!(
                "not enough slots to split {source_bits} bits into {size_bits} bits: need {}, \
                 have {}",
                split_slots + reserved_slots,
                self.slots.remaining()
            );
            return None;
        }

        let mut cap = self.untyped.take(source_bits)?;
        for bits in (size_bits..source_bits).rev() {
            cap = self.split(cap, bits)?;
        }
        Some(cap)
    }

    /// Splits `untyped` of class `size_bits + 1` into two items of class
    /// `size_bits` and takes one of them.
    fn split(&mut self, untyped: CPtr, size_bits: usize) -> Option<CPtr> {
        let halves = self.retype_untyped(untyped, ObjectType::Untyped, size_bits, 2)?;
        trace!(
            "split {untyped} into {} and {} ({size_bits} bits)",
            halves.first,
            halves.first + 1
        );
        self.untyped
            .push_split(size_bits, [halves.first, halves.first + 1]);
        self.untyped.take(size_bits)
    }

    /// Creates `count` objects from `untyped` in fresh contiguous slots.
    ///
    /// Returns `None`, consuming nothing, if fewer than `count` slots remain.
    /// The caller is responsible for `untyped` being large enough.
    ///
    /// # Panics
    ///
    /// Panics if the kernel rejects the retype.
    pub fn retype_untyped(
        &mut self,
        untyped: CPtr,
        object_type: ObjectType,
        object_size: usize,
        count: usize,
    ) -> Option<CapRange> {
        let dest_index = self.slots.alloc(count)?;
        let request = RetypeRequest {
            untyped,
            object_type,
            object_size,
            dest_root: self.cnode.root(),
            dest_depth: self.cnode.depth(),
            dest_index,
            count,
        };
        if let Err(err) = self.kernel.retype(&request) {
            error::kernel_failure(
                format_args!("retype {untyped} into {count} x {object_type} ({object_size})"),
                err,
            );
        }
        Some(CapRange {
            first: self.cnode.cptr(dest_index),
            count,
        })
    }

    /// Revokes everything allocated so far and returns to the seeded state.
    ///
    /// Every root item that was handed out or split is recycled, split
    /// products are forgotten and the whole slot window is free again. Root
    /// items added with [`Self::add_root_item`] are kept.
    ///
    /// # Panics
    ///
    /// Panics if the kernel fails to recycle a root item.
    pub fn reset(&mut self) {
        let kernel = &mut self.kernel;
        let recycled = self.untyped.reclaim(|cap| {
            if let Err(err) = kernel.recycle(cap) {
                error::kernel_failure(format_args!("recycle {cap}"), err);
            }
        });
        self.slots.reset();
        debug!("reset allocator: recycled {recycled} root items");
    }

    /// Resets the allocator and gives back the kernel handle.
    pub fn destroy(mut self) -> K {
        self.reset();
        debug!("destroyed allocator");
        self.kernel
    }

    /// Checks that a reset brings back the same minimum-size item.
    ///
    /// Leaves the allocator reset.
    ///
    /// # Panics
    ///
    /// Panics if the two allocations differ.
    pub fn self_test(&mut self) {
        let first = self.alloc_untyped(MIN_UNTYPED_SIZE);
        self.reset();
        let second = self.alloc_untyped(MIN_UNTYPED_SIZE);
        self.reset();
        assert_eq!(
            first, second,
            "allocator self-test failed: reset did not restore the seeded state"
        );
        debug!("allocator self-test passed");
    }
}
