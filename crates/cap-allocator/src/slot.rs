//! Bump allocation of capability slots.

/// A contiguous run of slot indices in a capability table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SlotRange {
    pub first: usize,
    pub count: usize,
}

impl SlotRange {
    #[must_use]
    pub const fn new(first: usize, count: usize) -> Self {
        Self { first, count }
    }

    /// One past the last index of the range.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.first + self.count
    }

    #[must_use]
    pub const fn contains(&self, index: usize) -> bool {
        self.first <= index && index < self.end()
    }
}

/// Hands out slots of a fixed window in increasing order.
///
/// Slots are never returned to the window individually, except that the
/// most recently allocated slot can be given back (see [`Self::free`]).
/// [`Self::reset`] makes the whole window available again.
#[derive(Debug, Clone)]
pub(crate) struct SlotAllocator {
    window: SlotRange,
    used: usize,
}

impl SlotAllocator {
    pub(crate) const fn new(window: SlotRange) -> Self {
        Self { window, used: 0 }
    }

    pub(crate) const fn window(&self) -> SlotRange {
        self.window
    }

    pub(crate) const fn used(&self) -> usize {
        self.used
    }

    pub(crate) const fn remaining(&self) -> usize {
        self.window.count - self.used
    }

    /// Allocates `count` contiguous slots and returns the index of the first.
    ///
    /// Returns `None` without consuming anything if fewer than `count` slots
    /// remain. Allocating zero slots always succeeds.
    pub(crate) fn alloc(&mut self, count: usize) -> Option<usize> {
        if self.remaining() < count {
            return None;
        }
        let index = self.window.first + self.used;
        self.used += count;
        Some(index)
    }

    /// Gives back slot `index` if it is the last one handed out.
    ///
    /// Returns `true` if the slot will be handed out again. Any other slot
    /// stays consumed until the next reset.
    pub(crate) fn free(&mut self, index: usize) -> bool {
        if self.used > 0 && index == self.window.first + self.used - 1 {
            self.used -= 1;
            return true;
        }
        false
    }

    pub(crate) fn reset(&mut self) {
        self.used = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_contiguous_runs() {
        let mut slots = SlotAllocator::new(SlotRange::new(10, 8));
        assert_eq!(slots.alloc(3), Some(10));
        assert_eq!(slots.alloc(2), Some(13));
        assert_eq!(slots.alloc(1), Some(15));
        assert_eq!(slots.used(), 6);
        assert_eq!(slots.remaining(), 2);
    }

    #[test]
    fn test_alloc_exhaustion_is_side_effect_free() {
        let mut slots = SlotAllocator::new(SlotRange::new(0, 4));
        assert_eq!(slots.alloc(3), Some(0));
        assert_eq!(slots.alloc(2), None);
        assert_eq!(slots.used(), 3);
        assert_eq!(slots.alloc(1), Some(3));
        assert_eq!(slots.alloc(1), None);
        assert_eq!(slots.used(), 4);
    }

    #[test]
    fn test_alloc_zero() {
        let mut slots = SlotAllocator::new(SlotRange::new(7, 0));
        assert_eq!(slots.alloc(0), Some(7));
        assert_eq!(slots.alloc(1), None);
        assert_eq!(slots.used(), 0);
    }

    #[test]
    fn test_free_last_slot() {
        let mut slots = SlotAllocator::new(SlotRange::new(20, 4));
        assert_eq!(slots.alloc(1), Some(20));
        assert_eq!(slots.alloc(1), Some(21));
        assert!(slots.free(21));
        assert_eq!(slots.alloc(1), Some(21));
    }

    #[test]
    fn test_free_earlier_slot_is_ignored() {
        let mut slots = SlotAllocator::new(SlotRange::new(20, 4));
        assert_eq!(slots.alloc(2), Some(20));
        assert!(!slots.free(20));
        assert!(!slots.free(99));
        assert_eq!(slots.used(), 2);
        assert_eq!(slots.alloc(1), Some(22));
    }

    #[test]
    fn test_free_on_empty_window() {
        let mut slots = SlotAllocator::new(SlotRange::new(0, 4));
        assert!(!slots.free(0));
        assert_eq!(slots.used(), 0);
    }

    #[test]
    fn test_reset() {
        let mut slots = SlotAllocator::new(SlotRange::new(5, 2));
        assert_eq!(slots.alloc(2), Some(5));
        assert_eq!(slots.alloc(1), None);
        slots.reset();
        assert_eq!(slots.alloc(2), Some(5));
    }

    #[test]
    fn test_range_contains() {
        let range = SlotRange::new(5, 3);
        assert!(!range.contains(4));
        assert!(range.contains(5));
        assert!(range.contains(7));
        assert!(!range.contains(8));
        assert_eq!(range.end(), 8);
    }
}
