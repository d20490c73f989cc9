//! Compile-time limits of the allocator.

/// Smallest untyped size class (log2 of the size in bytes) that is pooled.
pub const MIN_UNTYPED_SIZE: usize = 4;

/// Largest untyped size class that is pooled.
///
/// Items larger than this are never split or handed out.
pub const MAX_UNTYPED_SIZE: usize = 32;

/// Capacity of the root item table of a single allocator.
pub const MAX_UNTYPED_ITEMS: usize = 256;

/// Number of size classes in `MIN_UNTYPED_SIZE..=MAX_UNTYPED_SIZE`.
pub const NUM_SIZE_CLASSES: usize = MAX_UNTYPED_SIZE - MIN_UNTYPED_SIZE + 1;

/// Depth used when addressing a capability through the whole CSpace.
pub const CSPACE_DEPTH: usize = 32;

/// Returns `true` if `size_bits` is a size class the allocator can pool.
#[must_use]
pub const fn is_supported_size(size_bits: usize) -> bool {
    MIN_UNTYPED_SIZE <= size_bits && size_bits <= MAX_UNTYPED_SIZE
}

/// Maps a size class to its index in per-class tables.
pub(crate) const fn size_class_index(size_bits: usize) -> Option<usize> {
    if is_supported_size(size_bits) {
        Some(size_bits - MIN_UNTYPED_SIZE)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_class_index() {
        assert_eq!(size_class_index(MIN_UNTYPED_SIZE), Some(0));
        assert_eq!(
            size_class_index(MAX_UNTYPED_SIZE),
            Some(NUM_SIZE_CLASSES - 1)
        );
        assert_eq!(size_class_index(MIN_UNTYPED_SIZE - 1), None);
        assert_eq!(size_class_index(MAX_UNTYPED_SIZE + 1), None);
    }
}
