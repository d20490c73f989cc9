use core::ops::Range;

use cap_allocator::{CPtr, SlotRange, UntypedItem};
use snafu::ensure;

use crate::error::{
    BootstrapError, InvalidSlotRegionSnafu, InvalidUntypedRegionSnafu, SizeListLengthSnafu,
};

/// Resources the kernel hands to the root task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootInfo<'a> {
    /// Empty slots in the root task's CNode.
    pub empty: Range<usize>,
    /// Slots holding the untyped memory capabilities.
    pub untyped: Range<usize>,
    /// Size class of each untyped capability, in slot order.
    pub untyped_size_bits: &'a [u8],
}

impl BootInfo<'_> {
    /// The empty slot region as a slot window.
    pub fn empty_slots(&self) -> Result<SlotRange, BootstrapError> {
        let Range { start, end } = self.empty;
        ensure!(start <= end, InvalidSlotRegionSnafu { start, end });
        Ok(SlotRange::new(start, end - start))
    }

    /// The untyped capabilities listed in the manifest.
    pub fn untyped_items(
        &self,
    ) -> Result<impl ExactSizeIterator<Item = UntypedItem> + Clone + '_, BootstrapError> {
        let Range { start, end } = self.untyped;
        ensure!(start <= end, InvalidUntypedRegionSnafu { start, end });
        ensure!(
            self.untyped_size_bits.len() == end - start,
            SizeListLengthSnafu {
                expected: end - start,
                actual: self.untyped_size_bits.len(),
            }
        );
        Ok(self
            .untyped
            .clone()
            .zip(self.untyped_size_bits)
            .map(|(cap, &size_bits)| UntypedItem::new(CPtr::new(cap), usize::from(size_bits))))
    }
}
