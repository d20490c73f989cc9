//! Creation of single kernel objects.

use log::trace;

use crate::{
    allocator::Allocator,
    cptr::CPtr,
    kernel::{Kernel, ObjectType},
};

impl<K> Allocator<K>
where
    K: Kernel,
{
    /// Allocates one kernel object of the given type.
    ///
    /// Picks an untyped item just large enough for the object and retypes it
    /// into a fresh slot. Returns `None` if memory or slots run out; nothing
    /// is consumed in that case.
    ///
    /// # Panics
    ///
    /// Panics if the kernel rejects the retype, or if it yields anything but
    /// a single object.
    pub fn alloc_object(&mut self, object_type: ObjectType, object_size: usize) -> Option<CPtr> {
        let size_bits = self.kernel().object_size_bits(object_type, object_size);
        let untyped = self.alloc_untyped_reserving(size_bits, 1)?;
        let objects = self.retype_untyped(untyped, object_type, object_size, 1)?;

        // `retype_untyped` reports the count it requested, and the kernel
        // creates all objects or none, so this holds by construction.
        assert_eq!(
            objects.count, 1,
            "retype of {untyped} created {} {object_type} objects",
            objects.count
        );
        trace!("allocated {object_type} at {}", objects.first);
        Some(objects.first)
    }
}
