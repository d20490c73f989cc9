//! Adapter to the generic kernel-object allocator interface.
//!
//! Higher level libraries allocate slots and objects through the [`Vka`]
//! trait instead of talking to a concrete allocator. [`Allocator`] implements
//! it by forwarding to its own operations. Untyped items cannot be freed one
//! at a time, and their physical addresses are not tracked, so the interface
//! offers neither.

use log::trace;

use crate::{
    allocator::Allocator,
    config::CSPACE_DEPTH,
    cptr::CPtr,
    kernel::{Kernel, KernelError, ObjectType, RetypeRequest},
};

/// Full description of one capability slot, as needed by kernel
/// invocations that take a destination slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CSpacePath {
    /// Address of the slot resolved from the root of the CSpace.
    pub cap_ptr: CPtr,
    pub cap_depth: usize,
    pub root: CPtr,
    /// Table containing the slot.
    pub dest: CPtr,
    pub dest_depth: usize,
    /// Index of the slot within `dest`.
    pub offset: usize,
    pub window: usize,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error, derive_more::From,
)]
pub enum UtspaceError {
    #[display("no untyped memory of the requested size is available")]
    OutOfMemory,
    #[display("retype failed: {_0}")]
    #[from]
    Kernel(KernelError),
}

/// Generic interface for allocating slots and kernel objects.
pub trait Vka {
    /// Allocates an empty slot.
    fn cspace_alloc(&mut self) -> Option<CPtr>;

    /// Gives a slot back. Implementations may keep it consumed.
    fn cspace_free(&mut self, slot: CPtr);

    /// Describes `slot` for use as a kernel invocation destination.
    fn cspace_make_path(&self, slot: CPtr) -> CSpacePath;

    /// Creates an object of `object_type` in the slot described by `dest`.
    fn utspace_alloc(
        &mut self,
        dest: &CSpacePath,
        object_type: ObjectType,
        object_size: usize,
    ) -> Result<(), UtspaceError>;
}

impl<K> Vka for Allocator<K>
where
    K: Kernel,
{
    fn cspace_alloc(&mut self) -> Option<CPtr> {
        self.alloc_slot()
    }

    fn cspace_free(&mut self, slot: CPtr) {
        self.free_slot(slot);
    }

    fn cspace_make_path(&self, slot: CPtr) -> CSpacePath {
        let cnode = self.cnode();
        CSpacePath {
            cap_ptr: slot,
            cap_depth: CSPACE_DEPTH,
            root: cnode.root(),
            dest: cnode.root(),
            dest_depth: cnode.depth(),
            offset: cnode.index_of(slot).unwrap_or(slot.value()),
            window: 1,
        }
    }

    fn utspace_alloc(
        &mut self,
        dest: &CSpacePath,
        object_type: ObjectType,
        object_size: usize,
    ) -> Result<(), UtspaceError> {
        let size_bits = self.kernel().object_size_bits(object_type, object_size);
        let untyped = self
            .alloc_untyped(size_bits)
            .ok_or(UtspaceError::OutOfMemory)?;
        let request = RetypeRequest {
            untyped,
            object_type,
            object_size,
            dest_root: dest.dest,
            dest_depth: dest.dest_depth,
            dest_index: dest.offset,
            count: 1,
        };
        self.kernel_mut().retype(&request)?;
        trace!("vka: created {object_type} at {}", dest.cap_ptr);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CNode, SlotRange, UntypedItem,
        testing::{Capability, ModelKernel},
    };

    fn allocator() -> (ModelKernel, Allocator<ModelKernel>) {
        let kernel = ModelKernel::new();
        kernel.insert_untyped(CPtr::new(1), 12);
        let allocator = Allocator::new(
            kernel.clone(),
            CNode::new(CPtr::new(2), 32, 0),
            SlotRange::new(100, 32),
            &[UntypedItem::new(CPtr::new(1), 12)],
        );
        (kernel, allocator)
    }

    #[test]
    fn test_make_path() {
        let (_, allocator) = allocator();
        let path = allocator.cspace_make_path(CPtr::new(105));
        assert_eq!(
            path,
            CSpacePath {
                cap_ptr: CPtr::new(105),
                cap_depth: 32,
                root: CPtr::new(2),
                dest: CPtr::new(2),
                dest_depth: 32,
                offset: 105,
                window: 1,
            }
        );
    }

    #[test]
    fn test_cspace_alloc_and_free() {
        let (_, mut allocator) = allocator();
        let slot = allocator.cspace_alloc().unwrap();
        assert_eq!(slot, CPtr::new(100));
        allocator.cspace_free(slot);
        assert_eq!(allocator.cspace_alloc(), Some(slot));
    }

    #[test]
    fn test_utspace_alloc() {
        let (kernel, mut allocator) = allocator();
        let slot = allocator.cspace_alloc().unwrap();
        let path = allocator.cspace_make_path(slot);
        allocator
            .utspace_alloc(&path, ObjectType::PageTable, 0)
            .unwrap();
        assert!(matches!(
            kernel.capability(slot),
            Some(Capability::Object {
                object_type: ObjectType::PageTable,
                ..
            })
        ));
    }

    #[test]
    fn test_utspace_alloc_out_of_memory() {
        let (_, mut allocator) = allocator();
        let slot = allocator.cspace_alloc().unwrap();
        let path = allocator.cspace_make_path(slot);
        assert_eq!(
            allocator.utspace_alloc(&path, ObjectType::LargeFrame, 0),
            Err(UtspaceError::OutOfMemory)
        );
    }

    #[test]
    fn test_utspace_alloc_reports_kernel_error() {
        let (_, mut allocator) = allocator();
        let slot = allocator.cspace_alloc().unwrap();
        let path = allocator.cspace_make_path(slot);
        allocator
            .utspace_alloc(&path, ObjectType::Endpoint, 0)
            .unwrap();
        // The slot is already occupied by the first endpoint.
        assert_eq!(
            allocator.utspace_alloc(&path, ObjectType::Endpoint, 0),
            Err(UtspaceError::Kernel(KernelError::DeleteFirst))
        );
    }

    #[test]
    fn test_utspace_error_from_kernel_error() {
        assert_eq!(
            UtspaceError::from(KernelError::NotEnoughMemory),
            UtspaceError::Kernel(KernelError::NotEnoughMemory)
        );
        assert_eq!(
            UtspaceError::from(KernelError::RangeError).to_string(),
            "retype failed: range error"
        );
    }
}
