//! An in-memory kernel for exercising allocators without a microkernel.
//!
//! [`ModelKernel`] keeps track of which capability slots are occupied, how
//! much of each untyped item has been carved up and which capabilities were
//! derived from which. It models a single capability table mapped at the
//! root of the CSpace, so slot indices and [`CPtr`]s coincide.
//!
//! The handle is reference counted: clones share state, which lets a test
//! keep one clone for inspection while allocators own the others.

use alloc::{collections::BTreeMap, rc::Rc, vec::Vec};
use core::cell::RefCell;

use crate::{
    cptr::CPtr,
    kernel::{Kernel, KernelError, ObjectType, RetypeRequest},
};

/// What a capability slot of the model holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Untyped {
        size_bits: usize,
        /// `None` for items handed over at boot.
        parent: Option<CPtr>,
    },
    Object {
        object_type: ObjectType,
        parent: CPtr,
    },
}

impl Capability {
    fn parent(&self) -> Option<CPtr> {
        match self {
            Self::Untyped { parent, .. } => *parent,
            Self::Object { parent, .. } => Some(*parent),
        }
    }
}

#[derive(Debug, Default)]
struct ModelState {
    slots: BTreeMap<CPtr, Capability>,
    /// Bytes of each untyped item already used by retypes.
    watermarks: BTreeMap<CPtr, u64>,
    retype_count: usize,
    recycled: Vec<CPtr>,
    fail_next: Option<KernelError>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelKernel {
    state: Rc<RefCell<ModelState>>,
}

impl ModelKernel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a boot-time untyped item of `2^size_bits` bytes at `cap`.
    pub fn insert_untyped(&self, cap: CPtr, size_bits: usize) {
        let mut state = self.state.borrow_mut();
        state.slots.insert(
            cap,
            Capability::Untyped {
                size_bits,
                parent: None,
            },
        );
        state.watermarks.insert(cap, 0);
    }

    #[must_use]
    pub fn capability(&self, cap: CPtr) -> Option<Capability> {
        self.state.borrow().slots.get(&cap).copied()
    }

    /// Number of successful retype invocations so far.
    #[must_use]
    pub fn retype_count(&self) -> usize {
        self.state.borrow().retype_count
    }

    /// Untyped items recycled so far, in invocation order.
    #[must_use]
    pub fn recycled(&self) -> Vec<CPtr> {
        self.state.borrow().recycled.clone()
    }

    /// Number of capabilities created by retypes that still exist.
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.state
            .borrow()
            .slots
            .values()
            .filter(|cap| cap.parent().is_some())
            .count()
    }

    /// Makes the next retype or recycle fail with `err`.
    pub fn fail_next(&self, err: KernelError) {
        self.state.borrow_mut().fail_next = Some(err);
    }
}

impl ModelState {
    fn untyped_size_bits(&self, cap: CPtr) -> Result<usize, KernelError> {
        match self.slots.get(&cap) {
            Some(Capability::Untyped { size_bits, .. }) => Ok(*size_bits),
            _ => Err(KernelError::InvalidCapability),
        }
    }

    fn revoke_descendants(&mut self, cap: CPtr) {
        let mut pending = Vec::from([cap]);
        while let Some(parent) = pending.pop() {
            let children: Vec<_> = self
                .slots
                .iter()
                .filter(|(_, child)| child.parent() == Some(parent))
                .map(|(&child, _)| child)
                .collect();
            for child in children {
                self.slots.remove(&child);
                self.watermarks.remove(&child);
                pending.push(child);
            }
        }
    }
}

impl Kernel for ModelKernel {
    fn retype(&mut self, request: &RetypeRequest) -> Result<(), KernelError> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }
        if request.count == 0 {
            return Err(KernelError::RangeError);
        }

        let source_bits = state.untyped_size_bits(request.untyped)?;
        let object_bits = self.object_size_bits(request.object_type, request.object_size);
        if object_bits > source_bits || object_bits >= u64::BITS as usize {
            return Err(KernelError::RangeError);
        }

        let object_bytes = 1_u64 << object_bits;
        let watermark = state.watermarks.get(&request.untyped).copied().unwrap_or(0);
        let start = watermark.next_multiple_of(object_bytes);
        let end = start + object_bytes * request.count as u64;
        if end > 1_u64 << source_bits {
            return Err(KernelError::NotEnoughMemory);
        }

        let dest: Vec<_> = (0..request.count)
            .map(|i| CPtr::new(request.dest_index + i))
            .collect();
        if dest.iter().any(|slot| state.slots.contains_key(slot)) {
            return Err(KernelError::DeleteFirst);
        }

        for slot in dest {
            let cap = if request.object_type.is_untyped() {
                state.watermarks.insert(slot, 0);
                Capability::Untyped {
                    size_bits: request.object_size,
                    parent: Some(request.untyped),
                }
            } else {
                Capability::Object {
                    object_type: request.object_type,
                    parent: request.untyped,
                }
            };
            state.slots.insert(slot, cap);
        }
        state.watermarks.insert(request.untyped, end);
        state.retype_count += 1;
        Ok(())
    }

    fn recycle(&mut self, cap: CPtr) -> Result<(), KernelError> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }
        state.untyped_size_bits(cap)?;
        state.revoke_descendants(cap);
        state.watermarks.insert(cap, 0);
        state.recycled.push(cap);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(untyped: usize, object_type: ObjectType, object_size: usize) -> RetypeRequest {
        RetypeRequest {
            untyped: CPtr::new(untyped),
            object_type,
            object_size,
            dest_root: CPtr::new(2),
            dest_depth: 32,
            dest_index: 10,
            count: 2,
        }
    }

    #[test]
    fn test_retype_and_recycle() {
        let mut kernel = ModelKernel::new();
        kernel.insert_untyped(CPtr::new(1), 8);

        kernel.retype(&request(1, ObjectType::Untyped, 7)).unwrap();
        assert_eq!(kernel.live_objects(), 2);
        assert_eq!(
            kernel.retype(&RetypeRequest {
                dest_index: 20,
                ..request(1, ObjectType::Untyped, 4)
            }),
            Err(KernelError::NotEnoughMemory)
        );

        kernel
            .retype(&RetypeRequest {
                dest_index: 20,
                ..request(10, ObjectType::Endpoint, 0)
            })
            .unwrap();
        assert_eq!(kernel.live_objects(), 4);

        kernel.recycle(CPtr::new(1)).unwrap();
        assert_eq!(kernel.live_objects(), 0);
        assert_eq!(kernel.capability(CPtr::new(20)), None);
        assert!(kernel.capability(CPtr::new(1)).is_some());
        kernel.retype(&request(1, ObjectType::Untyped, 7)).unwrap();
    }

    #[test]
    fn test_retype_into_occupied_slot() {
        let mut kernel = ModelKernel::new();
        kernel.insert_untyped(CPtr::new(1), 12);
        kernel.insert_untyped(CPtr::new(11), 12);
        assert_eq!(
            kernel.retype(&request(1, ObjectType::Tcb, 0)),
            Err(KernelError::DeleteFirst)
        );
        assert_eq!(kernel.retype_count(), 0);
    }

    #[test]
    fn test_retype_from_non_untyped() {
        let mut kernel = ModelKernel::new();
        assert_eq!(
            kernel.retype(&request(1, ObjectType::Tcb, 0)),
            Err(KernelError::InvalidCapability)
        );
        assert_eq!(
            kernel.recycle(CPtr::new(1)),
            Err(KernelError::InvalidCapability)
        );
    }

    #[test]
    fn test_fail_next() {
        let mut kernel = ModelKernel::new();
        kernel.insert_untyped(CPtr::new(1), 12);
        kernel.fail_next(KernelError::RevokeFirst);
        assert_eq!(
            kernel.recycle(CPtr::new(1)),
            Err(KernelError::RevokeFirst)
        );
        assert_eq!(kernel.recycle(CPtr::new(1)), Ok(()));
    }
}
