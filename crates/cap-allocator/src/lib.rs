//! Bootstrap-time allocator for capability slots and untyped memory.
//!
//! A process starting on a capability-based microkernel receives two scarce
//! resources: a window of free slots in its capability table, and a handful
//! of untyped memory regions whose sizes are powers of two. This crate hands
//! those resources out during bootstrap.
//!
//! # Overview
//!
//! [`Allocator`] composes three pieces:
//!
//! - a bump allocator over the free slot window ([`SlotRange`]);
//! - a root table of the untyped items the allocator was seeded with, each
//!   either available or leased out;
//! - one small LIFO pool per size class holding untyped items produced by
//!   splitting a larger item in two.
//!
//! Requests for an untyped item of a given size class are served from the
//! class's pool, then from an unused root item of exactly that class, and
//! finally by splitting a larger item with the kernel's retype primitive.
//! Nothing is ever freed individually: [`Allocator::reset`] recycles every
//! root item that was touched and returns the allocator to its seeded state.
//!
//! A child allocator created with [`Allocator::create_child`] steals all the
//! untyped memory its parent still has available. Resetting the child leaves
//! the parent untouched; resetting the parent revokes everything, including
//! what the child built, because the kernel recycles whole derivation trees.
//!
//! # Usage Examples
//!
//! ```rust
//! use cap_allocator::{Allocator, CNode, CPtr, ObjectType, SlotRange, UntypedItem};
//! use cap_allocator::testing::ModelKernel;
//!
//! let kernel = ModelKernel::new();
//! kernel.insert_untyped(CPtr::new(1000), 12);
//!
//! let mut allocator = Allocator::new(
//!     kernel,
//!     CNode::new(CPtr::new(2), 32, 0),
//!     SlotRange::new(100, 64),
//!     &[UntypedItem::new(CPtr::new(1000), 12)],
//! );
//!
//! let tcb = allocator.alloc_object(ObjectType::Tcb, 0).unwrap();
//! let small = allocator.alloc_untyped(4).unwrap();
//! assert_ne!(tcb, small);
//!
//! // Throw away everything created so far.
//! allocator.reset();
//! assert_eq!(allocator.slots_used(), 0);
//! ```
//!
//! # Error Handling
//!
//! Running out of slots or memory is an ordinary outcome and is reported as
//! `None`; a failed request leaves the allocator exactly as it was.
//! Contract violations (unsupported size classes on seeding, root table
//! overflow, a kernel error from a retype or recycle whose inputs were
//! already validated) are not recoverable and panic.
//!
//! # Thread Safety
//!
//! The allocator is meant to be driven by a single thread during bootstrap.
//! It is `Send` when its kernel handle is, but it holds no locks; wrap it in
//! a mutex before sharing it.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

#[cfg(any(test, feature = "testing"))]
extern crate alloc;

pub use self::{
    allocator::Allocator,
    config::{MAX_UNTYPED_ITEMS, MAX_UNTYPED_SIZE, MIN_UNTYPED_SIZE, NUM_SIZE_CLASSES},
    cptr::{CNode, CPtr, CapRange, UntypedItem},
    kernel::{Kernel, KernelError, ObjectType, RetypeRequest},
    pool::RootItem,
    slot::SlotRange,
    vka::{CSpacePath, UtspaceError, Vka},
};

mod allocator;
pub mod config;
mod cptr;
mod error;
pub mod kernel;
mod object;
mod pool;
mod slot;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod vka;
