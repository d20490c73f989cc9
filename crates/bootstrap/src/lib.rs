//! Seeding of the first-stage allocator from the boot manifest.
//!
//! When the root task starts, the kernel describes the resources it handed
//! over in a [`BootInfo`] manifest: a region of empty slots in the initial
//! capability table and a list of untyped memory capabilities with their
//! sizes. [`create_first_stage_allocator`] turns that description into a
//! ready-to-use [`Allocator`](cap_allocator::Allocator).
//!
//! ```rust
//! use bootstrap::{BootInfo, BootstrapConfig};
//! use cap_allocator::{CPtr, testing::ModelKernel};
//!
//! let kernel = ModelKernel::new();
//! kernel.insert_untyped(CPtr::new(40), 16);
//! kernel.insert_untyped(CPtr::new(41), 12);
//!
//! let bootinfo = BootInfo {
//!     empty: 64..4096,
//!     untyped: 40..42,
//!     untyped_size_bits: &[16, 12],
//! };
//! let mut allocator =
//!     bootstrap::create_first_stage_allocator(kernel, &bootinfo, &BootstrapConfig::default())
//!         .unwrap();
//! assert!(allocator.alloc_untyped(10).is_some());
//! ```

#![cfg_attr(not(test), no_std)]

pub use self::{
    bootinfo::BootInfo,
    config::{BootstrapConfig, INIT_THREAD_CNODE},
    error::BootstrapError,
    first_stage::create_first_stage_allocator,
};

mod bootinfo;
mod config;
mod error;
mod first_stage;
