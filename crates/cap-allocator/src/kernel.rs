//! The kernel operations the allocator relies on.
//!
//! The allocator never talks to the kernel directly. Everything it needs,
//! creating objects out of untyped memory and recycling an untyped item
//! back to a pristine state, goes through the [`Kernel`] trait so that the
//! bookkeeping can be exercised without a running microkernel.

use crate::cptr::CPtr;

/// Object kinds that can be carved out of untyped memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, derive_more::IsVariant)]
pub enum ObjectType {
    /// Untyped memory of `2^object_size` bytes.
    #[display("untyped")]
    Untyped,
    #[display("tcb")]
    Tcb,
    #[display("endpoint")]
    Endpoint,
    #[display("notification")]
    Notification,
    /// Capability table with `2^object_size` slots.
    #[display("cnode")]
    CNode,
    #[display("frame")]
    Frame,
    #[display("large frame")]
    LargeFrame,
    #[display("page table")]
    PageTable,
    #[display("page directory")]
    PageDirectory,
}

impl ObjectType {
    /// Log2 of the size in bytes of one object of this type.
    ///
    /// `object_size` is only meaningful for [`ObjectType::Untyped`] (the size
    /// class itself) and [`ObjectType::CNode`] (log2 of the slot count).
    #[must_use]
    pub const fn size_bits(self, object_size: usize) -> usize {
        const SLOT_BITS: usize = 4;
        match self {
            Self::Untyped => object_size,
            Self::Tcb => 9,
            Self::Endpoint | Self::Notification => 4,
            Self::CNode => SLOT_BITS + object_size,
            Self::Frame | Self::PageDirectory => 12,
            Self::LargeFrame => 22,
            Self::PageTable => 10,
        }
    }
}

/// Errors reported by kernel invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum KernelError {
    #[display("invalid argument")]
    InvalidArgument,
    #[display("invalid capability")]
    InvalidCapability,
    #[display("illegal operation")]
    IllegalOperation,
    #[display("range error")]
    RangeError,
    #[display("alignment error")]
    AlignmentError,
    #[display("failed lookup")]
    FailedLookup,
    #[display("truncated message")]
    TruncatedMessage,
    #[display("delete first")]
    DeleteFirst,
    #[display("revoke first")]
    RevokeFirst,
    #[display("not enough memory")]
    NotEnoughMemory,
}

impl KernelError {
    /// Converts a raw syscall result. `0` means success and yields `None`;
    /// unknown codes are reported as [`KernelError::InvalidArgument`].
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        let err = match code {
            0 => return None,
            2 => Self::InvalidCapability,
            3 => Self::IllegalOperation,
            4 => Self::RangeError,
            5 => Self::AlignmentError,
            6 => Self::FailedLookup,
            7 => Self::TruncatedMessage,
            8 => Self::DeleteFirst,
            9 => Self::RevokeFirst,
            10 => Self::NotEnoughMemory,
            _ => Self::InvalidArgument,
        };
        Some(err)
    }

    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::InvalidArgument => 1,
            Self::InvalidCapability => 2,
            Self::IllegalOperation => 3,
            Self::RangeError => 4,
            Self::AlignmentError => 5,
            Self::FailedLookup => 6,
            Self::TruncatedMessage => 7,
            Self::DeleteFirst => 8,
            Self::RevokeFirst => 9,
            Self::NotEnoughMemory => 10,
        }
    }

    /// Converts a raw syscall result into a `Result`.
    pub const fn check(code: i32) -> Result<(), Self> {
        match Self::from_code(code) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Arguments of an untyped retype invocation.
///
/// Creates `count` objects of `object_type` from `untyped` and places their
/// capabilities in slots `dest_index..dest_index + count` of the table
/// `dest_root` resolved at `dest_depth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetypeRequest {
    pub untyped: CPtr,
    pub object_type: ObjectType,
    pub object_size: usize,
    pub dest_root: CPtr,
    pub dest_depth: usize,
    pub dest_index: usize,
    pub count: usize,
}

/// Kernel primitives used by the allocator.
pub trait Kernel {
    /// Creates objects from an untyped item.
    ///
    /// Either all `count` objects are created or none are.
    fn retype(&mut self, request: &RetypeRequest) -> Result<(), KernelError>;

    /// Revokes everything derived from the untyped item `cap` and makes the
    /// whole item usable again.
    fn recycle(&mut self, cap: CPtr) -> Result<(), KernelError>;

    /// Untyped size class needed to hold one object of `object_type`.
    fn object_size_bits(&self, object_type: ObjectType, object_size: usize) -> usize {
        object_type.size_bits(object_size)
    }
}

impl<K> Kernel for &mut K
where
    K: Kernel + ?Sized,
{
    fn retype(&mut self, request: &RetypeRequest) -> Result<(), KernelError> {
        (**self).retype(request)
    }

    fn recycle(&mut self, cap: CPtr) -> Result<(), KernelError> {
        (**self).recycle(cap)
    }

    fn object_size_bits(&self, object_type: ObjectType, object_size: usize) -> usize {
        (**self).object_size_bits(object_type, object_size)
    }
}
