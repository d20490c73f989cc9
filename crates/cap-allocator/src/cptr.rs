use core::ops::Add;

/// Address of a capability in the caller's CSpace.
///
/// Zero is an ordinary address here; allocation failures are reported with
/// `Option` rather than a null capability.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::Display,
    derive_more::From,
)]
#[display("{_0:#x}")]
pub struct CPtr(usize);

impl CPtr {
    #[must_use]
    pub const fn new(value: usize) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> usize {
        self.0
    }
}

impl Add<usize> for CPtr {
    type Output = Self;

    fn add(self, rhs: usize) -> Self::Output {
        Self(self.0 + rhs)
    }
}

/// The capability table an allocator writes new capabilities into.
///
/// `root` and `depth` name the table when invoking the kernel. `offset` is
/// added to slot indices to form the [`CPtr`]s handed back to callers, for
/// tables that are not mapped at the root of the CSpace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CNode {
    root: CPtr,
    depth: usize,
    offset: usize,
}

impl CNode {
    #[must_use]
    pub const fn new(root: CPtr, depth: usize, offset: usize) -> Self {
        Self {
            root,
            depth,
            offset,
        }
    }

    #[must_use]
    pub const fn root(&self) -> CPtr {
        self.root
    }

    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Capability address of slot `index` of this table.
    #[must_use]
    pub const fn cptr(&self, index: usize) -> CPtr {
        CPtr(self.offset + index)
    }

    /// Slot index of `cptr` within this table, if it lies past the offset.
    #[must_use]
    pub const fn index_of(&self, cptr: CPtr) -> Option<usize> {
        cptr.0.checked_sub(self.offset)
    }
}

/// A run of capabilities created by a single retype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapRange {
    pub first: CPtr,
    pub count: usize,
}

impl CapRange {
    /// Iterates over the capabilities in the run.
    pub fn iter(&self) -> impl Iterator<Item = CPtr> + use<> {
        let first = self.first;
        (0..self.count).map(move |i| first + i)
    }
}

/// An untyped memory capability together with its size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UntypedItem {
    pub cap: CPtr,
    pub size_bits: usize,
}

impl UntypedItem {
    #[must_use]
    pub const fn new(cap: CPtr, size_bits: usize) -> Self {
        Self { cap, size_bits }
    }
}
