use cap_allocator::CPtr;

/// Capability slot of the root task's own CNode.
pub const INIT_THREAD_CNODE: CPtr = CPtr::new(2);

/// How the first-stage allocator is set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// CNode holding the empty slot region.
    pub root_cnode: CPtr,
    /// Depth at which `root_cnode` resolves its slots.
    pub root_cnode_depth: usize,
    /// Run [`Allocator::self_test`](cap_allocator::Allocator::self_test)
    /// before handing the allocator out.
    pub self_test: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            root_cnode: INIT_THREAD_CNODE,
            root_cnode_depth: usize::BITS as usize,
            self_test: true,
        }
    }
}
