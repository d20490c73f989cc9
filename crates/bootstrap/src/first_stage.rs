use cap_allocator::{Allocator, CNode, Kernel, MAX_UNTYPED_ITEMS, config::is_supported_size};
use log::{info, warn};
use snafu::ensure;

use crate::{
    bootinfo::BootInfo,
    config::BootstrapConfig,
    error::{BootstrapError, TooManyUntypedsSnafu},
};

/// Creates an allocator managing the root task's empty slots and all usable
/// untyped memory listed in `bootinfo`.
///
/// Untyped items whose size class the allocator cannot pool are skipped.
/// When `config.self_test` is set the allocator is checked with
/// [`Allocator::self_test`] before it is returned.
pub fn create_first_stage_allocator<K>(
    kernel: K,
    bootinfo: &BootInfo<'_>,
    config: &BootstrapConfig,
) -> Result<Allocator<K>, BootstrapError>
where
    K: Kernel,
{
    let slots = bootinfo.empty_slots()?;
    let items = bootinfo.untyped_items()?;
    let total = items.len();

    let usable = items
        .clone()
        .filter(|item| is_supported_size(item.size_bits))
        .count();
    ensure!(
        usable <= MAX_UNTYPED_ITEMS,
        TooManyUntypedsSnafu {
            count: usable,
            max: MAX_UNTYPED_ITEMS,
        }
    );

    let cnode = CNode::new(config.root_cnode, config.root_cnode_depth, 0);
    let mut allocator = Allocator::new(kernel, cnode, slots, &[]);
    for item in items {
        if is_supported_size(item.size_bits) {
            allocator.add_root_item(item.cap, item.size_bits);
        } else {
            warn!(
                "skipping untyped {} of unsupported size class {}",
                item.cap, item.size_bits
            );
        }
    }

    if config.self_test {
        allocator.self_test();
    }

    info!(
        "first-stage allocator: {} slots at {}, {usable}/{total} untyped items",
        slots.count, slots.first
    );
    Ok(allocator)
}
