use core::fmt;

use crate::kernel::KernelError;

/// Aborts after a kernel invocation failed although its inputs were checked.
///
/// At that point the capability table may hold half-created objects, so
/// there is nothing sensible left to do.
#[track_caller]
pub(crate) fn kernel_failure(operation: fmt::Arguments<'_>, err: KernelError) -> ! {
    log::error!("kernel operation failed: {operation}: {err}");
    panic!("kernel operation failed: {operation}: {err}");
}
