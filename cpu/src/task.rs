//! Task-register access.

use core::arch::asm;

use crate::segmentation::SegmentSelector;

/// Loads the task register with `selector`, a single `ltr` instruction.
///
/// Unlike the descriptor-table reload, the selector is a parameter here; kernels differ
/// in where they place their TSS descriptors. The instruction marks the descriptor busy
/// in the table, so the operation is a full memory barrier rather than a pure register
/// move.
///
/// # Safety
///
/// The caller must be at privilege level 0 and `selector` must name a valid, non-busy
/// 64-bit TSS descriptor in the live descriptor table. Anything else raises a processor
/// exception (#GP or #NP); no error is returned.
pub unsafe fn load_task_register(selector: SegmentSelector) {
    asm!(
        "ltr {selector:x}",
        selector = in(reg) selector.into_bits(),
        options(nostack, preserves_flags),
    );
}

/// Reads the task register back, a single `str` instruction.
pub fn task_register() -> SegmentSelector {
    let selector: u16;

    unsafe {
        asm!(
            "str {selector:x}",
            selector = out(reg) selector,
            options(nomem, nostack, preserves_flags),
        );
    }

    SegmentSelector::from_bits(selector)
}
