//! Descriptor-table installation and segment-register access.
//!
//! [`load_descriptor_table`] installs a caller-built global descriptor table and
//! refreshes every segment register against it. The sequence hard-codes the selectors it
//! loads, so any table installed through it must use the layout below:
//!
//! | index | selector | descriptor               |
//! |-------|----------|--------------------------|
//! | 0     | `0x00`   | null                     |
//! | 1     | `0x08`   | kernel code, 64-bit      |
//! | 2     | `0x10`   | kernel data              |
//!
//! Entries past index 2 are the caller's business. The two selectors are published as
//! [`KERNEL_CODE_SELECTOR`] and [`KERNEL_DATA_SELECTOR`] so table builders and the
//! reload cannot drift apart.

use core::arch::asm;

use bitfield_struct::bitfield;

/// Selector of the kernel code descriptor, index 1 at privilege level 0.
///
/// [`load_descriptor_table`] loads CS with this value. The installed table must hold a
/// 64-bit code descriptor at index 1.
pub const KERNEL_CODE_SELECTOR: SegmentSelector = SegmentSelector::new().with_index(1);

/// Selector of the kernel data descriptor, index 2 at privilege level 0.
///
/// [`load_descriptor_table`] loads DS, ES, FS, GS and SS with this value. The installed
/// table must hold a writable data descriptor at index 2.
pub const KERNEL_DATA_SELECTOR: SegmentSelector = SegmentSelector::new().with_index(2);

/// In-memory image of the value held by GDTR: the table's size in bytes minus one,
/// followed by its linear address.
///
/// The image is caller-owned and read exactly once during [`load_descriptor_table`];
/// the table it points at, on the other hand, stays live in the processor until another
/// table replaces it.
#[repr(C, packed)]
pub struct DescriptorTablePointer {
    limit: u16,
    base: u64,
}

impl DescriptorTablePointer {
    /// Builds a pointer image from the table's size in bytes minus one and its address.
    pub const fn new(limit: u16, base: u64) -> Self {
        Self { limit, base }
    }

    pub fn limit(&self) -> u16 {
        self.limit
    }

    pub fn base(&self) -> u64 {
        self.base
    }
}

/// A 16-bit segment selector: requested privilege level in the low two bits, the
/// local-table indicator above them and the descriptor index in the rest.
#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct SegmentSelector {
    #[bits(2)]
    pub requested_privilege_level: u8,
    pub local: bool,
    #[bits(13)]
    pub index: u16,
}

/// Installs the descriptor table described by `descriptor_table` and refreshes every
/// segment register from it.
///
/// One non-interruptible sequence: `lgdt` from the caller's image, then a far return
/// onto [`KERNEL_CODE_SELECTOR`] (pushing the selector and a return address is the only
/// way to reload CS; a plain `mov` cannot), then DS, ES, FS, GS and SS reloaded from
/// [`KERNEL_DATA_SELECTOR`]. The block clobbers a single scratch general-purpose
/// register chosen by the compiler and leaves every other caller register untouched. It
/// is also a full compiler-level memory barrier: the block is not declared `nomem`, so
/// no memory access is cached across it.
///
/// The effect is per-core. Bringing up several cores means running this on each one.
///
/// # Safety
///
/// The caller must be at privilege level 0 and `descriptor_table` must describe a
/// well-formed table using the layout documented at the module level, in memory that
/// outlives the installation. A table that breaks those rules does not produce an
/// error; it raises a processor exception (#GP, #SS or #NP) at or after the reload.
pub unsafe fn load_descriptor_table(descriptor_table: &DescriptorTablePointer) {
    asm!(
        "lgdt [{descriptor_table}]",
        "push {code_selector}",
        "lea {scratch}, [rip + 2f]",
        "push {scratch}",
        "retfq",
        "2:",
        "mov ds, {data_selector:x}",
        "mov es, {data_selector:x}",
        "mov fs, {data_selector:x}",
        "mov gs, {data_selector:x}",
        "mov ss, {data_selector:x}",
        descriptor_table = in(reg) descriptor_table as *const DescriptorTablePointer as u64,
        code_selector = in(reg) KERNEL_CODE_SELECTOR.into_bits() as u64,
        data_selector = in(reg) KERNEL_DATA_SELECTOR.into_bits(),
        scratch = out(reg) _,
        options(preserves_flags),
    );
}

/// Reads GDTR back into a fresh pointer image.
pub fn store_descriptor_table() -> DescriptorTablePointer {
    let mut descriptor_table = DescriptorTablePointer::new(0, 0);

    unsafe {
        asm!(
            "sgdt [{descriptor_table}]",
            descriptor_table = in(reg) &mut descriptor_table as *mut DescriptorTablePointer as u64,
            options(nostack, preserves_flags),
        );
    }

    descriptor_table
}

/// Reads the current code segment selector.
pub fn cs() -> SegmentSelector {
    let selector: u16;

    unsafe {
        asm!(
            "mov {selector:x}, cs",
            selector = out(reg) selector,
            options(nomem, nostack, preserves_flags),
        );
    }

    SegmentSelector::from_bits(selector)
}

/// Reads the current data segment selector.
pub fn ds() -> SegmentSelector {
    let selector: u16;

    unsafe {
        asm!(
            "mov {selector:x}, ds",
            selector = out(reg) selector,
            options(nomem, nostack, preserves_flags),
        );
    }

    SegmentSelector::from_bits(selector)
}

/// Reads the current extra segment selector.
pub fn es() -> SegmentSelector {
    let selector: u16;

    unsafe {
        asm!(
            "mov {selector:x}, es",
            selector = out(reg) selector,
            options(nomem, nostack, preserves_flags),
        );
    }

    SegmentSelector::from_bits(selector)
}

/// Reads the current stack segment selector.
pub fn ss() -> SegmentSelector {
    let selector: u16;

    unsafe {
        asm!(
            "mov {selector:x}, ss",
            selector = out(reg) selector,
            options(nomem, nostack, preserves_flags),
        );
    }

    SegmentSelector::from_bits(selector)
}

/// Reads the current FS segment selector.
pub fn fs() -> SegmentSelector {
    let selector: u16;

    unsafe {
        asm!(
            "mov {selector:x}, fs",
            selector = out(reg) selector,
            options(nomem, nostack, preserves_flags),
        );
    }

    SegmentSelector::from_bits(selector)
}

/// Reads the current GS segment selector.
pub fn gs() -> SegmentSelector {
    let selector: u16;

    unsafe {
        asm!(
            "mov {selector:x}, gs",
            selector = out(reg) selector,
            options(nomem, nostack, preserves_flags),
        );
    }

    SegmentSelector::from_bits(selector)
}

#[cfg(test)]
mod tests {
    use core::mem;

    use crate::segmentation::{
        DescriptorTablePointer, SegmentSelector, KERNEL_CODE_SELECTOR, KERNEL_DATA_SELECTOR,
    };

    #[test]
    fn test_descriptor_table_pointer_layout() {
        assert_eq!(mem::size_of::<DescriptorTablePointer>(), 10);

        let descriptor_table = DescriptorTablePointer::new(0x27, 0xFFFF_8000_0010_0000);

        assert_eq!(descriptor_table.limit(), 0x27);
        assert_eq!(descriptor_table.base(), 0xFFFF_8000_0010_0000);
    }

    #[test]
    fn test_kernel_selector_values() {
        assert_eq!(KERNEL_CODE_SELECTOR.into_bits(), 0x08);
        assert_eq!(KERNEL_DATA_SELECTOR.into_bits(), 0x10);

        assert_eq!(KERNEL_CODE_SELECTOR.index(), 1);
        assert_eq!(KERNEL_DATA_SELECTOR.index(), 2);
        assert_eq!(KERNEL_CODE_SELECTOR.requested_privilege_level(), 0);
        assert!(!KERNEL_CODE_SELECTOR.local());
    }

    #[test]
    fn test_selector_encoding() {
        let selector = SegmentSelector::new()
            .with_index(5)
            .with_requested_privilege_level(3);

        assert_eq!(selector.into_bits(), 0x2B);
        assert_eq!(selector.index(), 5);
        assert_eq!(selector.requested_privilege_level(), 3);
    }

    #[test]
    fn test_selector_round_trip() {
        let selector = SegmentSelector::from_bits(0x18);

        assert_eq!(selector.index(), 3);
        assert_eq!(selector.requested_privilege_level(), 0);
        assert!(!selector.local());
        assert_eq!(selector.into_bits(), 0x18);
    }
}
