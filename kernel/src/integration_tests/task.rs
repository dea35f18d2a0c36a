//! Task-register state after bring-up.

use core::ptr::addr_of;

use cpu::task;

use crate::arch::x86::gdt::{GDT, TSS_SELECTOR};

pub fn run() -> Result<(), &'static str> {
    if task::task_register() != TSS_SELECTOR {
        return Err("TR does not hold the TSS selector");
    }

    // SAFETY: Bring-up is over; the table is static and nothing rewrites it.
    let attributes = unsafe { addr_of!(GDT.tss_segment.attributes).read() };

    // Loading TR rewrites the descriptor's type field from available to busy.
    if attributes & 0x0F != 0x0B {
        return Err("TSS descriptor was not marked busy");
    }

    Ok(())
}
