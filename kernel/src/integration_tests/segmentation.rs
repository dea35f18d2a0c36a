//! Segment-register state after bring-up and across a descriptor-table reinstall.

use core::mem;
use core::ptr::addr_of;

use cpu::segmentation::{
    self, load_descriptor_table, store_descriptor_table, KERNEL_CODE_SELECTOR,
    KERNEL_DATA_SELECTOR,
};

use crate::arch::x86::gdt::{GlobalDescriptorTable, GDT};

pub fn run() -> Result<(), &'static str> {
    if segmentation::cs() != KERNEL_CODE_SELECTOR {
        return Err("CS does not hold the kernel code selector");
    }

    if segmentation::ds() != KERNEL_DATA_SELECTOR {
        return Err("DS does not hold the kernel data selector");
    }

    if segmentation::es() != KERNEL_DATA_SELECTOR {
        return Err("ES does not hold the kernel data selector");
    }

    if segmentation::ss() != KERNEL_DATA_SELECTOR {
        return Err("SS does not hold the kernel data selector");
    }

    if segmentation::fs() != KERNEL_DATA_SELECTOR {
        return Err("FS does not hold the kernel data selector");
    }

    if segmentation::gs() != KERNEL_DATA_SELECTOR {
        return Err("GS does not hold the kernel data selector");
    }

    let installed = store_descriptor_table();
    let base = installed.base();
    let limit = installed.limit();

    // SAFETY: The image read back from GDTR describes the table that is already live,
    // so reinstalling it changes nothing for the processor.
    let gdt_base = unsafe {
        load_descriptor_table(&installed);

        addr_of!(GDT) as u64
    };

    // The two locals crossed the reload; the sequence may clobber only its scratch
    // register.
    if base != gdt_base {
        return Err("GDTR base does not point at the kernel table");
    }

    if limit != mem::size_of::<GlobalDescriptorTable>() as u16 - 1 {
        return Err("GDTR limit does not match the kernel table");
    }

    let reread = store_descriptor_table();

    if reread.base() != base || reread.limit() != limit {
        return Err("GDTR changed across a reinstall");
    }

    if segmentation::cs() != KERNEL_CODE_SELECTOR || segmentation::ss() != KERNEL_DATA_SELECTOR {
        return Err("selectors changed across a reinstall");
    }

    Ok(())
}
