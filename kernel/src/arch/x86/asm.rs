use core::arch::asm;

#[inline]
pub fn disable_interrupts() {
    unsafe {
        asm!("cli", options(nostack, nomem));
    }
}

#[inline]
pub fn halt() {
    unsafe {
        asm!("hlt", options(nomem, nostack, preserves_flags));
    }
}

pub fn halt_loop() -> ! {
    loop {
        halt();
    }
}
