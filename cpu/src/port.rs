//! Port-mapped I/O.
//!
//! Each function is exactly one `in` or `out` instruction. The I/O port space is
//! machine-wide and these functions do not serialize access to it; callers that share a
//! port across cores bring their own lock. No ordering with surrounding memory accesses
//! is implied either, which is why every function here is declared `nomem`: a driver
//! that needs its MMIO writes flushed before touching a port has to fence on its own.

use core::arch::asm;

/// Reads a single byte from `port`.
///
/// # Safety
///
/// Reading a port can have arbitrary side effects on the device behind it, for example
/// popping a byte off a FIFO. The caller must know what is mapped at `port`.
pub unsafe fn inb(port: u16) -> u8 {
    let byte: u8;

    asm!(
        "in al, dx",
        in("dx") port,
        out("al") byte,
        options(nomem, nostack, preserves_flags),
    );

    byte
}

/// Writes a single byte to `port`.
///
/// # Safety
///
/// Writing a port can have arbitrary side effects on the device behind it. The caller
/// must know what is mapped at `port`.
pub unsafe fn outb(port: u16, byte: u8) {
    asm!(
        "out dx, al",
        in("dx") port,
        in("al") byte,
        options(nomem, nostack, preserves_flags),
    );
}

/// Reads a 16-bit word from `port`.
///
/// # Safety
///
/// Same contract as [`inb`].
pub unsafe fn inw(port: u16) -> u16 {
    let word: u16;

    asm!(
        "in ax, dx",
        in("dx") port,
        out("ax") word,
        options(nomem, nostack, preserves_flags),
    );

    word
}

/// Writes a 16-bit word to `port`.
///
/// # Safety
///
/// Same contract as [`outb`].
pub unsafe fn outw(port: u16, word: u16) {
    asm!(
        "out dx, ax",
        in("dx") port,
        in("ax") word,
        options(nomem, nostack, preserves_flags),
    );
}

/// Reads a 32-bit doubleword from `port`.
///
/// # Safety
///
/// Same contract as [`inb`].
pub unsafe fn inl(port: u16) -> u32 {
    let doubleword: u32;

    asm!(
        "in eax, dx",
        in("dx") port,
        out("eax") doubleword,
        options(nomem, nostack, preserves_flags),
    );

    doubleword
}

/// Writes a 32-bit doubleword to `port`.
///
/// # Safety
///
/// Same contract as [`outb`].
pub unsafe fn outl(port: u16, doubleword: u32) {
    asm!(
        "out dx, eax",
        in("dx") port,
        in("eax") doubleword,
        options(nomem, nostack, preserves_flags),
    );
}
