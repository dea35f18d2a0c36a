//! Round-trips through ports QEMU backs with real and with no state.

use cpu::port::{inb, inl, inw, outb, outl, outw};

use crate::serial::SerialPort;

/// Offset of the 16550 scratch register, a byte of storage with no device function.
const SCRATCH_REGISTER_OFFSET: u16 = 7;

/// POST diagnostic port. Nothing is attached to it; accesses go nowhere.
const POST_PORT: u16 = 0x80;

pub fn run() -> Result<(), &'static str> {
    let scratch = SerialPort::COM1.port() + SCRATCH_REGISTER_OFFSET;

    // SAFETY: The scratch register stores a byte and drives no device state.
    unsafe {
        outb(scratch, 0x55);

        if inb(scratch) != 0x55 {
            return Err("scratch register did not hold 0x55");
        }

        outb(scratch, 0xAA);

        if inb(scratch) != 0xAA {
            return Err("scratch register did not hold 0xAA");
        }
    }

    // SAFETY: Accesses to an unbacked port complete without faulting; a read just
    // returns whatever the bus floats to. Every width goes nowhere the same way.
    unsafe {
        outb(POST_PORT, 0x1B);

        let _ = inb(POST_PORT);

        outw(POST_PORT, 0x1B1B);

        let _ = inw(POST_PORT);

        outl(POST_PORT, 0x1B1B_1B1B);

        let _ = inl(POST_PORT);
    }

    Ok(())
}
