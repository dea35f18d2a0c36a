//! Bochs/QEMU debug console on port 0xE9.

use cpu::port::outb;

const DEBUG_PORT: u16 = 0xE9;

pub struct DebugPort;

impl core::fmt::Write for DebugPort {
    fn write_str(&mut self, string: &str) -> core::fmt::Result {
        for byte in string.bytes() {
            // SAFETY: The debug console swallows bytes and has no device state.
            unsafe {
                outb(DEBUG_PORT, byte);
            }
        }

        Ok(())
    }
}
