use core::sync::atomic::{AtomicBool, Ordering};

use cpu::port::{inb, outb};
use snafu::Snafu;

const COM1: u16 = 0x3F8;

static IS_COM1_CLAIMED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Snafu)]
pub enum SerialOpenError {
    #[snafu(display("Port is already open"))]
    AlreadyOpen,

    #[snafu(display("Loopback test failed"))]
    LoopbackFailed,
}

#[derive(Clone, Copy)]
pub enum SerialPort {
    COM1,
}

impl SerialPort {
    pub fn port(&self) -> u16 {
        match *self {
            SerialPort::COM1 => COM1,
        }
    }

    pub fn open(&self) -> Result<Serial, SerialOpenError> {
        if IS_COM1_CLAIMED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SerialOpenError::AlreadyOpen);
        }

        // Source: https://wiki.osdev.org/Serial_Ports

        let port = self.port();

        // SAFETY: The port is claimed above and these are the documented 16550
        // registers behind it.
        unsafe {
            outb(port + 1, 0x00); // Disable all interrupts

            outb(port + 3, 0x80); // Enable DLAB (set baud rate divisor)
            outb(port + 0, 0x03); // Set divisor to 3 (lo byte) 38400 baud
            outb(port + 1, 0x00); //                  (hi byte)
            outb(port + 3, 0x03); // 8 bits, no parity, one stop bit

            outb(port + 2, 0xC7); // Enable FIFO, clear them, with 14-byte threshold

            outb(port + 4, 0x0B); // IRQs enabled, RTS/DSR set

            outb(port + 4, 0x1E); // Set in loopback mode, test the serial chip

            // Test serial chip (send byte 0xAE and check if serial returns same byte)
            outb(port + 0, 0xAE);

            if inb(port + 0) != 0xAE {
                return Err(SerialOpenError::LoopbackFailed);
            }

            // If serial is not faulty set it in normal operation mode
            // (not-loopback with IRQs enabled and OUT#1 and OUT#2 bits enabled)
            outb(port + 4, 0x0F);
        }

        Ok(Serial { port })
    }
}

pub struct Serial {
    port: u16,
}

impl core::fmt::Write for Serial {
    fn write_str(&mut self, string: &str) -> core::fmt::Result {
        for byte in string.bytes() {
            // SAFETY: The port was claimed and initialized in open.
            unsafe {
                while inb(self.port + 5) & 0x20 == 0 {}

                outb(self.port, byte);
            }
        }

        Ok(())
    }
}
