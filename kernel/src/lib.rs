#![allow(dead_code)]
#![cfg_attr(not(test), no_std)]
#![cfg_attr(test, allow(unused_imports))]

mod arch;
mod constants;
mod logger;
mod panic;
mod serial;

#[cfg(feature = "integration-tests")]
mod integration_tests;

use log::info;
use raw_cpuid::CpuId;

use crate::serial::SerialPort;

fn boot() {
    arch::x86::asm::disable_interrupts();

    let serial = match SerialPort::COM1.open() {
        Ok(serial) => serial,
        // No working serial port means no way to report anything.
        Err(_) => arch::x86::asm::halt_loop(),
    };

    if logger::init_serial_logger(serial).is_err() {
        arch::x86::asm::halt_loop();
    }

    info!("This is {} v{}", constants::NAME, constants::VERSION);

    if !constants::GIT_HASH.is_empty() {
        info!("Built from {}", constants::GIT_HASH);
    }

    if let Some(brand) = CpuId::new().get_processor_brand_string() {
        info!("Running on {}", brand.as_str());
    }

    arch::x86::perform_arch_initialization();

    info!("Installed the descriptor tables");
}

#[cfg(not(feature = "integration-tests"))]
#[no_mangle]
pub extern "C" fn kmain() -> ! {
    boot();

    info!("Entering halt loop");

    arch::x86::asm::halt_loop()
}

#[cfg(feature = "integration-tests")]
#[no_mangle]
pub extern "C" fn kmain() -> ! {
    boot();

    integration_tests::run()
}

fn exit_qemu(code: u8) -> ! {
    if code == 0 {
        // PM1a control is a 16-bit register; 0x2000 is SLP_EN with sleep type 0.
        unsafe {
            cpu::port::outw(0x604, 0x2000);
        }
    } else {
        // isa-debug-exit is dword-wide and exits with the written value doubled plus one.
        unsafe {
            cpu::port::outl(0xF4, (code >> 1) as u32);
        }
    }

    arch::x86::asm::halt_loop()
}
