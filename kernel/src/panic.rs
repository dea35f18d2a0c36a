use core::panic::PanicInfo;

use log::error;

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    error!("{info}");

    crate::arch::x86::asm::halt_loop()
}
