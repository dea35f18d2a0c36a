pub mod asm;
pub mod e9;
pub mod gdt;

pub fn perform_arch_initialization() {
    gdt::init_gdt();
}
