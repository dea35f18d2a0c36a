mod port;
mod segmentation;
mod task;

use log::{error, info};

pub fn run() -> ! {
    info!("Running integration tests");

    let mut failed = false;

    failed |= report("port", port::run());
    failed |= report("segmentation", segmentation::run());
    failed |= report("task", task::run());

    if failed {
        crate::exit_qemu(3)
    } else {
        info!("All integration tests passed");

        crate::exit_qemu(0)
    }
}

fn report(name: &str, result: Result<(), &'static str>) -> bool {
    match result {
        Ok(()) => {
            info!("{name}: ok");

            false
        }
        Err(reason) => {
            error!("{name}: FAILED: {reason}");

            true
        }
    }
}
