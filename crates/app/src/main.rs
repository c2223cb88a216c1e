extern crate pretty_env_logger;

use anyhow::Result;
use error::publish_error;
use log::error;

use crate::driver::Driver;

mod driver;

/// Number of frames the headless demo records before reporting timings.
const DEMO_FRAMES: u32 = 240;

fn main() -> Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init_timed();

    let mut driver = Driver::init()?;
    for _ in 0..DEMO_FRAMES {
        if let Err(e) = driver.process_frame() {
            publish_error!(driver.reporter(), "{e}");
            error!("{e:#}");
        }
    }
    driver.report();
    driver.shutdown();
    Ok(())
}
