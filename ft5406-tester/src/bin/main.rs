#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those     holding buffers for the duration of a data transfer."
)]

use ctp_bus::HalBus;
use esp_hal::{
    clock::CpuClock,
    delay::Delay,
    i2c::master::{Config as I2cConfig, I2c},
    main,
    time::Rate,
};
use esp_println::println;
use ft5406_touch::{Ft5406, TouchEvent};
use log::{info, warn};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    println!("{}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

/// Polls the panel and logs every touch.
#[main]
fn main() -> ! {
    esp_println::logger::init_logger(log::LevelFilter::Info);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let config = I2cConfig::default().with_frequency(Rate::from_khz(400));
    let i2c = I2c::new(peripherals.I2C0, config)
        .unwrap()
        .with_sda(peripherals.GPIO13)
        .with_scl(peripherals.GPIO14);

    let mut touch = Ft5406::new(HalBus::new(i2c), Delay::new());
    match touch.init() {
        Ok(()) => info!("Touch controller initialized."),
        Err(err) => warn!("Error initializing touch controller: {err:?}"),
    }

    let delay = Delay::new();
    let (mut last_x, mut last_y) = (0, 0);
    loop {
        if !touch.is_initialized() {
            if touch.init().is_err() {
                delay.delay_millis(500);
                continue;
            }
            info!("Touch controller initialized.");
        }

        match touch.get_single_touch() {
            Ok(single) => {
                (last_x, last_y) = single.coordinates_or(last_x, last_y);
                if single.event != TouchEvent::Reserved {
                    info!("{:?} at ({last_x}, {last_y})", single.event);
                }
            }
            Err(err) => warn!("Error reading single touch: {err:?}"),
        }

        match touch.get_multi_touch() {
            Ok(multi) if multi.count > 1 => {
                for point in multi.active() {
                    info!("  #{} {:?} at ({}, {})", point.id, point.event, point.x, point.y);
                }
            }
            Ok(_) => {}
            Err(err) => warn!("Error reading touches: {err:?}"),
        }

        delay.delay_millis(20);
    }
}
