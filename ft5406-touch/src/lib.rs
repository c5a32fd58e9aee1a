//! A blocking, `no_std` driver for the FT5406 capacitive touch panel controller.
//!
//! This driver provides an `Ft5406` to interact with the FT5406 over I2C. It
//! puts the controller into its normal operating mode and reads either the
//! first touch point or all (up to five) touch points.
//!
//! Every bus transaction goes through the `ctp-bus` executor, which polls the
//! bus controller for completion and retries failed transfers with a bus
//! recovery in between. Transient NAKs and lost arbitration are therefore
//! absorbed and only reported once the retry budget is spent.
//!
//! # Usage
//!
//! Any blocking `embedded-hal` I2C bus can be used through `ctp_bus::HalBus`.
//! Platforms exposing a status-polled I2C engine can implement
//! `ctp_bus::BusController` directly.
//!
//! ```ignore
//! # #![no_std]
//! # #![no_main]
//! # use esp_hal::i2c::master::I2c;
//! # use esp_hal::delay::Delay;
//! # use esp_hal::time::Rate;
//! use ctp_bus::HalBus;
//! use ft5406_touch::touch::Ft5406;
//!
//! # fn run(peripherals: esp_hal::peripherals::Peripherals) {
//! let config = esp_hal::i2c::master::Config::default().with_frequency(Rate::from_khz(400));
//! let i2c = I2c::new(peripherals.I2C0, config)
//!     .unwrap()
//!     .with_sda(peripherals.GPIO13)
//!     .with_scl(peripherals.GPIO14);
//!
//! let mut touch = Ft5406::new(HalBus::new(i2c), Delay::new());
//! touch.init().unwrap();
//!
//! loop {
//!     if let Ok(touches) = touch.get_multi_touch() {
//!         for point in touches.active() {
//!             // log::info!("Touch: {:?}", point);
//!         }
//!     }
//! }
//! # }
//! ```

#![cfg_attr(not(test), no_std)]

pub mod frame;
pub mod touch;

pub use frame::{DecodedTouchPoint, TouchEvent, TouchFrame, FRAME_LEN, MAX_TOUCHES};
pub use touch::{Ft5406, MultiTouch, SingleTouch, I2C_ADDRESS};
