#![cfg_attr(not(test), no_std)]
#![doc = "Blocking I2C transaction executor with bounded polling, retry and bus recovery."]

// Touch controllers share the bus with other peripherals and are polled at a
// high rate, so NAKs and lost arbitration are routine. The executor absorbs
// them and only reports a failure once the retry budget is spent.

pub mod controller;
pub mod err;
pub mod executor;
pub mod hal;

pub use controller::{BusController, ControllerStatus, Transfer, TransferBuffer};
pub use err::TransportError;
pub use executor::{BusTransactionExecutor, POLL_COUNT, POLL_DELAY_MS, RETRY_COUNT};
pub use hal::HalBus;
