//! [`BusController`] on top of a blocking `embedded-hal` I2C bus.

use core::convert::Infallible;
use embedded_hal::i2c::{Error, ErrorKind, I2c, NoAcknowledgeSource, SevenBitAddress};

use crate::controller::{BusController, ControllerStatus, Transfer, TransferBuffer};

/// Runs each transfer as one blocking `embedded-hal` transaction.
///
/// The transaction completes inside [`BusController::start`], so the first
/// status poll already sees the final outcome. HAL errors are mapped onto the
/// controller status flags, which lets the executor retry and recover them.
/// `embedded-hal` has no notion of resetting the peripheral, so disabling and
/// enabling only clear the recorded outcome.
pub struct HalBus<I2C> {
    i2c: I2C,
    status: ControllerStatus,
    transferred: usize,
    enabled: bool,
}

impl<I2C> HalBus<I2C>
where
    I2C: I2c<SevenBitAddress>,
{
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            status: ControllerStatus::idle(),
            transferred: 0,
            enabled: true,
        }
    }

    /// Safely clean up the adapter, returning the I2C bus.
    pub fn destroy(self) -> I2C {
        self.i2c
    }
}

impl<I2C> BusController for HalBus<I2C>
where
    I2C: I2c<SevenBitAddress>,
{
    type Error = Infallible;

    fn start(&mut self, transfer: &mut Transfer<'_>) -> Result<(), Self::Error> {
        if !self.enabled {
            log::warn!("i2c 0x{:02X}: transfer started on disabled bus", transfer.address);
        }

        let address = transfer.address;
        let result = match &mut transfer.buffer {
            TransferBuffer::Write(bytes) => self.i2c.write(address, *bytes),
            TransferBuffer::Read(buffer) => self.i2c.read(address, buffer),
        };

        match result {
            Ok(()) => {
                self.status = ControllerStatus::idle();
                self.transferred = transfer.len();
            }
            Err(err) => {
                log::trace!("i2c 0x{address:02X}: {:?}", err.kind());
                self.status = status_from_kind(err.kind());
                self.transferred = 0;
            }
        }
        Ok(())
    }

    fn status(&mut self, _transfer: &mut Transfer<'_>) -> ControllerStatus {
        self.status
    }

    fn transfer_count(&mut self) -> usize {
        self.transferred
    }

    fn disable(&mut self) {
        log::debug!("i2c: disable");
        self.enabled = false;
        self.status = ControllerStatus::idle();
        self.transferred = 0;
    }

    fn enable(&mut self) {
        log::debug!("i2c: enable");
        self.enabled = true;
    }
}

/// Maps an `embedded-hal` error kind onto the controller status flags.
fn status_from_kind(kind: ErrorKind) -> ControllerStatus {
    let status = ControllerStatus::idle();
    match kind {
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data) => status.with_data_nak(),
        ErrorKind::NoAcknowledge(_) => status.with_addr_nak(),
        ErrorKind::ArbitrationLoss => status.with_arb_lost(),
        _ => status.with_bus_err(),
    }
}
