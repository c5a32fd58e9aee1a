//! The low-level bus controller seam and its status word.

use core::fmt::Debug;
use embedded_hal::i2c::SevenBitAddress;

const BUSY: u32 = 1 << 0;
const DATA_NAK: u32 = 1 << 1;
const ADDR_NAK: u32 = 1 << 2;
const ARB_LOST: u32 = 1 << 3;
const ABORT_START: u32 = 1 << 4;
const BUS_ERR: u32 = 1 << 5;

/// Every flag that marks a transfer as failed.
pub const ERROR_MASK: u32 = DATA_NAK | ADDR_NAK | ARB_LOST | ABORT_START | BUS_ERR;

/// Status flags reported by the bus controller for the current transfer.
#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub struct ControllerStatus {
    inner: u32,
}

impl core::fmt::Debug for ControllerStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControllerStatus")
            .field("busy", &self.busy())
            .field("data_nak", &self.data_nak())
            .field("addr_nak", &self.addr_nak())
            .field("arb_lost", &self.arb_lost())
            .field("abort_start", &self.abort_start())
            .field("bus_err", &self.bus_err())
            .finish()
    }
}

impl From<u32> for ControllerStatus {
    fn from(val: u32) -> Self {
        Self { inner: val }
    }
}

impl From<ControllerStatus> for u32 {
    fn from(val: ControllerStatus) -> Self {
        val.inner
    }
}

impl ControllerStatus {
    /// A status with no flag set: idle and fault free.
    pub const fn idle() -> Self {
        Self { inner: 0 }
    }

    /// The in-flight status reported while a transfer is still running.
    pub const fn in_progress() -> Self {
        Self { inner: BUSY }
    }

    /// Marks the transfer as still in progress.
    pub const fn with_busy(self) -> Self {
        Self {
            inner: self.inner | BUSY,
        }
    }

    /// The target did not acknowledge a data byte.
    pub const fn with_data_nak(self) -> Self {
        Self {
            inner: self.inner | DATA_NAK,
        }
    }

    /// The target did not acknowledge its address.
    pub const fn with_addr_nak(self) -> Self {
        Self {
            inner: self.inner | ADDR_NAK,
        }
    }

    /// Another controller won arbitration.
    pub const fn with_arb_lost(self) -> Self {
        Self {
            inner: self.inner | ARB_LOST,
        }
    }

    /// The start condition could not be generated.
    pub const fn with_abort_start(self) -> Self {
        Self {
            inner: self.inner | ABORT_START,
        }
    }

    /// A misplaced start or stop condition was detected on the bus.
    pub const fn with_bus_err(self) -> Self {
        Self {
            inner: self.inner | BUS_ERR,
        }
    }

    /// Transfer still in progress.
    pub fn busy(self) -> bool {
        (self.inner & BUSY) > 0
    }

    /// Data byte was not acknowledged.
    pub fn data_nak(self) -> bool {
        (self.inner & DATA_NAK) > 0
    }

    /// Address was not acknowledged.
    pub fn addr_nak(self) -> bool {
        (self.inner & ADDR_NAK) > 0
    }

    /// Arbitration lost.
    pub fn arb_lost(self) -> bool {
        (self.inner & ARB_LOST) > 0
    }

    /// Start condition aborted.
    pub fn abort_start(self) -> bool {
        (self.inner & ABORT_START) > 0
    }

    /// Generic bus error.
    pub fn bus_err(self) -> bool {
        (self.inner & BUS_ERR) > 0
    }

    /// Returns true if any flag of [`ERROR_MASK`] is set.
    pub fn is_error(self) -> bool {
        (self.inner & ERROR_MASK) > 0
    }
}

/// The data side of a transfer.
pub enum TransferBuffer<'a> {
    /// Bytes to send to the target.
    Write(&'a [u8]),
    /// Storage for bytes received from the target.
    Read(&'a mut [u8]),
}

/// A transfer descriptor handed to the controller.
pub struct Transfer<'a> {
    /// 7-bit target address.
    pub address: SevenBitAddress,
    /// The buffer to send from or receive into.
    pub buffer: TransferBuffer<'a>,
    /// If set the controller keeps the bus after the last byte instead of
    /// generating a stop condition.
    pub pending: bool,
}

impl<'a> Transfer<'a> {
    /// A complete write transaction: start, address, `bytes`, stop.
    pub fn write(address: SevenBitAddress, bytes: &'a [u8]) -> Self {
        Self {
            address,
            buffer: TransferBuffer::Write(bytes),
            pending: false,
        }
    }

    /// A complete read transaction: start, address, `buffer.len()` bytes, stop.
    pub fn read(address: SevenBitAddress, buffer: &'a mut [u8]) -> Self {
        Self {
            address,
            buffer: TransferBuffer::Read(buffer),
            pending: false,
        }
    }

    /// Number of bytes requested by this transfer.
    pub fn len(&self) -> usize {
        match &self.buffer {
            TransferBuffer::Write(bytes) => bytes.len(),
            TransferBuffer::Read(buffer) => buffer.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_write(&self) -> bool {
        matches!(self.buffer, TransferBuffer::Write(_))
    }
}

/// A bus controller able to run one transfer at a time.
///
/// This mirrors how an interrupt or DMA driven I2C engine is driven: a
/// transfer is started, its status is polled until it is no longer busy, and
/// the number of bytes actually moved can be queried afterwards. The transfer
/// descriptor is passed to every poll so engines that move data while being
/// polled can write into the receive buffer.
pub trait BusController {
    /// Error returned when a transfer cannot be started.
    type Error: Debug;

    /// Starts `transfer`. An error means nothing was put on the bus.
    fn start(&mut self, transfer: &mut Transfer<'_>) -> Result<(), Self::Error>;

    /// Returns the status of the transfer started last.
    fn status(&mut self, transfer: &mut Transfer<'_>) -> ControllerStatus;

    /// Number of bytes moved by the transfer started last.
    fn transfer_count(&mut self) -> usize;

    /// Disables the controller, dropping any latched error state.
    fn disable(&mut self);

    /// Enables the controller again.
    fn enable(&mut self);

    /// Recovers the controller after a failed transfer.
    fn recover(&mut self) {
        self.disable();
        self.enable();
    }
}

impl<T: BusController + ?Sized> BusController for &mut T {
    type Error = T::Error;

    #[inline]
    fn start(&mut self, transfer: &mut Transfer<'_>) -> Result<(), Self::Error> {
        T::start(self, transfer)
    }

    #[inline]
    fn status(&mut self, transfer: &mut Transfer<'_>) -> ControllerStatus {
        T::status(self, transfer)
    }

    #[inline]
    fn transfer_count(&mut self) -> usize {
        T::transfer_count(self)
    }

    #[inline]
    fn disable(&mut self) {
        T::disable(self)
    }

    #[inline]
    fn enable(&mut self) {
        T::enable(self)
    }

    #[inline]
    fn recover(&mut self) {
        T::recover(self)
    }
}
