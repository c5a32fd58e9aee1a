//! Core implementation of the FT5406 touch controller driver.

use ctp_bus::{BusController, BusTransactionExecutor, TransportError};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::SevenBitAddress;

use crate::frame::{self, DecodedTouchPoint, TouchEvent, TouchFrame, FRAME_LEN, MAX_TOUCHES};

pub const I2C_ADDRESS: SevenBitAddress = 0x38;

const REG_DEVICE_MODE: u8 = 0x00;
const REG_TOUCH_DATA: u8 = 0x01;
const NORMAL_MODE: u8 = 0x00;

/// The state of the first touch point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleTouch {
    /// The event of the first touch point.
    pub event: TouchEvent,
    /// Only set for [`TouchEvent::Down`] and [`TouchEvent::Contact`].
    pub x: Option<u16>,
    /// Only set for [`TouchEvent::Down`] and [`TouchEvent::Contact`].
    pub y: Option<u16>,
}

impl Default for SingleTouch {
    fn default() -> Self {
        Self {
            event: TouchEvent::Reserved,
            x: None,
            y: None,
        }
    }
}

impl SingleTouch {
    /// Returns the decoded coordinates, or the given ones if none were
    /// decoded.
    ///
    /// On [`TouchEvent::Up`] the controller does not report a position, so
    /// passing the last known position keeps it for the release.
    pub fn coordinates_or(&self, x: u16, y: u16) -> (u16, u16) {
        (self.x.unwrap_or(x), self.y.unwrap_or(y))
    }
}

/// All touch points of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiTouch {
    /// Number of valid entries at the start of `points`.
    pub count: u8,
    /// Slots at and past `count` are [`DecodedTouchPoint::CLEARED`].
    pub points: [DecodedTouchPoint; MAX_TOUCHES],
}

impl MultiTouch {
    /// The valid touch points.
    pub fn active(&self) -> &[DecodedTouchPoint] {
        &self.points[..self.count as usize]
    }
}

/// The bus executor and receive buffer of one physical controller.
struct DriverContext<B, D> {
    executor: BusTransactionExecutor<B, D>,
    touch_buff: [u8; FRAME_LEN],
}

/// A driver for the FT5406 touch panel controller.
pub struct Ft5406<B, D> {
    context: DriverContext<B, D>,
    initialized: bool,
}

impl<B, D> Ft5406<B, D>
where
    B: BusController,
    D: DelayNs,
{
    /// Creates a new `Ft5406`.
    ///
    /// # Arguments
    ///
    /// * `bus` - A configured bus controller connected to the touch panel.
    /// * `delay` - A delay provider used while waiting for bus transfers.
    pub fn new(bus: B, delay: D) -> Self {
        Self {
            context: DriverContext {
                executor: BusTransactionExecutor::new(bus, delay),
                touch_buff: [0; FRAME_LEN],
            },
            initialized: false,
        }
    }

    /// Puts the controller into its normal operating mode.
    ///
    /// Must succeed before any touch data is read.
    pub fn init(&mut self) -> Result<(), TransportError<B::Error>> {
        self.context
            .executor
            .write(I2C_ADDRESS, &[REG_DEVICE_MODE, NORMAL_MODE])
            .inspect_err(|err| log::warn!("Error writing REG_DEVICE_MODE: {err:?}"))?;
        self.initialized = true;
        log::debug!("FT5406 in normal mode");
        Ok(())
    }

    /// Returns true once [`Ft5406::init`] succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Reads and decodes one touch data frame.
    pub fn read_frame(&mut self) -> Result<TouchFrame, TransportError<B::Error>> {
        let frame = frame::decode(self.fetch()?);
        log::trace!("touch frame: {frame:?}");
        Ok(frame)
    }

    /// Reads the state of the first touch point.
    ///
    /// The first record is evaluated whatever the touch count says, so the
    /// release of the last finger is still reported as [`TouchEvent::Up`].
    /// Coordinates are only reported while the finger is down or in contact.
    pub fn get_single_touch(&mut self) -> Result<SingleTouch, TransportError<B::Error>> {
        let mut touch = SingleTouch::default();

        let point = frame::primary_record(self.fetch()?);
        touch.event = point.event();
        if matches!(touch.event, TouchEvent::Down | TouchEvent::Contact) {
            touch.x = Some(point.x());
            touch.y = Some(point.y());
        }
        Ok(touch)
    }

    /// Reads every touch point.
    pub fn get_multi_touch(&mut self) -> Result<MultiTouch, TransportError<B::Error>> {
        let mut points = [DecodedTouchPoint::CLEARED; MAX_TOUCHES];
        let count = self.get_multi_touch_into(&mut points)?;
        Ok(MultiTouch { count, points })
    }

    /// Reads every touch point into `points` and returns the touch count.
    ///
    /// On success every slot is overwritten: slots past the count are set to
    /// [`DecodedTouchPoint::CLEARED`]. On error `points` is left untouched.
    pub fn get_multi_touch_into(
        &mut self,
        points: &mut [DecodedTouchPoint; MAX_TOUCHES],
    ) -> Result<u8, TransportError<B::Error>> {
        let frame = self.read_frame()?;
        *points = frame.points();
        Ok(frame.touch_detection_count)
    }

    /// Selects the touch data register and reads the complete frame into the
    /// receive buffer.
    fn fetch(&mut self) -> Result<&[u8; FRAME_LEN], TransportError<B::Error>> {
        debug_assert!(self.initialized, "Ft5406::init must succeed before reading touches");

        let context = &mut self.context;
        context
            .executor
            .write(I2C_ADDRESS, &[REG_TOUCH_DATA])
            .inspect_err(|err| log::warn!("Error writing REG_TOUCH_DATA: {err:?}"))?;
        context
            .executor
            .read(I2C_ADDRESS, &mut context.touch_buff)
            .inspect_err(|err| log::warn!("Error reading touch data: {err:?}"))?;
        Ok(&context.touch_buff)
    }

    /// Safely clean up the driver, returning the bus controller and delay.
    pub fn destroy(self) -> (B, D) {
        self.context.executor.release()
    }
}
