//! Decoding of the raw touch data frame.
//!
//! The frame starts at the `GEST_ID` register:
//!
//! | offset | content                                   |
//! |--------|-------------------------------------------|
//! | 0      | gesture id                                |
//! | 1      | number of detected touches                |
//! | 2..32  | 5 touch point records of 6 bytes each     |
//!
//! Each record holds `XH XL YH YL` followed by two reserved bytes:
//! the event flag is in the top 2 bits of `XH`, the touch id in the top
//! nibble of `YH`, and the low nibbles of `XH`/`YH` are the high bits of the
//! 12 bit coordinates.

use heapless::Vec;

/// Maximum number of simultaneous touches reported by the controller.
pub const MAX_TOUCHES: usize = 5;
/// Size of one touch point record.
pub const TOUCH_POINT_LEN: usize = 6;
/// Size of the complete frame.
pub const FRAME_LEN: usize = 2 + MAX_TOUCHES * TOUCH_POINT_LEN;

const GESTURE_ID_OFFSET: usize = 0;
const TOUCH_COUNT_OFFSET: usize = 1;
const TOUCH_POINTS_OFFSET: usize = 2;

/// Represents a touch event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TouchEvent {
    /// A finger touched the screen.
    Down,
    /// A finger was lifted from the screen.
    Up,
    /// A finger stays on the screen.
    Contact,
    /// No touch information available.
    #[default]
    Reserved,
}

impl From<u8> for TouchEvent {
    /// Maps the 2 bit event flag. Only the two low bits are considered.
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0 => Self::Down,
            1 => Self::Up,
            2 => Self::Contact,
            _ => Self::Reserved,
        }
    }
}

impl From<TouchEvent> for u8 {
    fn from(value: TouchEvent) -> Self {
        match value {
            TouchEvent::Down => 0,
            TouchEvent::Up => 1,
            TouchEvent::Contact => 2,
            TouchEvent::Reserved => 3,
        }
    }
}

/// Extracts the event flag from the top 2 bits of `XH`.
pub fn extract_event(xh: u8) -> TouchEvent {
    TouchEvent::from(xh >> 6)
}

/// Extracts the 4 bit touch id from the top nibble of `YH`.
pub fn extract_id(yh: u8) -> u8 {
    yh >> 4
}

/// Extracts a 12 bit coordinate from its high and low registers.
pub fn extract_coordinate(high: u8, low: u8) -> u16 {
    // only the low nibble of the high register belongs to the coordinate
    ((high as u16 & 0x0F) << 8) | low as u16
}

/// A touch point record as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawTouchPoint {
    pub xh: u8,
    pub xl: u8,
    pub yh: u8,
    pub yl: u8,
    pub reserved: [u8; 2],
}

impl RawTouchPoint {
    /// Packs decoded values into the wire layout.
    ///
    /// `id` is truncated to 4 bits and the coordinates to 12 bits.
    pub fn encode(event: TouchEvent, id: u8, x: u16, y: u16) -> Self {
        Self {
            xh: (u8::from(event) << 6) | ((x >> 8) as u8 & 0x0F),
            xl: x as u8,
            yh: ((id & 0x0F) << 4) | ((y >> 8) as u8 & 0x0F),
            yl: y as u8,
            reserved: [0; 2],
        }
    }

    pub fn to_bytes(self) -> [u8; TOUCH_POINT_LEN] {
        [
            self.xh,
            self.xl,
            self.yh,
            self.yl,
            self.reserved[0],
            self.reserved[1],
        ]
    }

    pub fn event(&self) -> TouchEvent {
        extract_event(self.xh)
    }

    pub fn id(&self) -> u8 {
        extract_id(self.yh)
    }

    pub fn x(&self) -> u16 {
        extract_coordinate(self.xh, self.xl)
    }

    pub fn y(&self) -> u16 {
        extract_coordinate(self.yh, self.yl)
    }

    pub fn decode(&self) -> DecodedTouchPoint {
        DecodedTouchPoint {
            event: self.event(),
            id: self.id(),
            x: self.x(),
            y: self.y(),
        }
    }
}

impl From<&[u8; TOUCH_POINT_LEN]> for RawTouchPoint {
    fn from(bytes: &[u8; TOUCH_POINT_LEN]) -> Self {
        Self {
            xh: bytes[0],
            xl: bytes[1],
            yh: bytes[2],
            yl: bytes[3],
            reserved: [bytes[4], bytes[5]],
        }
    }
}

/// A decoded touch point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodedTouchPoint {
    /// The type of touch event.
    pub event: TouchEvent,
    /// The id of the touch point. It stays the same from down to up.
    pub id: u8,
    /// The x-coordinate of the touch point.
    pub x: u16,
    /// The y-coordinate of the touch point.
    pub y: u16,
}

impl DecodedTouchPoint {
    /// The value of a slot without a touch.
    pub const CLEARED: Self = Self {
        event: TouchEvent::Reserved,
        id: 0,
        x: 0,
        y: 0,
    };
}

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TouchFrame {
    /// Gesture id as reported by the controller. Not interpreted.
    pub gesture_id: u8,
    /// Number of valid touch points, already clamped to [`MAX_TOUCHES`].
    pub touch_detection_count: u8,
    /// The first `touch_detection_count` touch point records.
    pub touch_points: Vec<RawTouchPoint, MAX_TOUCHES>,
}

impl TouchFrame {
    /// Decodes every touch slot. Slots past the touch count are
    /// [`DecodedTouchPoint::CLEARED`].
    pub fn points(&self) -> [DecodedTouchPoint; MAX_TOUCHES] {
        let mut points = [DecodedTouchPoint::CLEARED; MAX_TOUCHES];
        for (slot, raw) in points.iter_mut().zip(self.touch_points.iter()) {
            *slot = raw.decode();
        }
        points
    }
}

/// Returns the first touch point record, ignoring the touch count.
pub fn primary_record(raw: &[u8; FRAME_LEN]) -> RawTouchPoint {
    let mut bytes = [0u8; TOUCH_POINT_LEN];
    bytes.copy_from_slice(&raw[TOUCH_POINTS_OFFSET..TOUCH_POINTS_OFFSET + TOUCH_POINT_LEN]);
    RawTouchPoint::from(&bytes)
}

/// Decodes a raw frame.
///
/// A touch count above [`MAX_TOUCHES`] comes from a corrupted frame and is
/// treated as no touch at all.
pub fn decode(raw: &[u8; FRAME_LEN]) -> TouchFrame {
    let mut touch_detection_count = raw[TOUCH_COUNT_OFFSET];
    if touch_detection_count as usize > MAX_TOUCHES {
        log::trace!("touch count {touch_detection_count} out of range, ignoring frame");
        touch_detection_count = 0;
    }

    let mut touch_points = Vec::new();
    for record in raw[TOUCH_POINTS_OFFSET..]
        .chunks_exact(TOUCH_POINT_LEN)
        .take(touch_detection_count as usize)
    {
        let mut bytes = [0u8; TOUCH_POINT_LEN];
        bytes.copy_from_slice(record);
        // Capacity matches the clamped count.
        let _ = touch_points.push(RawTouchPoint::from(&bytes));
    }

    TouchFrame {
        gesture_id: raw[GESTURE_ID_OFFSET],
        touch_detection_count,
        touch_points,
    }
}
