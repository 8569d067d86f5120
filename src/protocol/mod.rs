//! Binary wire protocol of the device-emulation service
//!
//! Every request is one transport frame whose first byte is the command opcode. There
//! is no length prefix; framing is left to the transport.
//!
//! | Command        | Opcode | Payload                       | Bytes |
//! |----------------|--------|-------------------------------|-------|
//! | ACQUIRE_DEVICE | 0x00   | device id                     | 2     |
//! | SET_BUTTON     | 0x01   | button id, state (0/1)        | 3     |
//! | SET_AXIS       | 0x02   | axis id, wire value (0-200)   | 3     |
//! | RESET          | 0x03   |                               | 1     |
//! | GET_DEV_INFO   | 0x04   |                               | 1     |
//!
//! Replies are decoded by [`response`].

pub mod response;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use response::{AcquireStatus, DeviceInfo, Reply, RequestError};

use crate::widget::clamp_axis;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Unknown axis label: {0}")]
    UnknownAxis(String),

    #[error("Unknown command opcode: {0:#04x}")]
    UnknownCommand(u8),

    #[error("Reply for {command:?} is truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        command: Command,
        expected: usize,
        actual: usize,
    },

    #[error("Empty reply")]
    EmptyReply,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    AcquireDevice = 0x00,
    SetButton = 0x01,
    SetAxis = 0x02,
    Reset = 0x03,
    GetDevInfo = 0x04,
    InvalidRequest = 0xFF,
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(opcode: u8) -> Result<Self, Self::Error> {
        match opcode {
            0x00 => Ok(Command::AcquireDevice),
            0x01 => Ok(Command::SetButton),
            0x02 => Ok(Command::SetAxis),
            0x03 => Ok(Command::Reset),
            0x04 => Ok(Command::GetDevInfo),
            0xFF => Ok(Command::InvalidRequest),
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }
}

/// Emulated device axis
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Axis {
    X = 0x00,
    Y = 0x01,
    Z = 0x02,
    RX = 0x03,
    RY = 0x04,
    RZ = 0x05,
    Slider = 0x06,
    Dial = 0x07,
    Wheel = 0x08,
    Accelerator = 0x09,
    Brake = 0x0A,
    Clutch = 0x0B,
    Steering = 0x0C,
    Aileron = 0x0D,
    Rudder = 0x0E,
    Throttle = 0x0F,
}

impl Axis {
    pub const ALL: [Axis; 16] = [
        Axis::X,
        Axis::Y,
        Axis::Z,
        Axis::RX,
        Axis::RY,
        Axis::RZ,
        Axis::Slider,
        Axis::Dial,
        Axis::Wheel,
        Axis::Accelerator,
        Axis::Brake,
        Axis::Clutch,
        Axis::Steering,
        Axis::Aileron,
        Axis::Rudder,
        Axis::Throttle,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Axis> {
        Axis::ALL.get(usize::from(id)).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
            Axis::RX => "RX",
            Axis::RY => "RY",
            Axis::RZ => "RZ",
            Axis::Slider => "SLIDER",
            Axis::Dial => "DIAL",
            Axis::Wheel => "WHEEL",
            Axis::Accelerator => "ACCELERATOR",
            Axis::Brake => "BRAKE",
            Axis::Clutch => "CLUTCH",
            Axis::Steering => "STEERING",
            Axis::Aileron => "AILERON",
            Axis::Rudder => "RUDDER",
            Axis::Throttle => "THROTTLE",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Axis.{}", self.label())
    }
}

// Accepts "Axis.X" as well as bare "X", case-insensitive
impl FromStr for Axis {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let name = match trimmed.split_once('.') {
            Some((prefix, name)) if prefix.eq_ignore_ascii_case("axis") => name,
            _ => trimmed,
        };

        Axis::ALL
            .into_iter()
            .find(|axis| axis.label().eq_ignore_ascii_case(name))
            .ok_or_else(|| ProtocolError::UnknownAxis(s.to_string()))
    }
}

impl TryFrom<String> for Axis {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Axis> for String {
    fn from(axis: Axis) -> Self {
        axis.to_string()
    }
}

/// Maps a logical axis value in [-100, 100] to the wire range [0, 200]
pub fn wire_value(value: i32) -> u8 {
    // Clamped input keeps the sum within 0..=200
    (clamp_axis(value) + 100) as u8
}

/// One logical request to the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    AcquireDevice { device_id: u8 },
    SetButton { button_id: u8, pressed: bool },
    SetAxis { axis: Axis, value: u8 },
    Reset,
    GetDevInfo,
}

impl Request {
    pub fn command(&self) -> Command {
        match self {
            Request::AcquireDevice { .. } => Command::AcquireDevice,
            Request::SetButton { .. } => Command::SetButton,
            Request::SetAxis { .. } => Command::SetAxis,
            Request::Reset => Command::Reset,
            Request::GetDevInfo => Command::GetDevInfo,
        }
    }

    pub fn encode(&self) -> Packet {
        let opcode = self.command() as u8;
        match *self {
            Request::AcquireDevice { device_id } => Packet::new(&[opcode, device_id]),
            Request::SetButton { button_id, pressed } => {
                Packet::new(&[opcode, button_id, u8::from(pressed)])
            }
            Request::SetAxis { axis, value } => Packet::new(&[opcode, axis.id(), value]),
            Request::Reset | Request::GetDevInfo => Packet::new(&[opcode]),
        }
    }
}

/// Encoded request frame, at most three bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    bytes: [u8; Packet::MAX_LEN],
    len: usize,
}

impl Packet {
    pub const MAX_LEN: usize = 3;

    fn new(data: &[u8]) -> Self {
        let mut bytes = [0; Packet::MAX_LEN];
        let len = data.len().min(Packet::MAX_LEN);
        bytes[..len].copy_from_slice(&data[..len]);
        Self { bytes, len }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}
