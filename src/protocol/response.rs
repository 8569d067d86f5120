// Reply decoding. The service answers every request with the same opcode followed by
// a status byte, or with INVALID_REQUEST and an error code.

use std::fmt;

use super::{Axis, Command, ProtocolError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireStatus {
    Success,
    AlreadyAcquired,
    NotExists,
    Busy,
    Unknown(u8),
}

impl From<u8> for AcquireStatus {
    fn from(code: u8) -> Self {
        match code {
            0x00 => AcquireStatus::Success,
            0x01 => AcquireStatus::AlreadyAcquired,
            0x02 => AcquireStatus::NotExists,
            0x03 => AcquireStatus::Busy,
            other => AcquireStatus::Unknown(other),
        }
    }
}

impl fmt::Display for AcquireStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireStatus::Success => write!(f, "success"),
            AcquireStatus::AlreadyAcquired => write!(f, "device already acquired"),
            AcquireStatus::NotExists => write!(f, "device does not exist"),
            AcquireStatus::Busy => write!(f, "device busy"),
            AcquireStatus::Unknown(code) => write!(f, "unknown status {:#04x}", code),
        }
    }
}

// Shared by SET_BUTTON and SET_AXIS replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetStatus {
    Success,
    InvalidId,
    InvalidValue,
    Unknown(u8),
}

impl From<u8> for SetStatus {
    fn from(code: u8) -> Self {
        match code {
            0x00 => SetStatus::Success,
            0x01 => SetStatus::InvalidId,
            0x02 => SetStatus::InvalidValue,
            other => SetStatus::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    InvalidCommand,
    IncorrectLength,
    EmptyRequest,
    ApiDisabled,
    DeviceNotAcquired,
    Unknown(u8),
}

impl From<u8> for RequestError {
    fn from(code: u8) -> Self {
        match code {
            0x00 => RequestError::InvalidCommand,
            0x01 => RequestError::IncorrectLength,
            0x02 => RequestError::EmptyRequest,
            0x03 => RequestError::ApiDisabled,
            0x04 => RequestError::DeviceNotAcquired,
            other => RequestError::Unknown(other),
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::InvalidCommand => write!(f, "invalid command"),
            RequestError::IncorrectLength => write!(f, "incorrect request length"),
            RequestError::EmptyRequest => write!(f, "empty request"),
            RequestError::ApiDisabled => write!(f, "device api disabled"),
            RequestError::DeviceNotAcquired => write!(f, "device not acquired"),
            RequestError::Unknown(code) => write!(f, "unknown error {:#04x}", code),
        }
    }
}

/// Capabilities of the acquired device as reported by GET_DEV_INFO
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub axes: Vec<Axis>,

    /// Axis ids the client has no name for
    pub unknown_axes: Vec<u8>,

    pub buttons: u8,
    pub discrete_hats: u8,
    pub continuous_hats: u8,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let axes: Vec<&str> = self.axes.iter().map(|axis| axis.label()).collect();
        write!(
            f,
            "axes [{}], {} buttons, {} discrete hats, {} continuous hats",
            axes.join(", "),
            self.buttons,
            self.discrete_hats,
            self.continuous_hats
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Acquire { status: AcquireStatus, device_id: u8 },
    Button { status: SetStatus, button_id: u8 },
    Axis { status: SetStatus, axis_id: u8 },
    Reset { success: bool },
    DeviceInfo(DeviceInfo),
    Invalid(RequestError),
}

impl Reply {
    pub fn decode(bytes: &[u8]) -> Result<Reply, ProtocolError> {
        let (&opcode, body) = bytes.split_first().ok_or(ProtocolError::EmptyReply)?;
        let command = Command::try_from(opcode)?;

        let require = |expected: usize| {
            if body.len() < expected {
                Err(ProtocolError::Truncated {
                    command,
                    expected: expected + 1,
                    actual: bytes.len(),
                })
            } else {
                Ok(())
            }
        };

        match command {
            Command::AcquireDevice => {
                require(2)?;
                Ok(Reply::Acquire {
                    status: body[0].into(),
                    device_id: body[1],
                })
            }
            Command::SetButton => {
                require(2)?;
                Ok(Reply::Button {
                    status: body[0].into(),
                    button_id: body[1],
                })
            }
            Command::SetAxis => {
                require(2)?;
                Ok(Reply::Axis {
                    status: body[0].into(),
                    axis_id: body[1],
                })
            }
            Command::Reset => {
                require(1)?;
                Ok(Reply::Reset {
                    success: body[0] == 0x00,
                })
            }
            Command::GetDevInfo => {
                require(1)?;
                let total_axes = usize::from(body[0]);
                // Axis list followed by three counters
                require(1 + total_axes + 3)?;

                let mut info = DeviceInfo::default();
                for &id in &body[1..1 + total_axes] {
                    match Axis::from_id(id) {
                        Some(axis) => info.axes.push(axis),
                        None => info.unknown_axes.push(id),
                    }
                }
                let counters = &body[1 + total_axes..];
                info.buttons = counters[0];
                info.discrete_hats = counters[1];
                info.continuous_hats = counters[2];
                Ok(Reply::DeviceInfo(info))
            }
            Command::InvalidRequest => {
                require(1)?;
                Ok(Reply::Invalid(body[0].into()))
            }
        }
    }

    /// Whether the reply reports a rejected request
    pub fn is_failure(&self) -> bool {
        match self {
            Reply::Acquire { status, .. } => *status != AcquireStatus::Success,
            Reply::Button { status, .. } | Reply::Axis { status, .. } => {
                *status != SetStatus::Success
            }
            Reply::Reset { success } => !success,
            Reply::DeviceInfo(_) => false,
            Reply::Invalid(_) => true,
        }
    }
}
