use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Opaque platform handle for a discovered peripheral (address or OS id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Connection state reported by the link.
///
/// The numeric codes are the GATT profile state values the peripherals'
/// stock clients switch on, so they are kept at the link boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LinkState {
    Disconnected = 0,
    Connected = 2,
}

impl LinkState {
    /// Maps a wire state code to a named state.
    pub fn from_code(code: u8) -> Result<Self, CoreError> {
        match code {
            0 => Ok(Self::Disconnected),
            2 => Ok(Self::Connected),
            other => Err(CoreError::UnknownLinkState(other)),
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for LinkState {
    type Error = CoreError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}
