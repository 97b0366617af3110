use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Client Characteristic Configuration Descriptor (`0x2902`).
pub const CCCD_UUID: Uuid = Uuid::from_u128(0x0000_2902_0000_1000_8000_0080_5f9b_34fb);
/// CCCD value that turns notifications on.
pub const NOTIFY_ENABLE_VALUE: [u8; 2] = [0x01, 0x00];
/// CCCD value that turns notifications off.
pub const NOTIFY_DISABLE_VALUE: [u8; 2] = [0x00, 0x00];

/// Peer personality: fixes UUIDs, payload layout, and command set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// BME280 temperature / humidity / pressure peer.
    Environmental,
    /// SPS30 particulate-matter peer.
    Particulate,
    /// LED / relay / ADC board. Raw packets, no framing.
    GenericIo,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [
        Dialect::Environmental,
        Dialect::Particulate,
        Dialect::GenericIo,
    ];

    pub const fn service_uuid(self) -> Uuid {
        match self {
            Self::Environmental => Uuid::from_u128(0x19B1_0010_E8F2_537E_4F6C_D104_768A_1214),
            Self::Particulate => Uuid::from_u128(0x19B1_0030_E8F2_537E_4F6C_D104_768A_1214),
            Self::GenericIo => Uuid::from_u128(0x19B1_0000_E8F2_537E_4F6C_D104_768A_1214),
        }
    }

    /// Characteristic the central writes commands to.
    pub const fn rx_uuid(self) -> Uuid {
        match self {
            Self::Environmental => Uuid::from_u128(0x19B1_0011_E8F2_537E_4F6C_D104_768A_1214),
            Self::Particulate => Uuid::from_u128(0x19B1_0031_E8F2_537E_4F6C_D104_768A_1214),
            Self::GenericIo => Uuid::from_u128(0x19B1_0001_E8F2_537E_4F6C_D104_768A_1214),
        }
    }

    /// Characteristic the central subscribes to.
    pub const fn tx_uuid(self) -> Uuid {
        match self {
            Self::Environmental => Uuid::from_u128(0x19B1_0012_E8F2_537E_4F6C_D104_768A_1214),
            Self::Particulate => Uuid::from_u128(0x19B1_0032_E8F2_537E_4F6C_D104_768A_1214),
            Self::GenericIo => Uuid::from_u128(0x19B1_0002_E8F2_537E_4F6C_D104_768A_1214),
        }
    }

    /// Advertised name of the stock peripheral firmware.
    ///
    /// The I/O board has no fixed name; callers must configure one.
    pub const fn default_device_name(self) -> Option<&'static str> {
        match self {
            Self::Environmental => Some("Peripheral BME280 BLE"),
            Self::Particulate => Some("Peripheral SPS30 BLE"),
            Self::GenericIo => None,
        }
    }

    /// Whether notifications use the `0xCF`/length framing.
    pub const fn is_framed(self) -> bool {
        !matches!(self, Self::GenericIo)
    }

    /// Largest declared frame length accepted for this dialect.
    pub const fn max_frame_len(self) -> u8 {
        match self {
            Self::Environmental => 48,
            Self::Particulate => 64,
            Self::GenericIo => 0,
        }
    }

    /// Fixed payload length of one sample, when the dialect is framed.
    pub const fn sample_len(self) -> Option<usize> {
        match self {
            Self::Environmental => Some(18),
            Self::Particulate => Some(41),
            Self::GenericIo => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Environmental => "environmental",
            Self::Particulate => "particulate",
            Self::GenericIo => "generic_io",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "environmental" | "env" | "bme280" => Ok(Self::Environmental),
            "particulate" | "pm" | "sps30" => Ok(Self::Particulate),
            "generic_io" | "io" => Ok(Self::GenericIo),
            other => Err(CoreError::UnknownDialect(other.to_string())),
        }
    }
}
