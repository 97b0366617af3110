use sensorlink_core::Dialect;
use serde::{Deserialize, Serialize};

use crate::error::EncodeError;

/// Semantic request to a peer. Each maps to one byte written to the RX
/// characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Altitude in meters (environmental).
    UnitsMetric,
    /// Altitude in feet (environmental).
    UnitsImperial,
    TempCelsius,
    TempFahrenheit,
    /// Push a fresh sample immediately (environmental and particulate).
    SendNow,
    /// Start the SPS30 fan-cleaning cycle.
    FanClean,
    Sleep,
    Wake,
    Led(bool),
    Out1(bool),
    Out2(bool),
    /// Toggle periodic battery-level notifications.
    BatteryNotify(bool),
    ReadDigitalPin1,
    ReadAnalogPin1,
}

/// Maps `command` to its wire byte for `dialect`.
///
/// Environmental and particulate commands are ASCII digits; the I/O board
/// takes binary opcodes whose low nibble is the on/off state.
pub fn encode_command(command: Command, dialect: Dialect) -> Result<u8, EncodeError> {
    let byte = match (dialect, command) {
        (Dialect::Environmental, Command::UnitsMetric) => Some(b'1'),
        (Dialect::Environmental, Command::UnitsImperial) => Some(b'2'),
        (Dialect::Environmental, Command::TempCelsius) => Some(b'3'),
        (Dialect::Environmental, Command::TempFahrenheit) => Some(b'4'),
        (Dialect::Environmental, Command::SendNow) => Some(b'7'),

        (Dialect::Particulate, Command::FanClean) => Some(b'3'),
        (Dialect::Particulate, Command::Sleep) => Some(b'4'),
        (Dialect::Particulate, Command::Wake) => Some(b'5'),
        (Dialect::Particulate, Command::SendNow) => Some(b'6'),

        (Dialect::GenericIo, Command::Led(on)) => Some(0x30 | u8::from(on)),
        (Dialect::GenericIo, Command::Out1(on)) => Some(0x10 | u8::from(on)),
        (Dialect::GenericIo, Command::Out2(on)) => Some(0x20 | u8::from(on)),
        (Dialect::GenericIo, Command::BatteryNotify(on)) => Some(0x40 | u8::from(on)),
        (Dialect::GenericIo, Command::ReadDigitalPin1) => Some(0x51),
        (Dialect::GenericIo, Command::ReadAnalogPin1) => Some(0x61),

        _ => None,
    };
    byte.ok_or(EncodeError::UnsupportedCommand { command, dialect })
}

/// Command encoder bound to one session's dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEncoder {
    dialect: Dialect,
}

impl CommandEncoder {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn encode(&self, command: Command) -> Result<u8, EncodeError> {
        encode_command(command, self.dialect)
    }

    pub fn supports(&self, command: Command) -> bool {
        self.encode(command).is_ok()
    }
}
