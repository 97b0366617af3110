use sensorlink_core::Dialect;
use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::DecodeError;

/// I/O notification source: battery level push (echo of `BatteryNotify(true)`).
pub const IO_SOURCE_BATTERY: u8 = 0x41;
/// I/O notification source: digital input pin 1 read.
pub const IO_SOURCE_DIGITAL_PIN1: u8 = 0x51;
/// I/O notification source: analog input pin 1 read.
pub const IO_SOURCE_ANALOG_PIN1: u8 = 0x61;

/// Altitude unit tag carried by environmental samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AltitudeUnit {
    Meters,
    Feet,
}

impl AltitudeUnit {
    /// `1` is meters; any other value is feet.
    pub fn from_flag(flag: u8) -> Self {
        if flag == 1 {
            Self::Meters
        } else {
            Self::Feet
        }
    }

    pub fn flag(self) -> u8 {
        match self {
            Self::Meters => 1,
            Self::Feet => 0,
        }
    }

    /// Command that switches the peer to the other altitude unit.
    pub fn toggle_command(self) -> Command {
        match self {
            Self::Meters => Command::UnitsImperial,
            Self::Feet => Command::UnitsMetric,
        }
    }
}

/// Temperature unit tag carried by environmental samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// `1` is Celsius; any other value is Fahrenheit.
    pub fn from_flag(flag: u8) -> Self {
        if flag == 1 {
            Self::Celsius
        } else {
            Self::Fahrenheit
        }
    }

    pub fn flag(self) -> u8 {
        match self {
            Self::Celsius => 1,
            Self::Fahrenheit => 0,
        }
    }

    /// Command that switches the peer to the other temperature unit.
    pub fn toggle_command(self) -> Command {
        match self {
            Self::Celsius => Command::TempFahrenheit,
            Self::Fahrenheit => Command::TempCelsius,
        }
    }
}

/// Particulate sensor power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SleepState {
    Sleeping,
    Awake,
}

impl SleepState {
    /// `0` is sleeping; any other value is awake.
    pub fn from_flag(flag: u8) -> Self {
        if flag == 0 {
            Self::Sleeping
        } else {
            Self::Awake
        }
    }

    pub fn flag(self) -> u8 {
        match self {
            Self::Sleeping => 0,
            Self::Awake => 1,
        }
    }
}

/// BME280 reading. Values are as sent; no unit conversion is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvSample {
    /// Relative humidity, %RH.
    pub humidity: f32,
    /// Pressure, hPa.
    pub pressure: f32,
    /// Altitude in `altitude_unit`.
    pub altitude: f32,
    /// Temperature in `temperature_unit`.
    pub temperature: f32,
    pub altitude_unit: AltitudeUnit,
    pub temperature_unit: TemperatureUnit,
}

impl EnvSample {
    /// Wire length of one environmental payload.
    pub const LEN: usize = 18;

    /// Serializes to the 18-byte little-endian payload layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::LEN);
        for value in [self.humidity, self.pressure, self.altitude, self.temperature] {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out.push(self.altitude_unit.flag());
        out.push(self.temperature_unit.flag());
        out
    }
}

/// SPS30 reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PmSample {
    /// Mass concentrations, µg/m³.
    pub mass_pm1: f32,
    pub mass_pm2_5: f32,
    pub mass_pm4: f32,
    pub mass_pm10: f32,
    /// Number concentrations, #/cm³.
    pub num_pm0_5: f32,
    pub num_pm1: f32,
    pub num_pm2_5: f32,
    pub num_pm4: f32,
    pub num_pm10: f32,
    /// Typical particle size, µm.
    pub typical_particle_size: f32,
    pub sleep_state: SleepState,
}

impl PmSample {
    /// Wire length of one particulate payload.
    pub const LEN: usize = 41;

    pub fn is_awake(&self) -> bool {
        self.sleep_state == SleepState::Awake
    }

    /// The sample, but only while the sensor is awake. A sleeping SPS30
    /// repeats its last concentrations, which must not be shown as fresh.
    pub fn live_readings(&self) -> Option<&Self> {
        self.is_awake().then_some(self)
    }

    fn floats(&self) -> [f32; 10] {
        [
            self.mass_pm1,
            self.mass_pm2_5,
            self.mass_pm4,
            self.mass_pm10,
            self.num_pm0_5,
            self.num_pm1,
            self.num_pm2_5,
            self.num_pm4,
            self.num_pm10,
            self.typical_particle_size,
        ]
    }

    /// Serializes to the 41-byte little-endian payload layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::LEN);
        for value in self.floats() {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out.push(self.sleep_state.flag());
        out
    }
}

/// Generic I/O board notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IoEvent {
    /// Simulated battery level push, percent.
    Battery { percent: u8 },
    /// Digital input pin 1 level.
    DigitalPin1 { high: bool },
    /// Analog input pin 1, raw ADC count.
    AnalogPin1(u16),
}

impl IoEvent {
    pub fn source(&self) -> u8 {
        match self {
            Self::Battery { .. } => IO_SOURCE_BATTERY,
            Self::DigitalPin1 { .. } => IO_SOURCE_DIGITAL_PIN1,
            Self::AnalogPin1(_) => IO_SOURCE_ANALOG_PIN1,
        }
    }

    /// Serializes to the raw 2- or 3-byte notification.
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Self::Battery { percent } => vec![IO_SOURCE_BATTERY, percent],
            Self::DigitalPin1 { high } => vec![IO_SOURCE_DIGITAL_PIN1, u8::from(high)],
            Self::AnalogPin1(value) => {
                let [hi, lo] = value.to_be_bytes();
                vec![IO_SOURCE_ANALOG_PIN1, hi, lo]
            }
        }
    }
}

/// Decoded record handed to the application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Sample {
    Env(EnvSample),
    Pm(PmSample),
    Io(IoEvent),
}

impl Sample {
    pub fn dialect(&self) -> Dialect {
        match self {
            Self::Env(_) => Dialect::Environmental,
            Self::Pm(_) => Dialect::Particulate,
            Self::Io(_) => Dialect::GenericIo,
        }
    }
}

/// A decoded value plus the count of ignored trailing bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decoded<T> {
    pub value: T,
    /// Bytes beyond the dialect's layout. Non-zero means a newer peer firmware.
    pub trailing: usize,
}

impl<T> Decoded<T> {
    fn new(value: T, payload_len: usize, expected: usize) -> Self {
        Self {
            value,
            trailing: payload_len.saturating_sub(expected),
        }
    }

    pub fn has_trailing(&self) -> bool {
        self.trailing > 0
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Decoded<U> {
        Decoded {
            value: f(self.value),
            trailing: self.trailing,
        }
    }
}

fn require_len(dialect: Dialect, payload: &[u8], expected: usize) -> Result<(), DecodeError> {
    if payload.len() < expected {
        return Err(DecodeError::ShortPayload {
            dialect,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

fn f32_le(bytes: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Decodes an 18-byte BME280 payload.
pub fn decode_environmental(payload: &[u8]) -> Result<Decoded<EnvSample>, DecodeError> {
    require_len(Dialect::Environmental, payload, EnvSample::LEN)?;
    let sample = EnvSample {
        humidity: f32_le(payload, 0),
        pressure: f32_le(payload, 4),
        altitude: f32_le(payload, 8),
        temperature: f32_le(payload, 12),
        altitude_unit: AltitudeUnit::from_flag(payload[16]),
        temperature_unit: TemperatureUnit::from_flag(payload[17]),
    };
    Ok(Decoded::new(sample, payload.len(), EnvSample::LEN))
}

/// Decodes a 41-byte SPS30 payload.
pub fn decode_particulate(payload: &[u8]) -> Result<Decoded<PmSample>, DecodeError> {
    require_len(Dialect::Particulate, payload, PmSample::LEN)?;
    let sample = PmSample {
        mass_pm1: f32_le(payload, 0),
        mass_pm2_5: f32_le(payload, 4),
        mass_pm4: f32_le(payload, 8),
        mass_pm10: f32_le(payload, 12),
        num_pm0_5: f32_le(payload, 16),
        num_pm1: f32_le(payload, 20),
        num_pm2_5: f32_le(payload, 24),
        num_pm4: f32_le(payload, 28),
        num_pm10: f32_le(payload, 32),
        typical_particle_size: f32_le(payload, 36),
        sleep_state: SleepState::from_flag(payload[40]),
    };
    Ok(Decoded::new(sample, payload.len(), PmSample::LEN))
}

/// Decodes a raw (unframed) I/O board notification.
pub fn decode_io(notification: &[u8]) -> Result<Decoded<IoEvent>, DecodeError> {
    let short = |expected: usize| DecodeError::ShortPayload {
        dialect: Dialect::GenericIo,
        expected,
        actual: notification.len(),
    };
    let Some(&source) = notification.first() else {
        return Err(short(2));
    };
    let expected = match source {
        IO_SOURCE_ANALOG_PIN1 => 3,
        IO_SOURCE_BATTERY | IO_SOURCE_DIGITAL_PIN1 => 2,
        other => return Err(DecodeError::UnknownIoSource(other)),
    };
    if notification.len() < expected {
        return Err(short(expected));
    }
    let value = notification[1];
    let event = match source {
        IO_SOURCE_BATTERY => IoEvent::Battery { percent: value },
        IO_SOURCE_DIGITAL_PIN1 => IoEvent::DigitalPin1 { high: value == 1 },
        _ => IoEvent::AnalogPin1(u16::from_be_bytes([value, notification[2]])),
    };
    Ok(Decoded::new(event, notification.len(), expected))
}

/// Dialect-gated decoder owned by one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadDecoder {
    dialect: Dialect,
}

impl PayloadDecoder {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn require(&self, requested: Dialect) -> Result<(), DecodeError> {
        if requested != self.dialect {
            return Err(DecodeError::UnknownDialect {
                requested,
                active: self.dialect,
            });
        }
        Ok(())
    }

    pub fn decode_environmental(&self, payload: &[u8]) -> Result<Decoded<EnvSample>, DecodeError> {
        self.require(Dialect::Environmental)?;
        decode_environmental(payload)
    }

    pub fn decode_particulate(&self, payload: &[u8]) -> Result<Decoded<PmSample>, DecodeError> {
        self.require(Dialect::Particulate)?;
        decode_particulate(payload)
    }

    pub fn decode_io(&self, notification: &[u8]) -> Result<Decoded<IoEvent>, DecodeError> {
        self.require(Dialect::GenericIo)?;
        decode_io(notification)
    }

    /// Decodes with the session's dialect.
    pub fn decode(&self, payload: &[u8]) -> Result<Decoded<Sample>, DecodeError> {
        match self.dialect {
            Dialect::Environmental => decode_environmental(payload).map(|d| d.map(Sample::Env)),
            Dialect::Particulate => decode_particulate(payload).map(|d| d.map(Sample::Pm)),
            Dialect::GenericIo => decode_io(payload).map(|d| d.map(Sample::Io)),
        }
    }
}
