//! sensorlink wire codec primitives.
//!
//! Reassembles `0xCF`-framed notifications into complete messages, decodes
//! the environmental / particulate / generic I/O payloads into typed samples,
//! and maps semantic commands to their one-byte wire values.

pub mod command;
pub mod error;
pub mod frame;
pub mod payload;

pub use command::{encode_command, Command, CommandEncoder};
pub use error::{DecodeError, EncodeError, FrameError};
pub use frame::{encode_frame, CompletedMessage, FeedOutcome, FrameAssembler, FRAME_MAGIC};
pub use payload::{
    AltitudeUnit, Decoded, EnvSample, IoEvent, PayloadDecoder, PmSample, Sample, SleepState,
    TemperatureUnit,
};
