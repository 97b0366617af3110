use sensorlink_core::Dialect;
use thiserror::Error;

use crate::command::Command;

/// Framing failures raised by the assembler. The assembler resets itself
/// before returning either of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// First byte of a fresh message was not `0xCF`.
    #[error("invalid frame: expected magic 0xcf, found {found:#04x}")]
    InvalidFrame { found: u8 },
    /// Declared payload length exceeds the configured bound.
    #[error("frame too large: declared {declared} bytes, max {max}")]
    FrameTooLarge { declared: usize, max: usize },
}

/// Payload decoding failures. The offending sample is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("short {dialect} payload: expected {expected} bytes, got {actual}")]
    ShortPayload {
        dialect: Dialect,
        expected: usize,
        actual: usize,
    },
    #[error("dialect {requested} is not enabled for this session ({active})")]
    UnknownDialect { requested: Dialect, active: Dialect },
    #[error("unknown i/o notification source {0:#04x}")]
    UnknownIoSource(u8),
}

/// Command encoding failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("command {command:?} is not supported by the {dialect} dialect")]
    UnsupportedCommand { command: Command, dialect: Dialect },
}

#[cfg(test)]
mod tests {
    use super::{DecodeError, EncodeError, FrameError};
    use crate::command::Command;
    use sensorlink_core::Dialect;

    #[test]
    fn error_messages_are_stable() {
        assert_eq!(
            FrameError::InvalidFrame { found: 0xAA }.to_string(),
            "invalid frame: expected magic 0xcf, found 0xaa"
        );
        assert_eq!(
            FrameError::FrameTooLarge {
                declared: 49,
                max: 48
            }
            .to_string(),
            "frame too large: declared 49 bytes, max 48"
        );
        assert_eq!(
            DecodeError::ShortPayload {
                dialect: Dialect::Environmental,
                expected: 18,
                actual: 4
            }
            .to_string(),
            "short environmental payload: expected 18 bytes, got 4"
        );
        assert_eq!(
            EncodeError::UnsupportedCommand {
                command: Command::FanClean,
                dialect: Dialect::Environmental
            }
            .to_string(),
            "command FanClean is not supported by the environmental dialect"
        );
    }
}
