use sensorlink_codec::{DecodeError, EncodeError, FrameError, SleepState};
use sensorlink_transport::{DiscoveredDevice, LinkError};
use thiserror::Error;
use uuid::Uuid;

use crate::state::SessionState;

/// Errors that end a session. Reported once through [`Event::SessionFailed`],
/// after which the session returns to idle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("peer does not expose the dialect's service with both characteristics")]
    ServiceIncomplete,
    #[error("characteristic {0} disappeared from the peer")]
    CharacteristicMissing(Uuid),
    #[error("enabling notifications failed: {0}")]
    NotifyEnableFailed(LinkError),
    #[error("unexpected link state code {0}")]
    UnexpectedLinkState(u8),
    #[error("link request failed: {0}")]
    Link(LinkError),
    #[error("operation not allowed while {0}")]
    InvalidState(SessionState),
}

/// Per-command failures, delivered on the command's handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error(transparent)]
    UnsupportedCommand(#[from] EncodeError),
    #[error("session is not connected")]
    NotConnected,
    #[error("command queue full ({depth} waiting)")]
    Backpressure { depth: usize },
    #[error("link write failed: {0}")]
    LinkWriteFailed(LinkError),
    #[error("command cancelled")]
    Cancelled,
}

/// Non-fatal observations about inbound data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    /// Payload was longer than the dialect's layout; the extra bytes were ignored.
    TrailingBytes { extra: usize },
}

/// Everything a session reports to the application besides samples.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    DeviceSelected(DiscoveredDevice),
    ScanTimedOut,
    /// The link dropped without a local `disconnect()`.
    LinkLost,
    FrameError(FrameError),
    DecodeError(DecodeError),
    Warning(Warning),
    SleepStateChanged(SleepState),
    SessionFailed(SessionError),
}

impl Event {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::FrameError(_) | Self::DecodeError(_) | Self::SessionFailed(_) | Self::LinkLost
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandError, Event, SessionError};
    use crate::state::SessionState;
    use sensorlink_codec::{Command, EncodeError, FrameError};
    use sensorlink_core::Dialect;
    use sensorlink_transport::LinkError;

    #[test]
    fn error_messages_are_stable() {
        assert_eq!(
            CommandError::NotConnected.to_string(),
            "session is not connected"
        );
        assert_eq!(
            CommandError::Backpressure { depth: 8 }.to_string(),
            "command queue full (8 waiting)"
        );
        assert_eq!(
            CommandError::LinkWriteFailed(LinkError::Io("gatt 0x85".into())).to_string(),
            "link write failed: link i/o failed: gatt 0x85"
        );
        assert_eq!(
            SessionError::InvalidState(SessionState::Operating).to_string(),
            "operation not allowed while operating"
        );
    }

    #[test]
    fn encode_errors_convert_into_command_errors() {
        let err: CommandError = EncodeError::UnsupportedCommand {
            command: Command::FanClean,
            dialect: Dialect::Environmental,
        }
        .into();
        assert!(matches!(err, CommandError::UnsupportedCommand(_)));
    }

    #[test]
    fn error_events_are_flagged() {
        assert!(Event::FrameError(FrameError::InvalidFrame { found: 0 }).is_error());
        assert!(Event::LinkLost.is_error());
        assert!(!Event::ScanTimedOut.is_error());
    }
}
