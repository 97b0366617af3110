use sensorlink_core::Dialect;

use crate::error::FrameError;

/// Opens every logical message.
pub const FRAME_MAGIC: u8 = 0xCF;
/// Magic byte plus one length byte.
pub const FRAME_HEADER_LEN: usize = 2;

/// Payload of one fully reassembled logical message (header stripped).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompletedMessage(Vec<u8>);

impl CompletedMessage {
    pub fn payload(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for CompletedMessage {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Result of feeding one fragment.
///
/// Messages completed before a framing error in the same fragment are kept;
/// bytes after the error are discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedOutcome {
    pub messages: Vec<CompletedMessage>,
    pub error: Option<FrameError>,
}

impl FeedOutcome {
    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingMagic,
    /// Magic seen; the length byte is still outstanding (header split).
    AwaitingLength,
    Collecting { expected_len: u8 },
}

/// Reassembles `0xCF | L | payload[L]` messages from arbitrarily split
/// notification fragments.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    max_len: u8,
    phase: Phase,
    buffer: Vec<u8>,
}

impl FrameAssembler {
    /// Creates an assembler that rejects declared lengths above `max_len`.
    pub fn new(max_len: u8) -> Self {
        Self {
            max_len,
            phase: Phase::AwaitingMagic,
            buffer: Vec::with_capacity(max_len as usize),
        }
    }

    pub fn for_dialect(dialect: Dialect) -> Self {
        Self::new(dialect.max_frame_len())
    }

    pub fn max_len(&self) -> u8 {
        self.max_len
    }

    /// True until a complete two-byte header has been read.
    pub fn awaiting_header(&self) -> bool {
        !matches!(self.phase, Phase::Collecting { .. })
    }

    /// Payload bytes collected for the message in progress.
    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    /// Declared length of the message in progress.
    pub fn expected_len(&self) -> Option<u8> {
        match self.phase {
            Phase::Collecting { expected_len } => Some(expected_len),
            _ => None,
        }
    }

    /// Whether any partial header or payload is buffered.
    pub fn has_partial(&self) -> bool {
        self.phase != Phase::AwaitingMagic
    }

    /// Discards partial state and re-arms for a fresh header.
    pub fn reset(&mut self) {
        self.phase = Phase::AwaitingMagic;
        self.buffer.clear();
    }

    /// Consumes one fragment and returns every message it completes.
    pub fn feed(&mut self, fragment: &[u8]) -> FeedOutcome {
        let mut outcome = FeedOutcome::default();
        let mut cursor = 0;

        while cursor < fragment.len() {
            match self.phase {
                Phase::AwaitingMagic => {
                    let found = fragment[cursor];
                    if found != FRAME_MAGIC {
                        self.reset();
                        outcome.error = Some(FrameError::InvalidFrame { found });
                        return outcome;
                    }
                    cursor += 1;
                    self.phase = Phase::AwaitingLength;
                }
                Phase::AwaitingLength => {
                    let declared = fragment[cursor];
                    cursor += 1;
                    if declared > self.max_len {
                        self.reset();
                        outcome.error = Some(FrameError::FrameTooLarge {
                            declared: declared as usize,
                            max: self.max_len as usize,
                        });
                        return outcome;
                    }
                    self.buffer.clear();
                    if declared == 0 {
                        outcome.messages.push(CompletedMessage::default());
                        self.phase = Phase::AwaitingMagic;
                    } else {
                        self.phase = Phase::Collecting {
                            expected_len: declared,
                        };
                    }
                }
                Phase::Collecting { expected_len } => {
                    let expected = expected_len as usize;
                    let take = (expected - self.buffer.len()).min(fragment.len() - cursor);
                    self.buffer.extend_from_slice(&fragment[cursor..cursor + take]);
                    cursor += take;
                    if self.buffer.len() == expected {
                        outcome.messages.push(CompletedMessage(self.buffer.clone()));
                        self.reset();
                    }
                }
            }
        }

        outcome
    }
}

/// Wraps a payload in the `0xCF | L` header.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    let declared = u8::try_from(payload.len()).map_err(|_| FrameError::FrameTooLarge {
        declared: payload.len(),
        max: u8::MAX as usize,
    })?;
    let mut out = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    out.push(FRAME_MAGIC);
    out.push(declared);
    out.extend_from_slice(payload);
    Ok(out)
}
