use std::fmt;

/// Lifecycle of one peer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Scanning,
    Connecting,
    Discovering,
    Enabling,
    Operating,
    Disconnecting,
    /// Reported after a session error; always collapses to `Idle`.
    Failed,
}

impl SessionState {
    pub fn is_idle(self) -> bool {
        self == Self::Idle
    }

    /// States in which a link connection exists or is being established.
    pub fn has_link(self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::Discovering | Self::Enabling | Self::Operating
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Connecting => "connecting",
            Self::Discovering => "discovering",
            Self::Enabling => "enabling",
            Self::Operating => "operating",
            Self::Disconnecting => "disconnecting",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
