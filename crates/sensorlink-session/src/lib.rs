//! sensorlink session controller.
//!
//! Drives one BLE sensor peer from scan to teardown: matches the advertised
//! name, discovers the dialect's service, enables notifications, then
//! reassembles and decodes inbound samples while gating and queueing outbound
//! commands. All transitions happen on the caller's executor.

pub mod config;
pub mod event;
pub mod queue;
pub mod session;
pub mod state;

pub use config::{ConfigError, SessionConfig};
pub use event::{CommandError, Event, SessionError, Warning};
pub use queue::{CommandHandle, CommandResult};
pub use session::{Session, SessionStats};
pub use state::SessionState;

pub use sensorlink_codec::{Command, Sample};
pub use sensorlink_core::Dialect;
