//! Core sensorlink primitives shared across crates.
//!
//! Includes the peer dialect table (service/characteristic UUIDs, advertised
//! names, frame bounds), the link-state wire codes, and base errors.

pub mod dialect;
pub mod error;
pub mod types;

pub use dialect::{Dialect, CCCD_UUID, NOTIFY_DISABLE_VALUE, NOTIFY_ENABLE_VALUE};
pub use error::CoreError;
pub use types::{DeviceId, LinkState};
