//! BLE link abstraction for sensorlink sessions.
//!
//! The session layer never talks to a Bluetooth stack directly. It drives a
//! [`LinkAdapter`] with synchronous requests and receives completions as
//! [`LinkEvent`]s, either fed in by the host or drained from
//! [`LinkAdapter::poll_event`]. [`MockLink`] records every request and replays
//! scripted events for tests. Enable the `btleplug` feature for the hardware
//! backend.

use std::collections::VecDeque;

use sensorlink_core::{DeviceId, Dialect, LinkState};
use thiserror::Error;
use uuid::Uuid;

#[cfg(feature = "btleplug")]
pub mod btleplug_backend;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("link is not connected")]
    NotConnected,
    #[error("characteristic {0} not found on peer")]
    CharacteristicNotFound(Uuid),
    #[error("link request queue is full or closed")]
    Busy,
    #[error("link i/o failed: {0}")]
    Io(String),
}

/// Advertisement seen while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub id: DeviceId,
    pub name: Option<String>,
    pub rssi: Option<i16>,
}

impl DiscoveredDevice {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: DeviceId::new(id),
            name: name.map(str::to_owned),
            rssi: None,
        }
    }

    /// Case-insensitive match on the advertised local name.
    pub fn name_matches(&self, wanted: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(wanted))
    }
}

/// One discovered GATT service and the characteristics it exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
    pub uuid: Uuid,
    pub characteristics: Vec<Uuid>,
}

impl GattService {
    pub fn has_characteristic(&self, uuid: Uuid) -> bool {
        self.characteristics.contains(&uuid)
    }

    /// The service table a conforming peer of `dialect` exposes.
    pub fn for_dialect(dialect: Dialect) -> Self {
        Self {
            uuid: dialect.service_uuid(),
            characteristics: vec![dialect.rx_uuid(), dialect.tx_uuid()],
        }
    }
}

/// Asynchronous completion or indication reported by the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    DeviceDiscovered(DiscoveredDevice),
    /// A scan was accepted but the backend could not start it.
    ScanFailed(LinkError),
    /// Raw connection state code; see [`LinkState::from_code`].
    StateChanged(u8),
    ServicesDiscovered(Vec<GattService>),
    NotifyEnabled(Result<(), LinkError>),
    WriteComplete(Result<(), LinkError>),
    Notification { characteristic: Uuid, value: Vec<u8> },
}

impl LinkEvent {
    pub fn connected() -> Self {
        Self::StateChanged(LinkState::Connected.code())
    }

    pub fn disconnected() -> Self {
        Self::StateChanged(LinkState::Disconnected.code())
    }
}

/// Minimal BLE central abstraction used by the session.
///
/// Every request returns immediately. `Err` means the request could not be
/// issued at all; success or failure of an issued request arrives later as a
/// [`LinkEvent`].
pub trait LinkAdapter {
    fn start_scan(&mut self) -> Result<(), LinkError>;
    fn stop_scan(&mut self);
    fn connect(&mut self, device: &DeviceId) -> Result<(), LinkError>;
    fn disconnect(&mut self);
    fn discover_services(&mut self) -> Result<(), LinkError>;
    fn enable_notify(&mut self, characteristic: Uuid) -> Result<(), LinkError>;
    fn disable_notify(&mut self, characteristic: Uuid) -> Result<(), LinkError>;
    fn write(&mut self, characteristic: Uuid, bytes: &[u8]) -> Result<(), LinkError>;

    /// Next pending event from a backend that owns its own event source.
    fn poll_event(&mut self) -> Option<LinkEvent> {
        None
    }
}

/// Request recorded by [`MockLink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCall {
    StartScan,
    StopScan,
    Connect(DeviceId),
    Disconnect,
    DiscoverServices,
    EnableNotify(Uuid),
    DisableNotify(Uuid),
    Write { characteristic: Uuid, bytes: Vec<u8> },
}

#[derive(Debug, Default)]
pub struct MockLink {
    inbound: VecDeque<LinkEvent>,
    calls: Vec<LinkCall>,
    fail_writes: Option<LinkError>,
    fail_enable_notify: Option<LinkError>,
    fail_connect: Option<LinkError>,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, event: LinkEvent) {
        self.inbound.push_back(event);
    }

    pub fn pending_events(&self) -> usize {
        self.inbound.len()
    }

    pub fn calls(&self) -> &[LinkCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<LinkCall> {
        std::mem::take(&mut self.calls)
    }

    /// Bytes of every recorded write, in issue order.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                LinkCall::Write { bytes, .. } => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&LinkCall) -> bool) -> usize {
        self.calls.iter().filter(|call| matches(call)).count()
    }

    /// Subsequent writes are rejected with `err` until cleared with `None`.
    pub fn fail_writes(&mut self, err: Option<LinkError>) {
        self.fail_writes = err;
    }

    pub fn fail_enable_notify(&mut self, err: Option<LinkError>) {
        self.fail_enable_notify = err;
    }

    pub fn fail_connect(&mut self, err: Option<LinkError>) {
        self.fail_connect = err;
    }
}

impl LinkAdapter for MockLink {
    fn start_scan(&mut self) -> Result<(), LinkError> {
        self.calls.push(LinkCall::StartScan);
        Ok(())
    }

    fn stop_scan(&mut self) {
        self.calls.push(LinkCall::StopScan);
    }

    fn connect(&mut self, device: &DeviceId) -> Result<(), LinkError> {
        self.calls.push(LinkCall::Connect(device.clone()));
        match &self.fail_connect {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn disconnect(&mut self) {
        self.calls.push(LinkCall::Disconnect);
    }

    fn discover_services(&mut self) -> Result<(), LinkError> {
        self.calls.push(LinkCall::DiscoverServices);
        Ok(())
    }

    fn enable_notify(&mut self, characteristic: Uuid) -> Result<(), LinkError> {
        self.calls.push(LinkCall::EnableNotify(characteristic));
        match &self.fail_enable_notify {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn disable_notify(&mut self, characteristic: Uuid) -> Result<(), LinkError> {
        self.calls.push(LinkCall::DisableNotify(characteristic));
        Ok(())
    }

    fn write(&mut self, characteristic: Uuid, bytes: &[u8]) -> Result<(), LinkError> {
        self.calls.push(LinkCall::Write {
            characteristic,
            bytes: bytes.to_vec(),
        });
        match &self.fail_writes {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn poll_event(&mut self) -> Option<LinkEvent> {
        self.inbound.pop_front()
    }
}
