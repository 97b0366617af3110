use std::collections::HashMap;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures_util::StreamExt;
use sensorlink_core::DeviceId;
use thiserror::Error;
use tokio::sync::{mpsc as tokio_mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{DiscoveredDevice, GattService, LinkAdapter, LinkError, LinkEvent};

#[derive(Debug, Clone)]
pub struct BtleplugLinkConfig {
    pub request_queue_capacity: usize,
    pub event_queue_capacity: usize,
    /// Use acknowledged writes so `WriteComplete` reflects the peer's answer.
    pub write_with_response: bool,
}

impl Default for BtleplugLinkConfig {
    fn default() -> Self {
        Self {
            request_queue_capacity: 64,
            event_queue_capacity: 1024,
            write_with_response: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum BtleplugLinkError {
    #[error("failed to start link worker: {0}")]
    WorkerSpawn(String),
}

#[derive(Debug)]
enum LinkRequest {
    StartScan,
    StopScan,
    Connect(DeviceId),
    Disconnect,
    DiscoverServices,
    EnableNotify(Uuid),
    DisableNotify(Uuid),
    Write(Uuid, Vec<u8>),
}

/// Hardware link running btleplug on a dedicated worker thread.
///
/// Requests are posted to the worker's mailbox; completions come back
/// through [`LinkAdapter::poll_event`].
#[derive(Debug)]
pub struct BtleplugLink {
    request_tx: tokio_mpsc::Sender<LinkRequest>,
    event_rx: mpsc::Receiver<LinkEvent>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl BtleplugLink {
    pub fn spawn(config: BtleplugLinkConfig) -> Result<Self, BtleplugLinkError> {
        let (request_tx, request_rx) =
            tokio_mpsc::channel::<LinkRequest>(config.request_queue_capacity);
        let (event_tx, event_rx) = mpsc::sync_channel::<LinkEvent>(config.event_queue_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let worker = thread::Builder::new()
            .name("sensorlink-btleplug".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(err) => {
                        warn!(error = %err, "btleplug worker runtime failed to start");
                        return;
                    }
                };
                runtime.block_on(run_worker(config, request_rx, event_tx, shutdown_rx));
            })
            .map_err(|err| BtleplugLinkError::WorkerSpawn(err.to_string()))?;

        Ok(Self {
            request_tx,
            event_rx,
            shutdown_tx: Some(shutdown_tx),
            worker: Some(worker),
        })
    }

    fn post(&self, request: LinkRequest) -> Result<(), LinkError> {
        self.request_tx.try_send(request).map_err(|_| LinkError::Busy)
    }
}

impl LinkAdapter for BtleplugLink {
    fn start_scan(&mut self) -> Result<(), LinkError> {
        self.post(LinkRequest::StartScan)
    }

    fn stop_scan(&mut self) {
        let _ = self.post(LinkRequest::StopScan);
    }

    fn connect(&mut self, device: &DeviceId) -> Result<(), LinkError> {
        self.post(LinkRequest::Connect(device.clone()))
    }

    fn disconnect(&mut self) {
        let _ = self.post(LinkRequest::Disconnect);
    }

    fn discover_services(&mut self) -> Result<(), LinkError> {
        self.post(LinkRequest::DiscoverServices)
    }

    fn enable_notify(&mut self, characteristic: Uuid) -> Result<(), LinkError> {
        self.post(LinkRequest::EnableNotify(characteristic))
    }

    fn disable_notify(&mut self, characteristic: Uuid) -> Result<(), LinkError> {
        self.post(LinkRequest::DisableNotify(characteristic))
    }

    fn write(&mut self, characteristic: Uuid, bytes: &[u8]) -> Result<(), LinkError> {
        self.post(LinkRequest::Write(characteristic, bytes.to_vec()))
    }

    fn poll_event(&mut self) -> Option<LinkEvent> {
        self.event_rx.try_recv().ok()
    }
}

impl Drop for BtleplugLink {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

struct Worker {
    adapter: Adapter,
    config: BtleplugLinkConfig,
    events: mpsc::SyncSender<LinkEvent>,
    seen: HashMap<String, Peripheral>,
    current: Option<Peripheral>,
    notify_task: Option<tokio::task::JoinHandle<()>>,
    scanning: bool,
}

async fn run_worker(
    config: BtleplugLinkConfig,
    mut request_rx: tokio_mpsc::Receiver<LinkRequest>,
    events: mpsc::SyncSender<LinkEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let manager = match Manager::new().await {
        Ok(m) => m,
        Err(err) => {
            warn!(error = %err, "btleplug manager unavailable");
            return;
        }
    };
    let adapter = match manager.adapters().await.map(|a| a.into_iter().next()) {
        Ok(Some(a)) => a,
        Ok(None) => {
            warn!("no bluetooth adapter present");
            return;
        }
        Err(err) => {
            warn!(error = %err, "failed to enumerate bluetooth adapters");
            return;
        }
    };
    let mut central_events = match adapter.events().await {
        Ok(e) => e,
        Err(err) => {
            warn!(error = %err, "failed to subscribe to adapter events");
            return;
        }
    };

    let mut worker = Worker {
        adapter,
        config,
        events,
        seen: HashMap::new(),
        current: None,
        notify_task: None,
        scanning: false,
    };

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            maybe_request = request_rx.recv() => match maybe_request {
                Some(request) => worker.handle_request(request).await,
                None => break,
            },
            Some(event) = central_events.next() => worker.handle_central_event(event).await,
        }
    }

    worker.teardown().await;
}

impl Worker {
    fn emit(&self, event: LinkEvent) {
        if self.events.try_send(event).is_err() {
            warn!("link event queue full; dropping event");
        }
    }

    async fn handle_request(&mut self, request: LinkRequest) {
        debug!(?request, "link request");
        match request {
            LinkRequest::StartScan => {
                self.seen.clear();
                match self.adapter.start_scan(ScanFilter::default()).await {
                    Ok(()) => self.scanning = true,
                    Err(err) => {
                        warn!(error = %err, "start_scan failed");
                        self.emit(LinkEvent::ScanFailed(LinkError::Io(err.to_string())));
                    }
                }
            }
            LinkRequest::StopScan => {
                self.scanning = false;
                let _ = self.adapter.stop_scan().await;
            }
            LinkRequest::Connect(device) => self.connect(&device).await,
            LinkRequest::Disconnect => self.teardown().await,
            LinkRequest::DiscoverServices => self.discover_services().await,
            LinkRequest::EnableNotify(uuid) => {
                let result = self.enable_notify(uuid).await;
                self.emit(LinkEvent::NotifyEnabled(result));
            }
            LinkRequest::DisableNotify(uuid) => {
                if let Some(task) = self.notify_task.take() {
                    task.abort();
                }
                if let (Some(peripheral), Some(ch)) = (&self.current, self.characteristic(uuid)) {
                    let _ = peripheral.unsubscribe(&ch).await;
                }
            }
            LinkRequest::Write(uuid, bytes) => {
                let result = self.write(uuid, &bytes).await;
                self.emit(LinkEvent::WriteComplete(result));
            }
        }
    }

    async fn handle_central_event(&mut self, event: CentralEvent) {
        match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                if !self.scanning {
                    return;
                }
                let Ok(peripheral) = self.adapter.peripheral(&id).await else {
                    return;
                };
                let properties = peripheral.properties().await.ok().flatten();
                let key = id.to_string();
                self.seen.insert(key.clone(), peripheral);
                self.emit(LinkEvent::DeviceDiscovered(DiscoveredDevice {
                    id: DeviceId::new(key),
                    name: properties.as_ref().and_then(|p| p.local_name.clone()),
                    rssi: properties.as_ref().and_then(|p| p.rssi),
                }));
            }
            CentralEvent::DeviceDisconnected(id) => {
                let is_current = self.current.as_ref().is_some_and(|p| p.id() == id);
                if is_current {
                    self.current = None;
                    if let Some(task) = self.notify_task.take() {
                        task.abort();
                    }
                    self.emit(LinkEvent::disconnected());
                }
            }
            _ => {}
        }
    }

    async fn connect(&mut self, device: &DeviceId) {
        let Some(peripheral) = self.seen.get(&device.0).cloned() else {
            warn!(%device, "connect requested for unknown device");
            self.emit(LinkEvent::disconnected());
            return;
        };
        match peripheral.connect().await {
            Ok(()) => {
                self.current = Some(peripheral);
                self.emit(LinkEvent::connected());
            }
            Err(err) => {
                warn!(%device, error = %err, "connect failed");
                self.emit(LinkEvent::disconnected());
            }
        }
    }

    async fn discover_services(&mut self) {
        let Some(peripheral) = &self.current else {
            self.emit(LinkEvent::ServicesDiscovered(Vec::new()));
            return;
        };
        if let Err(err) = peripheral.discover_services().await {
            warn!(error = %err, "service discovery failed");
        }
        let services = peripheral
            .services()
            .into_iter()
            .map(|service| GattService {
                uuid: service.uuid,
                characteristics: service.characteristics.iter().map(|c| c.uuid).collect(),
            })
            .collect();
        self.emit(LinkEvent::ServicesDiscovered(services));
    }

    fn characteristic(&self, uuid: Uuid) -> Option<Characteristic> {
        self.current
            .as_ref()?
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
    }

    async fn enable_notify(&mut self, uuid: Uuid) -> Result<(), LinkError> {
        let peripheral = self.current.clone().ok_or(LinkError::NotConnected)?;
        let ch = self
            .characteristic(uuid)
            .ok_or(LinkError::CharacteristicNotFound(uuid))?;
        peripheral
            .subscribe(&ch)
            .await
            .map_err(|err| LinkError::Io(err.to_string()))?;

        let mut notifications = peripheral
            .notifications()
            .await
            .map_err(|err| LinkError::Io(err.to_string()))?;
        let events = self.events.clone();
        if let Some(task) = self.notify_task.take() {
            task.abort();
        }
        self.notify_task = Some(tokio::spawn(async move {
            while let Some(data) = notifications.next().await {
                let event = LinkEvent::Notification {
                    characteristic: data.uuid,
                    value: data.value,
                };
                if events.try_send(event).is_err() {
                    warn!("link event queue full; dropping notification");
                }
            }
        }));
        Ok(())
    }

    async fn write(&self, uuid: Uuid, bytes: &[u8]) -> Result<(), LinkError> {
        let peripheral = self.current.as_ref().ok_or(LinkError::NotConnected)?;
        let ch = self
            .characteristic(uuid)
            .ok_or(LinkError::CharacteristicNotFound(uuid))?;
        let write_type = if self.config.write_with_response {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };
        peripheral
            .write(&ch, bytes, write_type)
            .await
            .map_err(|err| LinkError::Io(err.to_string()))
    }

    async fn teardown(&mut self) {
        if let Some(task) = self.notify_task.take() {
            task.abort();
        }
        if let Some(peripheral) = self.current.take() {
            let _ = peripheral.disconnect().await;
        }
    }
}
