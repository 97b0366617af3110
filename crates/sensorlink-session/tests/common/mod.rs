#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use sensorlink_session::{Event, Sample, Session, SessionConfig, SessionState};
use sensorlink_transport::{DiscoveredDevice, GattService, LinkCall, LinkEvent, MockLink};
use tracing_subscriber::EnvFilter;

pub const IO_DEVICE_NAME: &str = "Peripheral IO BLE";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn read_vector(name: &str) -> Vec<u8> {
    let path = format!(
        "{}/../sensorlink-codec/tests/vectors/{name}",
        env!("CARGO_MANIFEST_DIR")
    );
    let text = std::fs::read_to_string(path).expect("vector file must exist");
    hex::decode(text.trim()).expect("vector must be valid hex")
}

pub struct Harness {
    pub session: Session<MockLink>,
    samples: Rc<RefCell<Vec<Sample>>>,
    events: Rc<RefCell<Vec<Event>>>,
}

impl Harness {
    pub fn new(config: SessionConfig) -> Self {
        init_tracing();
        let samples: Rc<RefCell<Vec<Sample>>> = Rc::default();
        let events: Rc<RefCell<Vec<Event>>> = Rc::default();
        let (s, e) = (samples.clone(), events.clone());
        let session = Session::new(
            config,
            MockLink::new(),
            move |sample| s.borrow_mut().push(sample),
            move |event| e.borrow_mut().push(event),
        )
        .expect("test config is valid");
        Self {
            session,
            samples,
            events,
        }
    }

    pub fn operating(config: SessionConfig) -> Self {
        let mut harness = Self::new(config);
        harness.bring_up();
        harness
    }

    /// Scripts a conforming peer through scan, connect, discovery and
    /// notify-enable, drains it with `pump`, then clears recorded calls and
    /// events.
    pub fn bring_up(&mut self) {
        let dialect = self.session.dialect();
        let name = self
            .session
            .config()
            .expected_device_name()
            .map(str::to_owned);

        self.session.start_scan(None).expect("scan starts");
        let link = self.session.link_mut();
        link.enqueue(LinkEvent::DeviceDiscovered(DiscoveredDevice::new(
            "00:11:22:33:44:55",
            Some("Some Other Peripheral"),
        )));
        link.enqueue(LinkEvent::DeviceDiscovered(DiscoveredDevice::new(
            "AA:BB:CC:DD:EE:FF",
            name.as_deref(),
        )));
        link.enqueue(LinkEvent::connected());
        link.enqueue(LinkEvent::ServicesDiscovered(vec![GattService::for_dialect(dialect)]));
        link.enqueue(LinkEvent::NotifyEnabled(Ok(())));
        assert_eq!(self.session.pump(Instant::now()), 5);
        assert_eq!(self.session.state(), SessionState::Operating);

        self.session.link_mut().take_calls();
        self.events.borrow_mut().clear();
    }

    pub fn notify(&mut self, bytes: &[u8]) {
        let tx = self.session.dialect().tx_uuid();
        self.session.handle_link_event(LinkEvent::Notification {
            characteristic: tx,
            value: bytes.to_vec(),
        });
    }

    pub fn ack_write(&mut self) {
        self.session.handle_link_event(LinkEvent::WriteComplete(Ok(())));
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.samples.borrow().clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn calls(&self) -> Vec<LinkCall> {
        self.session.link().calls().to_vec()
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.session.link().written()
    }
}
