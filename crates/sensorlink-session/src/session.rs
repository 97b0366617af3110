use std::time::{Duration, Instant};

use sensorlink_codec::{
    AltitudeUnit, Command, CommandEncoder, FrameAssembler, PayloadDecoder, Sample, SleepState,
    TemperatureUnit,
};
use sensorlink_core::{DeviceId, Dialect, LinkState};
use sensorlink_transport::{DiscoveredDevice, GattService, LinkAdapter, LinkError, LinkEvent};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::config::{ConfigError, SessionConfig};
use crate::event::{CommandError, Event, SessionError, Warning};
use crate::queue::{CommandHandle, CommandQueue, PendingCommand};
use crate::state::SessionState;

pub type SampleCallback = Box<dyn FnMut(Sample)>;
pub type EventCallback = Box<dyn FnMut(Event)>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    /// Notifications handed to the session by the link.
    pub notifications_received: usize,
    /// Notifications dropped outside `Operating` or from a foreign characteristic.
    pub notifications_discarded: usize,
    /// Logical messages reassembled.
    pub messages_completed: usize,
    pub frame_errors: usize,
    pub decode_errors: usize,
    pub samples_delivered: usize,
    /// Command writes acknowledged by the link.
    pub commands_written: usize,
    pub commands_failed: usize,
}

/// One central-side conversation with a single sensor peer.
///
/// All methods are synchronous. Link completions are fed in through
/// [`Session::handle_link_event`] (or drained by [`Session::pump`]) on the same
/// executor that calls the public operations.
pub struct Session<L: LinkAdapter> {
    config: SessionConfig,
    link: L,
    state: SessionState,
    assembler: FrameAssembler,
    decoder: PayloadDecoder,
    encoder: CommandEncoder,
    queue: CommandQueue,
    scan_deadline: Option<Instant>,
    device: Option<DeviceId>,
    env_units: Option<(AltitudeUnit, TemperatureUnit)>,
    sleep_state: Option<SleepState>,
    stats: SessionStats,
    on_sample: SampleCallback,
    on_event: EventCallback,
}

impl<L: LinkAdapter> Session<L> {
    pub fn new(
        config: SessionConfig,
        link: L,
        on_sample: impl FnMut(Sample) + 'static,
        on_event: impl FnMut(Event) + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let dialect = config.dialect;
        Ok(Self {
            assembler: FrameAssembler::new(config.effective_max_frame_len()),
            decoder: PayloadDecoder::new(dialect),
            encoder: CommandEncoder::new(dialect),
            queue: CommandQueue::new(config.command_queue_depth),
            config,
            link,
            state: SessionState::Idle,
            scan_deadline: None,
            device: None,
            env_units: None,
            sleep_state: None,
            stats: SessionStats::default(),
            on_sample: Box::new(on_sample),
            on_event: Box::new(on_event),
        })
    }

    /// Session with the stock settings for `dialect`.
    pub fn for_dialect(
        dialect: Dialect,
        link: L,
        on_sample: impl FnMut(Sample) + 'static,
        on_event: impl FnMut(Event) + 'static,
    ) -> Result<Self, ConfigError> {
        Self::new(SessionConfig::for_dialect(dialect), link, on_sample, on_event)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Peer selected by the current scan match; cleared on teardown.
    pub fn device(&self) -> Option<&DeviceId> {
        self.device.as_ref()
    }

    /// Unit tags carried by the last environmental sample.
    pub fn env_units(&self) -> Option<(AltitudeUnit, TemperatureUnit)> {
        self.env_units
    }

    /// Last reported particulate sensor sleep state.
    pub fn sleep_state(&self) -> Option<SleepState> {
        self.sleep_state
    }

    /// Commands accepted but not yet acknowledged, including the one in flight.
    pub fn pending_commands(&self) -> usize {
        self.queue.waiting() + usize::from(self.queue.has_in_flight())
    }

    pub fn scan_deadline(&self) -> Option<Instant> {
        self.scan_deadline
    }

    /// Starts scanning for the configured peer. `None` uses the configured timeout.
    pub fn start_scan(&mut self, timeout: Option<Duration>) -> Result<(), SessionError> {
        self.start_scan_at(Instant::now(), timeout)
    }

    pub fn start_scan_at(
        &mut self,
        now: Instant,
        timeout: Option<Duration>,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::InvalidState(self.state));
        }
        self.link.start_scan().map_err(SessionError::Link)?;
        let timeout = timeout.unwrap_or(self.config.scan_timeout);
        self.scan_deadline = Some(now + timeout);
        debug!(dialect = %self.dialect(), ?timeout, "scan started");
        self.transition(SessionState::Scanning);
        Ok(())
    }

    pub fn stop_scan(&mut self) {
        if self.state != SessionState::Scanning {
            return;
        }
        self.scan_deadline = None;
        self.link.stop_scan();
        self.transition(SessionState::Idle);
    }

    /// Expires the scan deadline if `now` has passed it.
    pub fn poll_timers(&mut self, now: Instant) {
        if self.state != SessionState::Scanning {
            return;
        }
        if let Some(deadline) = self.scan_deadline {
            if now >= deadline {
                debug!("scan timed out without a match");
                self.scan_deadline = None;
                self.link.stop_scan();
                self.emit(Event::ScanTimedOut);
                self.transition(SessionState::Idle);
            }
        }
    }

    /// Drains the link's own event source, then checks timers. Returns the
    /// number of link events handled.
    pub fn pump(&mut self, now: Instant) -> usize {
        let mut handled = 0;
        while let Some(event) = self.link.poll_event() {
            self.handle_link_event(event);
            handled += 1;
        }
        self.poll_timers(now);
        handled
    }

    pub fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::DeviceDiscovered(device) => self.on_device_discovered(device),
            LinkEvent::ScanFailed(err) => self.on_scan_failed(err),
            LinkEvent::StateChanged(code) => self.on_state_change(code),
            LinkEvent::ServicesDiscovered(services) => self.on_services_discovered(&services),
            LinkEvent::NotifyEnabled(result) => self.on_notify_enabled(result),
            LinkEvent::WriteComplete(result) => self.on_write_complete(result),
            LinkEvent::Notification {
                characteristic,
                value,
            } => self.on_notify(characteristic, &value),
        }
    }

    pub fn on_device_discovered(&mut self, device: DiscoveredDevice) {
        if self.state != SessionState::Scanning {
            trace!(device = %device.id, "advertisement outside scan ignored");
            return;
        }
        let Some(wanted) = self.config.expected_device_name() else {
            return;
        };
        if !device.name_matches(wanted) {
            trace!(device = %device.id, name = ?device.name, "advertisement did not match");
            return;
        }

        // Disarm the deadline before anything else so a late timer cannot race the match.
        self.scan_deadline = None;
        self.link.stop_scan();
        debug!(device = %device.id, "peer matched; connecting");
        self.device = Some(device.id.clone());
        let id = device.id.clone();
        self.emit(Event::DeviceSelected(device));
        self.transition(SessionState::Connecting);
        if let Err(err) = self.link.connect(&id) {
            self.fail(SessionError::Link(err));
        }
    }

    pub fn on_state_change(&mut self, code: u8) {
        let link_state = match LinkState::from_code(code) {
            Ok(state) => state,
            Err(_) if !self.state.has_link() => {
                debug!(code, state = %self.state, "unknown link state ignored");
                return;
            }
            Err(_) => {
                self.fail(SessionError::UnexpectedLinkState(code));
                return;
            }
        };

        match (link_state, self.state) {
            (LinkState::Connected, SessionState::Connecting) => {
                self.transition(SessionState::Discovering);
                self.request_discovery();
            }
            (
                LinkState::Connected,
                SessionState::Discovering | SessionState::Enabling | SessionState::Operating,
            ) => {
                debug!(state = %self.state, "link reconnected; rediscovering services");
                self.assembler.reset();
                self.sleep_state = None;
                self.env_units = None;
                self.cancel_commands();
                self.transition(SessionState::Discovering);
                self.request_discovery();
            }
            (LinkState::Disconnected, state) if state.has_link() => {
                warn!(state = %state, "link dropped");
                self.emit(Event::LinkLost);
                self.transition(SessionState::Disconnecting);
                self.teardown();
            }
            (link_state, state) => {
                debug!(?link_state, state = %state, "link state change ignored");
            }
        }
    }

    pub fn on_services_discovered(&mut self, services: &[GattService]) {
        if self.state != SessionState::Discovering {
            debug!(state = %self.state, "service table outside discovery ignored");
            return;
        }
        let dialect = self.dialect();
        let complete = services.iter().any(|service| {
            service.uuid == dialect.service_uuid()
                && service.has_characteristic(dialect.rx_uuid())
                && service.has_characteristic(dialect.tx_uuid())
        });
        if !complete {
            self.fail(SessionError::ServiceIncomplete);
            return;
        }

        self.transition(SessionState::Enabling);
        if let Err(err) = self.link.enable_notify(dialect.tx_uuid()) {
            self.fail(notify_failure(err));
        }
    }

    pub fn on_scan_failed(&mut self, err: LinkError) {
        if self.state != SessionState::Scanning {
            debug!(state = %self.state, error = %err, "scan failure outside scanning ignored");
            return;
        }
        self.fail(SessionError::Link(err));
    }

    pub fn on_notify_enabled(&mut self, result: Result<(), LinkError>) {
        if self.state != SessionState::Enabling {
            debug!(state = %self.state, "notify acknowledgement outside enabling ignored");
            return;
        }
        match result {
            Ok(()) => {
                self.assembler.reset();
                self.transition(SessionState::Operating);
            }
            Err(err) => self.fail(notify_failure(err)),
        }
    }

    pub fn on_write_complete(&mut self, result: Result<(), LinkError>) {
        let Some(pending) = self.queue.take_in_flight() else {
            debug!("write completion with no command in flight");
            return;
        };
        match result {
            Ok(()) => {
                self.stats.commands_written += 1;
                trace!(command = ?pending.command, "command acknowledged");
                pending.complete(Ok(()));
            }
            Err(err) => {
                self.stats.commands_failed += 1;
                warn!(command = ?pending.command, error = %err, "command write failed");
                pending.complete(Err(CommandError::LinkWriteFailed(err.clone())));
                if let LinkError::CharacteristicNotFound(uuid) = err {
                    self.fail(SessionError::CharacteristicMissing(uuid));
                    return;
                }
            }
        }
        self.issue_next();
    }

    /// Feeds one notification fragment.
    pub fn on_notify(&mut self, characteristic: Uuid, value: &[u8]) {
        self.stats.notifications_received += 1;
        if self.state != SessionState::Operating || characteristic != self.dialect().tx_uuid() {
            self.stats.notifications_discarded += 1;
            trace!(state = %self.state, %characteristic, "notification discarded");
            return;
        }

        if !self.dialect().is_framed() {
            self.deliver(value);
            return;
        }

        let outcome = self.assembler.feed(value);
        for message in outcome.messages {
            self.stats.messages_completed += 1;
            self.deliver(message.payload());
        }
        if let Some(err) = outcome.error {
            self.stats.frame_errors += 1;
            warn!(error = %err, "framing error; assembler reset");
            self.emit(Event::FrameError(err));
        }
    }

    /// Encodes `command` and hands it to the link, or queues it behind the
    /// command already in flight.
    pub fn send_command(&mut self, command: Command) -> Result<CommandHandle, CommandError> {
        if self.state != SessionState::Operating {
            debug!(?command, state = %self.state, "command rejected; not connected");
            return Err(CommandError::NotConnected);
        }
        let byte = self.encoder.encode(command)?;
        let (pending, handle) = PendingCommand::new(command, byte);

        if self.queue.has_in_flight() {
            if self.queue.push(pending).is_err() {
                let depth = self.config.command_queue_depth;
                warn!(?command, depth, "command queue full");
                return Err(CommandError::Backpressure { depth });
            }
            return Ok(handle);
        }

        let rx = self.dialect().rx_uuid();
        match self.link.write(rx, &[byte]) {
            Ok(()) => {
                trace!(?command, byte, "command written");
                self.queue.set_in_flight(pending);
                Ok(handle)
            }
            Err(err) => {
                self.stats.commands_failed += 1;
                warn!(?command, error = %err, "command write rejected");
                if let LinkError::CharacteristicNotFound(uuid) = err {
                    self.fail(SessionError::CharacteristicMissing(uuid));
                }
                Err(CommandError::LinkWriteFailed(err))
            }
        }
    }

    /// Tears the session down. Safe to call in any state; repeated calls are no-ops.
    pub fn disconnect(&mut self) {
        match self.state {
            SessionState::Idle | SessionState::Disconnecting | SessionState::Failed => {}
            SessionState::Scanning => {
                self.scan_deadline = None;
                self.link.stop_scan();
                self.transition(SessionState::Disconnecting);
                self.teardown();
            }
            from => {
                self.transition(SessionState::Disconnecting);
                if from == SessionState::Operating {
                    let tx = self.dialect().tx_uuid();
                    if let Err(err) = self.link.disable_notify(tx) {
                        debug!(error = %err, "disable notify failed during disconnect");
                    }
                }
                self.link.disconnect();
                self.teardown();
            }
        }
    }

    fn request_discovery(&mut self) {
        if let Err(err) = self.link.discover_services() {
            self.fail(SessionError::Link(err));
        }
    }

    fn issue_next(&mut self) {
        while !self.queue.has_in_flight() {
            let Some(next) = self.queue.pop_waiting() else {
                return;
            };
            let rx = self.dialect().rx_uuid();
            match self.link.write(rx, &[next.byte]) {
                Ok(()) => {
                    trace!(command = ?next.command, "queued command written");
                    self.queue.set_in_flight(next);
                }
                Err(err) => {
                    self.stats.commands_failed += 1;
                    warn!(command = ?next.command, error = %err, "queued command write rejected");
                    next.complete(Err(CommandError::LinkWriteFailed(err.clone())));
                    if let LinkError::CharacteristicNotFound(uuid) = err {
                        self.fail(SessionError::CharacteristicMissing(uuid));
                        return;
                    }
                }
            }
        }
    }

    fn deliver(&mut self, payload: &[u8]) {
        let decoded = match self.decoder.decode(payload) {
            Ok(decoded) => decoded,
            Err(err) => {
                self.stats.decode_errors += 1;
                warn!(error = %err, "payload dropped");
                self.emit(Event::DecodeError(err));
                return;
            }
        };
        if decoded.has_trailing() {
            debug!(extra = decoded.trailing, "ignoring trailing payload bytes");
            self.emit(Event::Warning(Warning::TrailingBytes {
                extra: decoded.trailing,
            }));
        }

        let sample = decoded.value;
        match &sample {
            Sample::Env(env) => {
                self.env_units = Some((env.altitude_unit, env.temperature_unit));
            }
            Sample::Pm(pm) if self.sleep_state != Some(pm.sleep_state) => {
                debug!(sleep_state = ?pm.sleep_state, "particulate sleep state changed");
                self.sleep_state = Some(pm.sleep_state);
                self.emit(Event::SleepStateChanged(pm.sleep_state));
            }
            _ => {}
        }
        self.stats.samples_delivered += 1;
        (self.on_sample)(sample);
    }

    fn cancel_commands(&mut self) {
        let cancelled = self.queue.cancel_all();
        if cancelled > 0 {
            debug!(cancelled, "pending commands cancelled");
        }
    }

    /// Common exit path from `Disconnecting`.
    fn teardown(&mut self) {
        self.cancel_commands();
        self.assembler.reset();
        self.scan_deadline = None;
        self.device = None;
        self.sleep_state = None;
        self.env_units = None;
        self.transition(SessionState::Idle);
    }

    fn fail(&mut self, err: SessionError) {
        let from = self.state;
        warn!(error = %err, state = %from, "session failed");
        self.emit(Event::SessionFailed(err));
        self.transition(SessionState::Failed);
        if from == SessionState::Scanning {
            self.link.stop_scan();
        } else if from.has_link() {
            self.link.disconnect();
        }
        self.teardown();
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        debug!(%from, %to, "session state");
        self.state = to;
        self.emit(Event::StateChanged { from, to });
    }

    fn emit(&mut self, event: Event) {
        (self.on_event)(event);
    }
}

fn notify_failure(err: LinkError) -> SessionError {
    match err {
        LinkError::CharacteristicNotFound(uuid) => SessionError::CharacteristicMissing(uuid),
        other => SessionError::NotifyEnableFailed(other),
    }
}

impl<L: LinkAdapter + std::fmt::Debug> std::fmt::Debug for Session<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("dialect", &self.config.dialect)
            .field("state", &self.state)
            .field("device", &self.device)
            .field("pending_commands", &self.pending_commands())
            .field("stats", &self.stats)
            .field("link", &self.link)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    use sensorlink_codec::{encode_frame, Command, Sample, SleepState};
    use sensorlink_core::Dialect;
    use sensorlink_transport::{
        DiscoveredDevice, GattService, LinkCall, LinkError, LinkEvent, MockLink,
    };

    use super::Session;
    use crate::event::{CommandError, Event, SessionError};
    use crate::state::SessionState;

    type Log<T> = Rc<RefCell<Vec<T>>>;

    fn session(dialect: Dialect) -> (Session<MockLink>, Log<Sample>, Log<Event>) {
        let samples: Log<Sample> = Rc::default();
        let events: Log<Event> = Rc::default();
        let (s, e) = (samples.clone(), events.clone());
        let session = Session::for_dialect(
            dialect,
            MockLink::new(),
            move |sample| s.borrow_mut().push(sample),
            move |event| e.borrow_mut().push(event),
        )
        .expect("stock config is valid");
        (session, samples, events)
    }

    fn bring_up(session: &mut Session<MockLink>) {
        let dialect = session.dialect();
        session.start_scan(None).expect("scan starts");
        session.handle_link_event(LinkEvent::DeviceDiscovered(DiscoveredDevice::new(
            "AA:BB",
            dialect.default_device_name(),
        )));
        session.handle_link_event(LinkEvent::connected());
        session.handle_link_event(LinkEvent::ServicesDiscovered(vec![GattService::for_dialect(
            dialect,
        )]));
        session.handle_link_event(LinkEvent::NotifyEnabled(Ok(())));
        assert_eq!(session.state(), SessionState::Operating);
    }

    #[test]
    fn walks_the_full_bring_up_sequence() {
        let (mut session, _, events) = session(Dialect::Environmental);
        bring_up(&mut session);

        let states: Vec<_> = events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::StateChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                SessionState::Scanning,
                SessionState::Connecting,
                SessionState::Discovering,
                SessionState::Enabling,
                SessionState::Operating,
            ]
        );
        let tx = Dialect::Environmental.tx_uuid();
        assert!(session.link().calls().contains(&LinkCall::EnableNotify(tx)));
        assert_eq!(session.device().map(|d| d.0.as_str()), Some("AA:BB"));
    }

    #[test]
    fn scan_deadline_expires_back_to_idle() {
        let (mut session, _, events) = session(Dialect::Particulate);
        let start = Instant::now();
        session
            .start_scan_at(start, Some(Duration::from_millis(100)))
            .expect("scan starts");
        session.poll_timers(start + Duration::from_millis(99));
        assert_eq!(session.state(), SessionState::Scanning);

        session.poll_timers(start + Duration::from_millis(100));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(events.borrow().contains(&Event::ScanTimedOut));
        assert_eq!(session.link().count(|c| *c == LinkCall::StopScan), 1);
    }

    #[test]
    fn backend_scan_failure_ends_the_session() {
        let (mut session, _, events) = session(Dialect::Environmental);
        session.start_scan(None).expect("scan starts");
        let err = LinkError::Io("adapter powered off".into());
        session.handle_link_event(LinkEvent::ScanFailed(err.clone()));

        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.scan_deadline().is_none());
        assert!(events
            .borrow()
            .contains(&Event::SessionFailed(SessionError::Link(err.clone()))));
        assert_eq!(session.link().count(|c| *c == LinkCall::StopScan), 1);

        // A late report after the session moved on is ignored.
        session.handle_link_event(LinkEvent::ScanFailed(err));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(
            events
                .borrow()
                .iter()
                .filter(|e| matches!(e, Event::SessionFailed(_)))
                .count(),
            1
        );
    }

    #[test]
    fn match_disarms_the_scan_deadline() {
        let (mut session, _, events) = session(Dialect::Environmental);
        let start = Instant::now();
        session.start_scan_at(start, None).expect("scan starts");
        session.on_device_discovered(DiscoveredDevice::new("1", Some("PERIPHERAL BME280 BLE")));
        assert_eq!(session.state(), SessionState::Connecting);
        assert!(session.scan_deadline().is_none());

        session.poll_timers(start + Duration::from_secs(60));
        assert_eq!(session.state(), SessionState::Connecting);
        assert!(!events.borrow().contains(&Event::ScanTimedOut));
    }

    #[test]
    fn non_matching_advertisements_keep_scanning() {
        let (mut session, _, _) = session(Dialect::Environmental);
        session.start_scan(None).expect("scan starts");
        session.on_device_discovered(DiscoveredDevice::new("1", Some("Peripheral SPS30 BLE")));
        session.on_device_discovered(DiscoveredDevice::new("2", None));
        assert_eq!(session.state(), SessionState::Scanning);
        assert!(session.start_scan(None).is_err());
    }

    #[test]
    fn missing_characteristic_fails_with_service_incomplete() {
        let (mut session, _, events) = session(Dialect::Environmental);
        session.start_scan(None).expect("scan starts");
        session.on_device_discovered(DiscoveredDevice::new("1", Some("Peripheral BME280 BLE")));
        session.on_state_change(2);
        let mut service = GattService::for_dialect(Dialect::Environmental);
        service.characteristics.retain(|c| *c != Dialect::Environmental.rx_uuid());
        session.on_services_discovered(&[service]);

        assert_eq!(session.state(), SessionState::Idle);
        assert!(events
            .borrow()
            .contains(&Event::SessionFailed(SessionError::ServiceIncomplete)));
        assert!(events.borrow().contains(&Event::StateChanged {
            from: SessionState::Discovering,
            to: SessionState::Failed
        }));
        assert_eq!(session.link().count(|c| *c == LinkCall::Disconnect), 1);
    }

    #[test]
    fn unknown_link_state_while_connected_fails_the_session() {
        let (mut session, _, events) = session(Dialect::Environmental);
        bring_up(&mut session);
        session.on_state_change(1);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(events
            .borrow()
            .contains(&Event::SessionFailed(SessionError::UnexpectedLinkState(1))));
    }

    #[test]
    fn unsolicited_drop_reports_link_lost_without_disconnect_call() {
        let (mut session, _, events) = session(Dialect::Environmental);
        bring_up(&mut session);
        let mut handle = session.send_command(Command::SendNow).expect("accepted");

        session.handle_link_event(LinkEvent::disconnected());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(events.borrow().contains(&Event::LinkLost));
        assert_eq!(session.link().count(|c| *c == LinkCall::Disconnect), 0);

        assert_eq!(handle.try_result(), Some(Err(CommandError::Cancelled)));
    }

    #[test]
    fn reconnect_resets_partial_frame_and_rediscovers() {
        let (mut session, samples, _) = session(Dialect::Environmental);
        bring_up(&mut session);
        let tx = Dialect::Environmental.tx_uuid();
        let wire = encode_frame(&[0_u8; 18]).expect("frame");
        session.on_notify(tx, &wire[..5]);

        session.on_state_change(2);
        assert_eq!(session.state(), SessionState::Discovering);
        session.on_services_discovered(&[GattService::for_dialect(Dialect::Environmental)]);
        session.on_notify_enabled(Ok(()));

        session.on_notify(tx, &wire);
        assert_eq!(samples.borrow().len(), 1);
        assert_eq!(session.stats().frame_errors, 0);
    }

    #[test]
    fn reconnect_forgets_the_cached_sleep_state() {
        let (mut session, _, events) = session(Dialect::Particulate);
        bring_up(&mut session);
        let tx = Dialect::Particulate.tx_uuid();
        let sleeping = encode_frame(&[0_u8; 41]).expect("frame");
        session.on_notify(tx, &sleeping);
        assert_eq!(session.sleep_state(), Some(SleepState::Sleeping));

        session.on_state_change(2);
        assert_eq!(session.sleep_state(), None);
        session.on_services_discovered(&[GattService::for_dialect(Dialect::Particulate)]);
        session.on_notify_enabled(Ok(()));
        session.on_notify(tx, &sleeping);

        let changes = events
            .borrow()
            .iter()
            .filter(|e| **e == Event::SleepStateChanged(SleepState::Sleeping))
            .count();
        assert_eq!(changes, 2);
    }

    #[test]
    fn reconnect_with_reduced_table_is_service_incomplete() {
        let (mut session, _, events) = session(Dialect::Particulate);
        bring_up(&mut session);
        session.on_state_change(2);
        session.on_services_discovered(&[]);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(events
            .borrow()
            .contains(&Event::SessionFailed(SessionError::ServiceIncomplete)));
    }

    #[test]
    fn disconnect_from_scanning_stops_the_scan() {
        let (mut session, _, _) = session(Dialect::Environmental);
        session.start_scan(None).expect("scan starts");
        session.disconnect();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.link().count(|c| *c == LinkCall::StopScan), 1);
        assert_eq!(session.link().count(|c| *c == LinkCall::Disconnect), 0);
    }

    #[test]
    fn stop_scan_outside_scanning_is_a_no_op() {
        let (mut session, _, events) = session(Dialect::Environmental);
        session.stop_scan();
        assert!(events.borrow().is_empty());
        assert!(session.link().calls().is_empty());
    }
}
