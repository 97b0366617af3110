#![no_main]

use libfuzzer_sys::fuzz_target;
use sensorlink_session::{Dialect, Session, SessionState};
use sensorlink_transport::{DiscoveredDevice, GattService, LinkEvent, MockLink};

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let dialect = if selector & 1 == 0 {
        Dialect::Environmental
    } else {
        Dialect::Particulate
    };
    let Ok(mut session) = Session::for_dialect(dialect, MockLink::new(), |_| {}, |_| {}) else {
        return;
    };

    let _ = session.start_scan(None);
    session.handle_link_event(LinkEvent::DeviceDiscovered(DiscoveredDevice::new(
        "fuzz",
        dialect.default_device_name(),
    )));
    session.handle_link_event(LinkEvent::connected());
    session.handle_link_event(LinkEvent::ServicesDiscovered(vec![GattService::for_dialect(
        dialect,
    )]));
    session.handle_link_event(LinkEvent::NotifyEnabled(Ok(())));

    // High nibble of the selector picks the fragment size.
    let chunk = usize::from(selector >> 4) + 1;
    for fragment in rest.chunks(chunk) {
        session.on_notify(dialect.tx_uuid(), fragment);
    }
    assert_eq!(session.state(), SessionState::Operating);
});
