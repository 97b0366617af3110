use std::time::Instant;

use sensorlink_codec::{encode_frame, AltitudeUnit, EnvSample, TemperatureUnit};
use sensorlink_session::{Command, Dialect, Event, Sample, Session, SessionConfig};
use sensorlink_transport::{DiscoveredDevice, GattService, LinkEvent, MockLink};
use tracing_subscriber::EnvFilter;

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .try_init();

    let config = SessionConfig::for_dialect(Dialect::Environmental);
    let mut session = Session::new(
        config,
        MockLink::new(),
        |sample| match sample {
            Sample::Env(env) => println!(
                "sample: {:.1} %RH, {:.1} hPa, {:.1} {:?}, {:.1} {:?}",
                env.humidity,
                env.pressure,
                env.altitude,
                env.altitude_unit,
                env.temperature,
                env.temperature_unit
            ),
            other => println!("sample: {other:?}"),
        },
        |event: Event| println!("event: {event:?}"),
    )
    .expect("stock config is valid");

    session.start_scan(None).expect("scan should start");

    let link = session.link_mut();
    link.enqueue(LinkEvent::DeviceDiscovered(DiscoveredDevice::new(
        "C0:FF:EE:00:00:01",
        Some("Peripheral BME280 BLE"),
    )));
    link.enqueue(LinkEvent::connected());
    link.enqueue(LinkEvent::ServicesDiscovered(vec![GattService::for_dialect(
        Dialect::Environmental,
    )]));
    link.enqueue(LinkEvent::NotifyEnabled(Ok(())));
    session.pump(Instant::now());

    let mut handle = session
        .send_command(Command::UnitsImperial)
        .expect("command accepted");
    session.handle_link_event(LinkEvent::WriteComplete(Ok(())));
    println!("command {:?}: {:?}", handle.command(), handle.try_result());

    // The peer now reports altitude in feet; the frame spans three notifications.
    let reading = EnvSample {
        humidity: 41.5,
        pressure: 1013.25,
        altitude: 65.6,
        temperature: 21.75,
        altitude_unit: AltitudeUnit::Feet,
        temperature_unit: TemperatureUnit::Celsius,
    };
    let wire = encode_frame(&reading.encode()).expect("sample fits a frame");
    let tx = Dialect::Environmental.tx_uuid();
    for fragment in wire.chunks(8) {
        session.handle_link_event(LinkEvent::Notification {
            characteristic: tx,
            value: fragment.to_vec(),
        });
    }

    session.disconnect();
    println!("stats: {:?}", session.stats());
    println!("link calls: {:#?}", session.link().calls());
}
