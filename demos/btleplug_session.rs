#[cfg(feature = "btleplug")]
fn main() {
    use std::env;
    use std::thread;
    use std::time::{Duration, Instant};

    use sensorlink_session::{Dialect, Session, SessionConfig};
    use sensorlink_transport::btleplug_backend::{BtleplugLink, BtleplugLinkConfig};

    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let config = match env::var("SENSORLINK_CONFIG") {
        Ok(path) => SessionConfig::load(path).expect("config should load"),
        Err(_) => SessionConfig::for_dialect(Dialect::Environmental),
    };
    let run_for = Duration::from_secs(
        env::var("SENSORLINK_RUN_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30),
    );

    let link =
        BtleplugLink::spawn(BtleplugLinkConfig::default()).expect("btleplug link should start");
    let mut session = Session::new(
        config,
        link,
        |sample| println!("sample: {sample:?}"),
        |event| println!("event: {event:?}"),
    )
    .expect("config should be valid");

    session.start_scan(None).expect("scan should start");
    let stop_at = Instant::now() + run_for;
    while Instant::now() < stop_at {
        session.pump(Instant::now());
        thread::sleep(Duration::from_millis(20));
    }
    session.disconnect();
    println!("stats: {:?}", session.stats());
}

#[cfg(not(feature = "btleplug"))]
fn main() {
    eprintln!("enable feature sensorlink-session/btleplug to run this example");
}
