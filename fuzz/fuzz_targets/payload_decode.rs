#![no_main]

use libfuzzer_sys::fuzz_target;
use sensorlink_codec::frame::FrameAssembler;
use sensorlink_codec::payload::{decode_environmental, decode_io, decode_particulate};

fuzz_target!(|data: &[u8]| {
    let _ = decode_environmental(data);
    let _ = decode_particulate(data);
    let _ = decode_io(data);

    let mut asm = FrameAssembler::new(64);
    let outcome = asm.feed(data);
    for message in &outcome.messages {
        let _ = decode_particulate(message.payload());
    }
    assert!(asm.offset() <= 64);
});
