#![no_main]

use libfuzzer_sys::fuzz_target;

use timpl::message::Message;
use timpl::types::{ContentType, ProtocolVersion};

fuzz_target!(|data: &[u8]| {
    for version in [ProtocolVersion::TLS1_2, ProtocolVersion::TLS1_3] {
        if let Ok(message) = Message::decode_versioned(ContentType::Handshake, data, version) {
            // Whatever decodes must encode again.
            let mut out = timpl::Buf::new();
            message.encode(&mut out);
        }
    }
    let _ = Message::decode(ContentType::Alert, data);
});
