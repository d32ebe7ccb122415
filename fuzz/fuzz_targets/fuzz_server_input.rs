#![no_main]

//! Arbitrary bytes into a fresh server connection.
//!
//! Raw input exercises the deframer; the same bytes wrapped in a handshake
//! record header reach the ClientHello parser and negotiation. Either way
//! the connection must answer with an alert or keep waiting, never panic.

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;
use std::time::Instant;

use timpl::{Config, Connection, Identity, Output};

const RSA_CERT: &str = include_str!("../../tests/fixtures/rsa-cert.pem");
const RSA_KEY: &str = include_str!("../../tests/fixtures/rsa-key.pem");

/// `ContentType(1) || ProtocolVersion(2) || Length(2)`
const HEADER_LEN: usize = 5;
const MAX_FRAGMENT_SIZE: usize = 16384;

fn drain(conn: &mut Connection) {
    while !matches!(conn.poll_output(), Output::Timeout(_)) {}
}

fuzz_target!(|data: &[u8]| {
    let config = Config::builder().rng_seed(1).build().unwrap();
    let identity = match Identity::from_pem(RSA_CERT, RSA_KEY, &config) {
        Ok(i) => i,
        Err(_) => return,
    };
    let config = Arc::new(config);

    let mut conn = Connection::new(Arc::clone(&config), identity.clone(), Instant::now());
    let _ = conn.handle_input(data);
    drain(&mut conn);

    if !data.is_empty() {
        let frag_len = data.len().min(MAX_FRAGMENT_SIZE);
        let mut record = Vec::with_capacity(HEADER_LEN + frag_len);
        record.push(22u8); // handshake
        record.extend_from_slice(&[0x03, 0x01]);
        record.extend_from_slice(&(frag_len as u16).to_be_bytes());
        record.extend_from_slice(&data[..frag_len]);

        let mut conn = Connection::new(config, identity, Instant::now());
        let _ = conn.handle_input(&record);
        drain(&mut conn);
    }
});
