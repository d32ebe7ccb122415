//! First server flight for hand-built ClientHellos, using only the public
//! message and record types.

use std::sync::Arc;
use std::time::Instant;

use timpl::crypto::rust_crypto;
use timpl::message::extensions::{Extension, ExtensionType, KeyShareClientHello, KeyShareEntry};
use timpl::message::extensions::{SignatureAlgorithmsExtension, SupportedGroupsExtension};
use timpl::message::extensions::{SupportedVersionsClientHello, SupportedVersionsServerHello};
use timpl::message::{ClientHello, Message, DOWNGRADE_TLS12};
use timpl::record::Deframer;
use timpl::types::{ContentType, SignatureScheme};
use timpl::{Alert, AlertDescription, Buf, CipherSuite, Config, Connection, Identity};
use timpl::{NamedGroup, Output, ProtocolVersion};

const RSA_CERT: &str = include_str!("fixtures/rsa-cert.pem");
const RSA_KEY: &str = include_str!("fixtures/rsa-key.pem");

fn server(config: Config) -> Connection {
    let identity = Identity::from_pem(RSA_CERT, RSA_KEY, &config).expect("identity");
    Connection::new(Arc::new(config), identity, Instant::now())
}

fn client_hello(suites: &[CipherSuite], extensions: Vec<Extension>) -> Vec<u8> {
    let hello = Message::ClientHello(ClientHello {
        legacy_version: ProtocolVersion::TLS1_2,
        random: [0x11; 32],
        session_id: vec![0x22; 32],
        cipher_suites: suites.to_vec(),
        compression_methods: vec![0],
        extensions,
    });
    let mut body = Buf::new();
    hello.encode(&mut body);

    let mut record = vec![22, 3, 1];
    record.extend_from_slice(&(body.len() as u16).to_be_bytes());
    record.extend_from_slice(&body);
    record
}

fn tls13_extensions(shares: &[NamedGroup], groups: &[NamedGroup]) -> Vec<Extension> {
    let provider = rust_crypto::default_provider();
    let entries = shares
        .iter()
        .map(|g| {
            let kx = provider
                .find_kx_group(*g)
                .expect("group")
                .start_exchange()
                .expect("exchange");
            KeyShareEntry {
                group: *g,
                key_exchange: kx.pub_key().to_vec(),
            }
        })
        .collect();

    vec![
        SupportedVersionsClientHello {
            versions: vec![ProtocolVersion::TLS1_3],
        }
        .to_extension(),
        SupportedGroupsExtension {
            groups: groups.to_vec(),
        }
        .to_extension(),
        KeyShareClientHello { entries }.to_extension(),
        SignatureAlgorithmsExtension {
            schemes: vec![SignatureScheme::RsaPssRsaeSha256],
        }
        .to_extension(),
    ]
}

fn tls12_extensions() -> Vec<Extension> {
    vec![
        SupportedGroupsExtension {
            groups: vec![NamedGroup::Secp256r1],
        }
        .to_extension(),
        SignatureAlgorithmsExtension {
            schemes: vec![SignatureScheme::RsaPkcs1Sha256],
        }
        .to_extension(),
        Extension::uncompressed_point_format(),
        Extension::empty_renegotiation_info(),
    ]
}

/// Everything the server transmitted, as plaintext records. Stops at the
/// first record that is not a plaintext handshake, CCS or alert.
fn plaintext_records(server: &mut Connection) -> Vec<(ContentType, Vec<u8>)> {
    let mut deframer = Deframer::new();
    loop {
        match server.poll_output() {
            Output::Transmit(bytes) => deframer.push(&bytes),
            Output::Timeout(_) => break,
            _ => {}
        }
    }

    let mut records = Vec::new();
    while let Some(record) = deframer.next_record().expect("record") {
        if record.content_type == ContentType::ApplicationData {
            break;
        }
        records.push((record.content_type, record.payload));
    }
    records
}

fn handshake_messages(payload: &[u8], version: ProtocolVersion) -> Vec<Message> {
    let mut messages = Vec::new();
    let mut rest = payload;
    while !rest.is_empty() {
        let len = u32::from_be_bytes([0, rest[1], rest[2], rest[3]]) as usize;
        let (one, tail) = rest.split_at(4 + len);
        messages.push(Message::decode_versioned(ContentType::Handshake, one, version).unwrap());
        rest = tail;
    }
    messages
}

#[test]
fn tls13_hello_in_single_byte_chunks() {
    let _ = env_logger::try_init();
    let mut server = server(Config::builder().build().unwrap());
    let hello = client_hello(
        &[CipherSuite::TLS13_AES_128_GCM_SHA256],
        tls13_extensions(&[NamedGroup::X25519], &[NamedGroup::X25519]),
    );

    for byte in &hello {
        server.handle_input(std::slice::from_ref(byte)).unwrap();
    }

    let records = plaintext_records(&mut server);
    assert_eq!(records.len(), 2, "ServerHello then middlebox CCS");
    assert_eq!(records[1], (ContentType::ChangeCipherSpec, vec![1]));

    let messages = handshake_messages(&records[0].1, ProtocolVersion::TLS1_2);
    let Message::ServerHello(sh) = &messages[0] else {
        panic!("expected ServerHello, got {:?}", messages);
    };
    assert_eq!(sh.session_id, vec![0x22; 32]);
    assert_eq!(sh.cipher_suite, CipherSuite::TLS13_AES_128_GCM_SHA256);
    let selected = SupportedVersionsServerHello::parse(
        sh.extension(ExtensionType::SupportedVersions).unwrap(),
    )
    .unwrap();
    assert_eq!(selected.selected_version, ProtocolVersion::TLS1_3);
    assert_eq!(server.negotiated_version(), Some(ProtocolVersion::TLS1_3));
}

#[test]
fn tls13_without_matching_share_gets_retry_request() {
    let _ = env_logger::try_init();
    let mut server = server(Config::builder().build().unwrap());
    let hello = client_hello(
        &[CipherSuite::TLS13_AES_256_GCM_SHA384],
        tls13_extensions(&[], &[NamedGroup::Secp256r1]),
    );
    server.handle_input(&hello).unwrap();

    let records = plaintext_records(&mut server);
    let messages = handshake_messages(&records[0].1, ProtocolVersion::TLS1_2);
    let Message::HelloRetryRequest(hrr) = &messages[0] else {
        panic!("expected HelloRetryRequest, got {:?}", messages);
    };
    assert_eq!(hrr.selected_group, NamedGroup::Secp256r1);
    assert_eq!(hrr.cipher_suite, CipherSuite::TLS13_AES_256_GCM_SHA384);
    assert!(!server.is_handshake_complete());
}

#[test]
fn tls12_full_flight_with_downgrade_marker() {
    let _ = env_logger::try_init();
    let mut server = server(Config::builder().build().unwrap());
    let hello = client_hello(&[CipherSuite::ECDHE_RSA_AES128_GCM_SHA256], tls12_extensions());
    server.handle_input(&hello).unwrap();

    let records = plaintext_records(&mut server);
    let payload: Vec<u8> = records
        .iter()
        .filter(|(t, _)| *t == ContentType::Handshake)
        .flat_map(|(_, p)| p.clone())
        .collect();
    let messages = handshake_messages(&payload, ProtocolVersion::TLS1_2);

    assert!(matches!(messages.as_slice(), [
        Message::ServerHello(_),
        Message::Certificate(_),
        Message::ServerKeyExchange(_),
        Message::ServerHelloDone,
    ]));
    let Message::ServerHello(sh) = &messages[0] else {
        unreachable!()
    };
    assert_eq!(&sh.random[24..], &DOWNGRADE_TLS12);
    // Full handshake: a fresh 32 byte id, not the one offered.
    assert_eq!(sh.session_id.len(), 32);
    assert_ne!(sh.session_id, vec![0x22; 32]);
    assert!(sh.extension(ExtensionType::RenegotiationInfo).is_some());
}

#[test]
fn tls12_only_server_has_no_downgrade_marker() {
    let _ = env_logger::try_init();
    let mut server = server(Config::builder().enable_tls13(false).build().unwrap());
    let hello = client_hello(&[CipherSuite::RSA_AES128_GCM_SHA256], tls12_extensions());
    server.handle_input(&hello).unwrap();

    let records = plaintext_records(&mut server);
    let messages = handshake_messages(&records[0].1, ProtocolVersion::TLS1_2);
    let Message::ServerHello(sh) = &messages[0] else {
        panic!("expected ServerHello, got {:?}", messages);
    };
    assert_eq!(sh.cipher_suite, CipherSuite::RSA_AES128_GCM_SHA256);
    assert_ne!(&sh.random[24..], &DOWNGRADE_TLS12);
}

fn assert_fatal(records: &[(ContentType, Vec<u8>)], description: AlertDescription) {
    assert_eq!(records.len(), 1, "{:?}", records);
    assert_eq!(records[0].0, ContentType::Alert);
    let mut expected = Buf::new();
    Alert::fatal(description).serialize(&mut timpl::codec::Writer::new(&mut expected));
    assert_eq!(records[0].1, expected.into_vec());
}

#[test]
fn no_common_cipher_suite_is_handshake_failure() {
    let _ = env_logger::try_init();
    let mut server = server(Config::builder().build().unwrap());
    let hello = client_hello(&[CipherSuite::Unknown(0xC030)], tls12_extensions());

    assert!(server.handle_input(&hello).is_err());
    assert_fatal(&plaintext_records(&mut server), AlertDescription::HandshakeFailure);
    assert!(server.is_closed());
}

#[test]
fn tls13_only_client_against_tls12_server() {
    let _ = env_logger::try_init();
    let mut server = server(Config::builder().enable_tls13(false).build().unwrap());
    let hello = client_hello(
        &[CipherSuite::TLS13_AES_128_GCM_SHA256],
        tls13_extensions(&[NamedGroup::X25519], &[NamedGroup::X25519]),
    );

    assert!(server.handle_input(&hello).is_err());
    assert_fatal(&plaintext_records(&mut server), AlertDescription::ProtocolVersion);
}

#[test]
fn oversized_record_is_record_overflow() {
    let _ = env_logger::try_init();
    let mut server = server(Config::builder().build().unwrap());
    let mut record = vec![22, 3, 3];
    record.extend_from_slice(&(16384u16 + 2049).to_be_bytes());

    assert!(server.handle_input(&record).is_err());
    assert_fatal(&plaintext_records(&mut server), AlertDescription::RecordOverflow);
}
