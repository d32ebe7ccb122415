//! Sans-IO server connection.
//!
//! A [`Connection`] never touches a socket. Bytes read from the transport go
//! into [`Connection::handle_input`], and everything the connection wants to
//! happen comes out of [`Connection::poll_output`]: bytes to write, handshake
//! completion, decrypted application data and teardown. The caller loops on
//! `poll_output` until it returns [`Output::Timeout`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::buffer::Buf;
use crate::certificate::Identity;
use crate::codec::{Reader, Writer};
use crate::handshake::{Effect, Event, HandshakeContext, State};
use crate::message::{Alert, Message, HANDSHAKE_HEADER_LEN};
use crate::record::{Deframer, RecordLayer, MAX_CIPHERTEXT_TLS13};
use crate::types::{AlertDescription, AlertLevel, CipherSuite, ContentType, ProtocolVersion};
use crate::{Config, Error};

/// Largest handshake message we are willing to buffer.
const MAX_HANDSHAKE_MESSAGE_LEN: usize = 1 << 16;

/// How far ahead `poll_output` points once there is no handshake deadline.
const IDLE_TIMEOUT: Duration = Duration::from_secs(3600);

/// What the connection wants the caller to do next.
#[derive(Debug, PartialEq, Eq)]
pub enum Output {
    /// Write these bytes to the transport.
    Transmit(Vec<u8>),
    /// The handshake completed.
    Connected,
    /// Decrypted application data from the peer.
    ApplicationData(Vec<u8>),
    /// The connection is finished. Transmit anything polled before this,
    /// then drop the transport.
    Closed,
    /// Nothing more to do until new input or this instant, whichever comes
    /// first. Call [`Connection::handle_timeout`] when it passes.
    Timeout(Instant),
}

/// One TLS server connection.
pub struct Connection {
    ctx: HandshakeContext,
    /// `None` after a failure or close.
    state: Option<State>,
    deframer: Deframer,
    records: RecordLayer,
    /// Received handshake bytes not yet forming a whole message.
    handshake_buf: Vec<u8>,
    /// Outgoing handshake messages, coalesced into as few records as possible.
    pending_handshake: Vec<u8>,
    /// Application data queued before the handshake completed.
    pending_app: VecDeque<Vec<u8>>,
    queue: VecDeque<Output>,
    now: Instant,
    deadline: Option<Instant>,
    connected: bool,
    closed: bool,
}

impl Connection {
    /// A connection waiting for a ClientHello.
    ///
    /// The handshake must complete within [`Config::handshake_timeout`] of
    /// `now`.
    pub fn new(config: Arc<Config>, identity: Identity, now: Instant) -> Self {
        let deadline = now + config.handshake_timeout();
        Connection {
            ctx: HandshakeContext::new(config, identity),
            state: Some(State::new()),
            deframer: Deframer::new(),
            records: RecordLayer::new(),
            handshake_buf: Vec::new(),
            pending_handshake: Vec::new(),
            pending_app: VecDeque::new(),
            queue: VecDeque::new(),
            now,
            deadline: Some(deadline),
            connected: false,
            closed: false,
        }
    }

    /// Feed bytes read from the transport.
    ///
    /// On error the connection has already queued the fatal alert (when the
    /// error has one) and [`Output::Closed`]; the error is returned for
    /// logging.
    pub fn handle_input(&mut self, data: &[u8]) -> Result<(), Error> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }
        self.deframer.push(data);

        let result = self.process_records();
        if let Err(e) = &result {
            self.fail(e);
        }
        result
    }

    pub fn poll_output(&mut self) -> Output {
        if let Some(output) = self.queue.pop_front() {
            return output;
        }
        Output::Timeout(self.deadline.unwrap_or(self.now + IDLE_TIMEOUT))
    }

    /// Send application data.
    ///
    /// Data sent before the handshake completes is held back and flushed on
    /// completion.
    pub fn send_application_data(&mut self, data: &[u8]) -> Result<(), Error> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }
        if data.is_empty() {
            return Ok(());
        }
        if !self.connected {
            self.pending_app.push_back(data.to_vec());
            return Ok(());
        }

        let result = self.seal(ContentType::ApplicationData, data);
        if let Err(e) = &result {
            self.fail(e);
        }
        result
    }

    /// Send close_notify and tear down. Calling it again does nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        debug!("Closing connection");
        self.pending_handshake.clear();
        if let Err(e) = self.send_alert(Alert::warning(AlertDescription::CloseNotify)) {
            debug!("Failed to send close_notify: {}", e);
        }
        self.teardown();
    }

    /// Advance time. Past the handshake deadline this fails the connection
    /// with a `handshake_failure` alert.
    pub fn handle_timeout(&mut self, now: Instant) -> Result<(), Error> {
        self.now = now;
        if self.closed {
            return Ok(());
        }
        match self.deadline {
            Some(deadline) if now >= deadline => {
                warn!("Handshake not complete after {:?}", self.ctx.config().handshake_timeout());
                let e = Error::Timeout;
                self.fail(&e);
                Err(e)
            }
            _ => Ok(()),
        }
    }

    pub fn is_handshake_complete(&self) -> bool {
        self.connected
    }

    /// Whether the client Finished verify data matched ours.
    pub fn is_verified(&self) -> bool {
        self.ctx.is_verified()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn negotiated_version(&self) -> Option<ProtocolVersion> {
        self.ctx.version()
    }

    pub fn cipher_suite(&self) -> Option<CipherSuite> {
        self.ctx.cipher_suite()
    }

    pub fn session_id(&self) -> &[u8] {
        self.ctx.session_id()
    }

    /// SNI host name sent by the client.
    pub fn server_name(&self) -> Option<&str> {
        self.ctx.server_name()
    }

    // ========================================================================
    // Incoming
    // ========================================================================

    fn process_records(&mut self) -> Result<(), Error> {
        while let Some(record) = self.deframer.next_record()? {
            if self.closed {
                break;
            }
            let (content_type, plaintext) = self.records.open(record)?;
            trace!("Record {:?} ({} bytes)", content_type, plaintext.len());

            // RFC 8446 Section 5.1: handshake messages are not interleaved
            // with other record types.
            if content_type != ContentType::Handshake && !self.handshake_buf.is_empty() {
                return Err(Error::UnexpectedMessage(format!(
                    "{:?} inside a fragmented handshake message",
                    content_type
                )));
            }

            match content_type {
                ContentType::Handshake => {
                    if plaintext.is_empty() {
                        return Err(Error::UnexpectedMessage("empty handshake record".into()));
                    }
                    self.handshake_buf.extend_from_slice(&plaintext);
                    self.process_handshake()?;
                }
                ContentType::ChangeCipherSpec => {
                    if plaintext != [1] {
                        return Err(Error::MalformedMessage("ChangeCipherSpec".into()));
                    }
                    self.step(Event::ChangeCipherSpec)?;
                }
                ContentType::Alert => {
                    if plaintext.is_empty() {
                        return Err(Error::UnexpectedMessage("empty alert record".into()));
                    }
                    self.process_alert(&plaintext)?;
                }
                ContentType::ApplicationData => {
                    if !self.connected {
                        return Err(Error::UnexpectedMessage(
                            "application data before handshake completed".into(),
                        ));
                    }
                    if !plaintext.is_empty() {
                        self.queue.push_back(Output::ApplicationData(plaintext));
                    }
                }
                ContentType::Unknown(v) => {
                    return Err(Error::UnexpectedMessage(format!("content type {}", v)));
                }
            }
        }
        Ok(())
    }

    /// Hand every complete buffered handshake message to the state machine.
    fn process_handshake(&mut self) -> Result<(), Error> {
        while self.handshake_buf.len() >= HANDSHAKE_HEADER_LEN {
            let mut r = Reader::new(&self.handshake_buf[1..HANDSHAKE_HEADER_LEN]);
            let len = r.read_u24()? as usize;
            if len > MAX_HANDSHAKE_MESSAGE_LEN {
                return Err(Error::MalformedMessage(format!(
                    "handshake message of {} bytes",
                    len
                )));
            }
            if self.handshake_buf.len() < HANDSHAKE_HEADER_LEN + len {
                break;
            }

            let raw: Vec<u8> = self
                .handshake_buf
                .drain(..HANDSHAKE_HEADER_LEN + len)
                .collect();
            let version = self.ctx.version().unwrap_or(ProtocolVersion::TLS1_2);
            let message = Message::decode_versioned(ContentType::Handshake, &raw, version)?;
            trace!("Received {:?}", message.handshake_type());

            self.step(Event::Handshake(message, raw))?;
            if self.closed {
                break;
            }
        }
        Ok(())
    }

    fn process_alert(&mut self, data: &[u8]) -> Result<(), Error> {
        let alert = Alert::parse(&mut Reader::new(data))?;

        if alert.description == AlertDescription::CloseNotify {
            debug!("Peer sent close_notify");
            self.close();
            return Ok(());
        }

        // RFC 8446 Section 6: in TLS 1.3 only user_canceled may be a warning.
        let tls13 = self.ctx.version() == Some(ProtocolVersion::TLS1_3);
        let fatal = alert.level == AlertLevel::Fatal
            || (tls13 && alert.description != AlertDescription::UserCanceled);
        if fatal {
            return Err(Error::PeerAlert(alert.description));
        }

        debug!("Ignoring warning alert {:?}", alert.description);
        Ok(())
    }

    /// Run one event through the state machine and apply its effects.
    fn step(&mut self, event: Event) -> Result<(), Error> {
        let state = self.state.take().ok_or(Error::ConnectionClosed)?;
        let mut effects = Vec::new();
        let next = state.handle_event(&mut self.ctx, event, &mut effects)?;
        self.state = Some(next);
        self.apply_effects(effects)
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) -> Result<(), Error> {
        for effect in effects {
            if !matches!(effect, Effect::SendHandshake(_)) {
                self.flush_handshake()?;
            }
            match effect {
                Effect::SendHandshake(bytes) => {
                    self.pending_handshake.extend_from_slice(&bytes);
                }
                Effect::SendChangeCipherSpec => {
                    let mut out = Buf::new();
                    self.records
                        .seal_plain(ContentType::ChangeCipherSpec, &[1], &mut out);
                    self.transmit(out);
                }
                Effect::SendAlert(alert) => self.send_alert(alert)?,
                Effect::SetReadProtection(protection) => {
                    // RFC 8446 Section 5.1: a key change must fall on a
                    // record boundary.
                    if !self.handshake_buf.is_empty() {
                        return Err(Error::UnexpectedMessage(
                            "handshake data across a key change".into(),
                        ));
                    }
                    self.records.set_read_protection(protection);
                }
                Effect::SetWriteProtection(protection) => {
                    self.records.set_write_protection(protection);
                }
                Effect::VersionNegotiated(version) => {
                    debug!("Negotiated {}", version);
                    if version == ProtocolVersion::TLS1_3 {
                        self.deframer.set_max_payload(MAX_CIPHERTEXT_TLS13);
                    }
                }
                Effect::HandshakeComplete => {
                    self.connected = true;
                    self.deadline = None;
                    self.queue.push_back(Output::Connected);
                    while let Some(data) = self.pending_app.pop_front() {
                        self.seal(ContentType::ApplicationData, &data)?;
                    }
                }
            }
        }
        self.flush_handshake()
    }

    // ========================================================================
    // Outgoing
    // ========================================================================

    fn flush_handshake(&mut self) -> Result<(), Error> {
        if self.pending_handshake.is_empty() {
            return Ok(());
        }
        let data = std::mem::take(&mut self.pending_handshake);
        self.seal(ContentType::Handshake, &data)
    }

    fn seal(&mut self, content_type: ContentType, data: &[u8]) -> Result<(), Error> {
        let mut out = Buf::new();
        let max_fragment = self.ctx.config().max_fragment_len();
        self.records.seal(content_type, data, max_fragment, &mut out)?;
        self.transmit(out);
        Ok(())
    }

    fn send_alert(&mut self, alert: Alert) -> Result<(), Error> {
        debug!("Sending {:?} alert {:?}", alert.level, alert.description);
        let mut body = Buf::new();
        alert.serialize(&mut Writer::new(&mut body));
        self.seal(ContentType::Alert, &body)
    }

    /// Append to the last queued transmit, so one flight is one write.
    fn transmit(&mut self, out: Buf) {
        if out.is_empty() {
            return;
        }
        if let Some(Output::Transmit(last)) = self.queue.back_mut() {
            last.extend_from_slice(&out);
        } else {
            self.queue.push_back(Output::Transmit(out.into_vec()));
        }
    }

    /// Send the matching fatal alert for `err`, then tear down.
    fn fail(&mut self, err: &Error) {
        if self.closed {
            return;
        }
        debug!("Connection failed: {}", err);
        self.pending_handshake.clear();
        if let Some(description) = err.alert() {
            if let Err(e) = self.send_alert(Alert::fatal(description)) {
                debug!("Failed to send alert: {}", e);
            }
        }
        self.teardown();
    }

    fn teardown(&mut self) {
        self.closed = true;
        self.state = None;
        self.deadline = None;
        self.pending_app.clear();
        self.queue.push_back(Output::Closed);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("ctx", &self.ctx)
            .field("connected", &self.connected)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_client::{pump, ClientOptions, TestClient};
    use crate::types::NamedGroup;

    const RSA_CERT: &str = include_str!("../tests/fixtures/rsa-cert.pem");
    const RSA_KEY: &str = include_str!("../tests/fixtures/rsa-key.pem");
    const EC_CERT: &str = include_str!("../tests/fixtures/ec-cert.pem");
    const EC_KEY: &str = include_str!("../tests/fixtures/ec-key.pem");

    fn server_with(config: Config, ecdsa: bool) -> Connection {
        let identity = if ecdsa {
            Identity::from_pem(EC_CERT, EC_KEY, &config).unwrap()
        } else {
            Identity::from_pem(RSA_CERT, RSA_KEY, &config).unwrap()
        };
        Connection::new(Arc::new(config), identity, Instant::now())
    }

    fn server() -> Connection {
        server_with(Config::builder().build().unwrap(), false)
    }

    fn connect(client: &mut TestClient, server: &mut Connection) -> Vec<Output> {
        client.start();
        let events = pump(client, server).unwrap();
        assert!(client.is_connected(), "client not connected: {:?}", client);
        assert!(server.is_handshake_complete());
        assert!(server.is_verified());
        events
    }

    fn round_trip(client: &mut TestClient, server: &mut Connection) {
        client.send_application_data(b"ping");
        let events = pump(client, server).unwrap();
        assert!(events.contains(&Output::ApplicationData(b"ping".to_vec())));

        server.send_application_data(b"pong").unwrap();
        pump(client, server).unwrap();
        assert_eq!(client.take_application_data(), b"pong");
    }

    #[test]
    fn tls12_ecdhe_rsa_aes128_gcm() {
        let _ = env_logger::try_init();
        let mut server = server();
        let mut client = TestClient::new(ClientOptions::tls12(&[
            CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
        ]));

        let events = connect(&mut client, &mut server);
        assert!(events.contains(&Output::Connected));
        assert_eq!(server.negotiated_version(), Some(ProtocolVersion::TLS1_2));
        assert_eq!(
            server.cipher_suite(),
            Some(CipherSuite::ECDHE_RSA_AES128_GCM_SHA256)
        );
        assert_eq!(server.session_id().len(), 32);
        round_trip(&mut client, &mut server);
    }

    #[test]
    fn tls12_every_suite() {
        let _ = env_logger::try_init();
        for suite in [
            CipherSuite::RSA_AES128_GCM_SHA256,
            CipherSuite::ECDHE_RSA_CHACHA20_POLY1305_SHA256,
            CipherSuite::ECDHE_RSA_AES128_CBC_SHA256,
            CipherSuite::RSA_AES128_CBC_SHA256,
            CipherSuite::RSA_AES256_CBC_SHA256,
        ] {
            for ems in [true, false] {
                let mut server = server();
                let mut options = ClientOptions::tls12(&[suite]);
                options.extended_master_secret = ems;
                let mut client = TestClient::new(options);
                connect(&mut client, &mut server);
                assert_eq!(server.cipher_suite(), Some(suite));
                assert_eq!(client.extended_master_secret(), ems);
                round_trip(&mut client, &mut server);
            }
        }
    }

    #[test]
    fn tls12_ecdsa_identity() {
        let _ = env_logger::try_init();
        let mut server = server_with(Config::builder().build().unwrap(), true);
        let mut client = TestClient::new(ClientOptions::tls12(&[
            CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
            CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256,
        ]));
        connect(&mut client, &mut server);
        assert_eq!(
            server.cipher_suite(),
            Some(CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256)
        );
        round_trip(&mut client, &mut server);
    }

    #[test]
    fn tls13_x25519_without_retry() {
        let _ = env_logger::try_init();
        let mut server = server();
        let mut client = TestClient::new(ClientOptions::tls13(&[NamedGroup::X25519]));

        connect(&mut client, &mut server);
        assert_eq!(client.retries(), 0);
        assert_eq!(server.negotiated_version(), Some(ProtocolVersion::TLS1_3));
        assert_eq!(
            server.cipher_suite(),
            Some(CipherSuite::TLS13_AES_128_GCM_SHA256)
        );
        round_trip(&mut client, &mut server);
    }

    #[test]
    fn tls13_every_suite_and_identity() {
        let _ = env_logger::try_init();
        for suite in [
            CipherSuite::TLS13_AES_128_GCM_SHA256,
            CipherSuite::TLS13_AES_256_GCM_SHA384,
            CipherSuite::TLS13_CHACHA20_POLY1305_SHA256,
        ] {
            for ecdsa in [false, true] {
                let mut server = server_with(Config::builder().build().unwrap(), ecdsa);
                let mut options = ClientOptions::tls13(&[NamedGroup::Secp256r1]);
                options.cipher_suites = vec![suite];
                let mut client = TestClient::new(options);
                connect(&mut client, &mut server);
                assert_eq!(server.cipher_suite(), Some(suite));
                round_trip(&mut client, &mut server);
            }
        }
    }

    #[test]
    fn tls13_hello_retry_request_once() {
        let _ = env_logger::try_init();
        let mut server = server();
        // Shares nothing the server takes, but lists secp256r1 as supported.
        let mut options = ClientOptions::tls13(&[]);
        options.groups = vec![NamedGroup::Secp256r1];
        let mut client = TestClient::new(options);

        connect(&mut client, &mut server);
        assert_eq!(client.retries(), 1);
        assert_eq!(client.middlebox_change_cipher_specs(), 1);
        round_trip(&mut client, &mut server);
    }

    #[test]
    fn tls13_second_retry_is_refused() {
        let _ = env_logger::try_init();
        let mut server = server();
        let mut options = ClientOptions::tls13(&[]);
        options.groups = vec![NamedGroup::Secp256r1];
        options.ignore_retry_request = true;
        let mut client = TestClient::new(options);

        client.start();
        let err = pump(&mut client, &mut server).unwrap_err();
        assert!(matches!(err, Error::IllegalParameter(_)), "{:?}", err);
        assert_eq!(client.retries(), 1);
        assert_eq!(
            client.alerts(),
            &[Alert::fatal(AlertDescription::IllegalParameter)]
        );
        assert!(server.is_closed());
    }

    #[test]
    fn tls13_key_update() {
        let _ = env_logger::try_init();
        let mut server = server();
        let mut client = TestClient::new(ClientOptions::tls13(&[NamedGroup::X25519]));
        connect(&mut client, &mut server);

        client.send_key_update(true);
        pump(&mut client, &mut server).unwrap();
        assert_eq!(client.key_updates_received(), 1);
        round_trip(&mut client, &mut server);

        client.send_key_update(false);
        pump(&mut client, &mut server).unwrap();
        assert_eq!(client.key_updates_received(), 1);
        round_trip(&mut client, &mut server);
    }

    #[test]
    fn tampered_finished_fails_for_every_byte() {
        let _ = env_logger::try_init();
        for tls13 in [false, true] {
            for position in 0..12 {
                let mut server = server();
                let mut options = if tls13 {
                    ClientOptions::tls13(&[NamedGroup::X25519])
                } else {
                    ClientOptions::tls12(&[CipherSuite::ECDHE_RSA_AES128_GCM_SHA256])
                };
                options.corrupt_finished = Some(position);
                let mut client = TestClient::new(options);
                client.start();

                let err = pump(&mut client, &mut server).unwrap_err();
                assert!(matches!(err, Error::DecryptError), "{:?}", err);
                assert!(!server.is_verified());
                assert_eq!(
                    client.alerts(),
                    &[Alert::fatal(AlertDescription::DecryptError)]
                );
            }
        }
    }

    #[test]
    fn truncated_tag_gets_bad_record_mac_alert() {
        let _ = env_logger::try_init();
        for tls13 in [false, true] {
            let mut server = server();
            let options = if tls13 {
                ClientOptions::tls13(&[NamedGroup::X25519])
            } else {
                ClientOptions::tls12(&[CipherSuite::ECDHE_RSA_AES128_GCM_SHA256])
            };
            let mut client = TestClient::new(options);
            connect(&mut client, &mut server);

            client.send_application_data(b"hello");
            let mut record = client.take_output();
            // Drop the last tag byte and fix up the record length.
            record.pop();
            let len = u16::from_be_bytes([record[3], record[4]]) - 1;
            record[3..5].copy_from_slice(&len.to_be_bytes());

            let err = server.handle_input(&record).unwrap_err();
            assert!(matches!(err, Error::BadRecordMac));

            let mut alert = Vec::new();
            let mut closed = false;
            loop {
                match server.poll_output() {
                    Output::Transmit(b) => alert.extend_from_slice(&b),
                    Output::Closed => closed = true,
                    Output::Timeout(_) => break,
                    other => panic!("unexpected {:?}", other),
                }
            }
            assert!(closed);
            client.handle_input(&alert).unwrap();
            assert_eq!(
                client.alerts(),
                &[Alert::fatal(AlertDescription::BadRecordMac)]
            );
            assert!(server.handle_input(b"more").is_err());
        }
    }

    #[test]
    fn garbage_before_handshake() {
        let mut server = server();
        let err = server.handle_input(b"GET / HTTP/1.1\r\n\r\n").unwrap_err();
        assert!(matches!(err, Error::UnexpectedMessage(_)), "{:?}", err);
        assert!(matches!(server.poll_output(), Output::Transmit(_)));
        assert_eq!(server.poll_output(), Output::Closed);
    }

    #[test]
    fn handshake_deadline() {
        let _ = env_logger::try_init();
        let config = Config::builder()
            .handshake_timeout(Duration::from_secs(1))
            .build()
            .unwrap();
        let mut server = server_with(config, false);
        let Output::Timeout(deadline) = server.poll_output() else {
            panic!("expected timeout");
        };

        server.handle_timeout(deadline - Duration::from_millis(1)).unwrap();
        assert!(!server.is_closed());

        assert!(matches!(server.handle_timeout(deadline), Err(Error::Timeout)));
        let Output::Transmit(alert) = server.poll_output() else {
            panic!("expected alert");
        };
        // Plaintext fatal handshake_failure.
        assert_eq!(alert, vec![21, 3, 3, 0, 2, 2, 40]);
        assert_eq!(server.poll_output(), Output::Closed);
    }

    #[test]
    fn close_is_idempotent() {
        let _ = env_logger::try_init();
        let mut server = server();
        let mut client = TestClient::new(ClientOptions::tls13(&[NamedGroup::X25519]));
        connect(&mut client, &mut server);

        server.close();
        server.close();
        pump(&mut client, &mut server).unwrap();
        assert_eq!(
            client.alerts(),
            &[Alert::warning(AlertDescription::CloseNotify)]
        );
        assert!(matches!(
            server.send_application_data(b"late"),
            Err(Error::ConnectionClosed)
        ));
    }

    #[test]
    fn peer_close_notify_is_answered() {
        let _ = env_logger::try_init();
        let mut server = server();
        let mut client = TestClient::new(ClientOptions::tls12(&[
            CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
        ]));
        connect(&mut client, &mut server);

        client.send_alert(Alert::warning(AlertDescription::CloseNotify));
        let events = pump(&mut client, &mut server).unwrap();
        assert!(events.contains(&Output::Closed));
        assert_eq!(
            client.alerts(),
            &[Alert::warning(AlertDescription::CloseNotify)]
        );
    }

    #[test]
    fn warning_alerts_by_version() {
        let _ = env_logger::try_init();

        // TLS 1.2 warnings are logged and ignored.
        let mut server = server();
        let mut client = TestClient::new(ClientOptions::tls12(&[
            CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
        ]));
        connect(&mut client, &mut server);
        client.send_alert(Alert::warning(AlertDescription::NoRenegotiation));
        pump(&mut client, &mut server).unwrap();
        round_trip(&mut client, &mut server);

        // TLS 1.3 keeps user_canceled as a warning.
        let mut server = self::server();
        let mut client = TestClient::new(ClientOptions::tls13(&[NamedGroup::X25519]));
        connect(&mut client, &mut server);
        client.send_alert(Alert::warning(AlertDescription::UserCanceled));
        pump(&mut client, &mut server).unwrap();
        round_trip(&mut client, &mut server);

        // Any other TLS 1.3 alert ends the connection, whatever its level.
        client.send_alert(Alert::warning(AlertDescription::NoRenegotiation));
        let err = pump(&mut client, &mut server).unwrap_err();
        assert!(matches!(
            err,
            Error::PeerAlert(AlertDescription::NoRenegotiation)
        ));
        assert!(server.is_closed());
    }

    #[test]
    fn renegotiation_is_refused() {
        let _ = env_logger::try_init();
        let mut server = server();
        let mut client = TestClient::new(ClientOptions::tls12(&[
            CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
        ]));
        connect(&mut client, &mut server);

        client.send_client_hello_again();
        pump(&mut client, &mut server).unwrap();
        assert_eq!(
            client.alerts(),
            &[Alert::warning(AlertDescription::NoRenegotiation)]
        );
        round_trip(&mut client, &mut server);
    }

    #[test]
    fn application_data_before_connect_is_queued() {
        let _ = env_logger::try_init();
        let mut server = server();
        server.send_application_data(b"early").unwrap();

        let mut client = TestClient::new(ClientOptions::tls13(&[NamedGroup::X25519]));
        connect(&mut client, &mut server);
        assert_eq!(client.take_application_data(), b"early");
    }

    #[test]
    fn large_application_data_is_fragmented() {
        let _ = env_logger::try_init();
        let config = Config::builder().max_fragment_len(1000).build().unwrap();
        let mut server = server_with(config, false);
        let mut client = TestClient::new(ClientOptions::tls13(&[NamedGroup::X25519]));
        connect(&mut client, &mut server);

        let data = vec![0x5A; 4500];
        server.send_application_data(&data).unwrap();
        let Output::Transmit(wire) = server.poll_output() else {
            panic!("expected transmit");
        };
        client.handle_input(&wire).unwrap();
        assert_eq!(client.application_records_received(), 5);
        assert_eq!(client.take_application_data(), data);
    }
}
