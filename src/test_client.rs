//! Minimal TLS 1.2/1.3 client for driving the server in tests.
//!
//! Trusts whatever certificate it is shown, but checks the server's
//! signatures against the leaf key and both Finished messages.

use std::fmt;

use der::{Decode, Encode};
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use sha2::{Sha256, Sha384};
use signature::Verifier;
use x509_cert::Certificate as X509Certificate;

use crate::buffer::Buf;
use crate::codec::{Reader, Writer};
use crate::config::MAX_FRAGMENT_LEN;
use crate::connection::{Connection, Output};
use crate::crypto::prf::{self, Sender};
use crate::crypto::{rust_crypto, ActiveKeyExchange, CryptoProvider, KeySchedule};
use crate::crypto::Transcript;
use crate::message::extensions::{Extension, ExtensionType, KeyShareClientHello, KeyShareEntry};
use crate::message::extensions::{KeyShareServerHello, ServerNameExtension};
use crate::message::extensions::{SignatureAlgorithmsExtension, SupportedGroupsExtension};
use crate::message::extensions::{SupportedVersionsClientHello, SupportedVersionsServerHello};
use crate::message::{Alert, CertificateVerify, ClientHello, ClientKeyExchange, Finished};
use crate::message::{KeyUpdate, Message, ServerKeyExchange, HANDSHAKE_HEADER_LEN};
use crate::record::{Deframer, Protection, RecordLayer};
use crate::suites::CipherSuiteDescriptor;
use crate::types::{CipherSuite, ContentType, NamedGroup, ProtocolVersion, SignatureScheme};
use crate::Error;

/// What the client offers, plus fault injection knobs.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub tls13: bool,
    pub cipher_suites: Vec<CipherSuite>,
    pub groups: Vec<NamedGroup>,
    pub key_shares: Vec<NamedGroup>,
    pub schemes: Vec<SignatureScheme>,
    pub session_id: Vec<u8>,
    pub server_name: Option<String>,
    pub extended_master_secret: bool,
    /// Answer a HelloRetryRequest with an unchanged ClientHello.
    pub ignore_retry_request: bool,
    /// Flip one bit of our Finished verify data at this index.
    pub corrupt_finished: Option<usize>,
}

impl ClientOptions {
    pub fn tls12(suites: &[CipherSuite]) -> Self {
        ClientOptions {
            tls13: false,
            cipher_suites: suites.to_vec(),
            groups: vec![NamedGroup::X25519, NamedGroup::Secp256r1],
            key_shares: vec![],
            schemes: default_schemes(),
            session_id: vec![],
            server_name: Some("localhost".into()),
            extended_master_secret: true,
            ignore_retry_request: false,
            corrupt_finished: None,
        }
    }

    pub fn tls13(key_shares: &[NamedGroup]) -> Self {
        ClientOptions {
            tls13: true,
            cipher_suites: vec![
                CipherSuite::TLS13_AES_128_GCM_SHA256,
                CipherSuite::TLS13_AES_256_GCM_SHA384,
                CipherSuite::TLS13_CHACHA20_POLY1305_SHA256,
            ],
            groups: key_shares.to_vec(),
            key_shares: key_shares.to_vec(),
            schemes: default_schemes(),
            session_id: vec![0xC5; 32],
            server_name: Some("localhost".into()),
            extended_master_secret: false,
            ignore_retry_request: false,
            corrupt_finished: None,
        }
    }
}

fn default_schemes() -> Vec<SignatureScheme> {
    vec![
        SignatureScheme::RsaPssRsaeSha256,
        SignatureScheme::EcdsaSecp256r1Sha256,
        SignatureScheme::RsaPkcs1Sha256,
    ]
}

pub struct TestClient {
    opts: ClientOptions,
    provider: CryptoProvider,
    random: [u8; 32],
    transcript: Transcript,
    deframer: Deframer,
    records: RecordLayer,
    handshake_buf: Vec<u8>,
    out: Vec<u8>,
    shares: Vec<Box<dyn ActiveKeyExchange>>,

    version: Option<ProtocolVersion>,
    suite: Option<&'static CipherSuiteDescriptor>,
    server_random: [u8; 32],
    ems: bool,
    leaf: Option<Vec<u8>>,
    server_kx: Option<(NamedGroup, Vec<u8>)>,

    master_secret: Buf,
    pending_read: Option<Protection>,

    ks: Option<KeySchedule>,
    client_handshake: Buf,
    server_handshake: Buf,
    client_application: Buf,
    server_application: Buf,

    connected: bool,
    retries: usize,
    middlebox_ccs: usize,
    key_updates: usize,
    app_records: usize,
    app_data: Vec<u8>,
    alerts: Vec<Alert>,
}

impl TestClient {
    pub fn new(opts: ClientOptions) -> Self {
        let provider = rust_crypto::default_provider();
        let mut random = [0u8; 32];
        provider.random(&mut random).unwrap();
        TestClient {
            opts,
            provider,
            random,
            transcript: Transcript::new(),
            deframer: Deframer::new(),
            records: RecordLayer::new(),
            handshake_buf: Vec::new(),
            out: Vec::new(),
            shares: Vec::new(),
            version: None,
            suite: None,
            server_random: [0; 32],
            ems: false,
            leaf: None,
            server_kx: None,
            master_secret: Buf::new(),
            pending_read: None,
            ks: None,
            client_handshake: Buf::new(),
            server_handshake: Buf::new(),
            client_application: Buf::new(),
            server_application: Buf::new(),
            connected: false,
            retries: 0,
            middlebox_ccs: 0,
            key_updates: 0,
            app_records: 0,
            app_data: Vec::new(),
            alerts: Vec::new(),
        }
    }

    /// Queue the first ClientHello.
    pub fn start(&mut self) {
        for group in self.opts.key_shares.clone() {
            self.add_share(group);
        }
        let hello = self.client_hello();
        self.send_handshake(&hello, true);
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn extended_master_secret(&self) -> bool {
        self.ems
    }

    pub fn retries(&self) -> usize {
        self.retries
    }

    pub fn middlebox_change_cipher_specs(&self) -> usize {
        self.middlebox_ccs
    }

    pub fn key_updates_received(&self) -> usize {
        self.key_updates
    }

    pub fn application_records_received(&self) -> usize {
        self.app_records
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out)
    }

    pub fn take_application_data(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.app_data)
    }

    pub fn send_application_data(&mut self, data: &[u8]) {
        self.seal(ContentType::ApplicationData, data);
    }

    pub fn send_alert(&mut self, alert: Alert) {
        let mut body = Buf::new();
        alert.serialize(&mut Writer::new(&mut body));
        self.seal(ContentType::Alert, &body);
    }

    /// TLS 1.3 KeyUpdate, then switch our write keys.
    pub fn send_key_update(&mut self, update_requested: bool) {
        let message = Message::KeyUpdate(KeyUpdate { update_requested });
        self.send_handshake(&message, false);
        self.client_application = self.next_secret(&self.client_application);
        let write = self.tls13_protection(&self.client_application);
        self.records.set_write_protection(write);
    }

    /// A fresh ClientHello on an established connection.
    pub fn send_client_hello_again(&mut self) {
        let hello = self.client_hello();
        self.send_handshake(&hello, false);
    }

    pub fn handle_input(&mut self, data: &[u8]) -> Result<(), Error> {
        self.deframer.push(data);
        while let Some(record) = self.deframer.next_record()? {
            let (content_type, plaintext) = self.records.open(record)?;
            match content_type {
                ContentType::Handshake => {
                    self.handshake_buf.extend_from_slice(&plaintext);
                    self.process_handshake()?;
                }
                ContentType::ChangeCipherSpec => match self.pending_read.take() {
                    Some(read) => self.records.set_read_protection(read),
                    None => self.middlebox_ccs += 1,
                },
                ContentType::Alert => {
                    self.alerts.push(Alert::parse(&mut Reader::new(&plaintext))?);
                }
                ContentType::ApplicationData => {
                    self.app_records += 1;
                    self.app_data.extend_from_slice(&plaintext);
                }
                ContentType::Unknown(v) => {
                    return Err(Error::UnexpectedMessage(format!("content type {}", v)))
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Handshake
    // ========================================================================

    fn process_handshake(&mut self) -> Result<(), Error> {
        while self.handshake_buf.len() >= HANDSHAKE_HEADER_LEN {
            let len = Reader::new(&self.handshake_buf[1..4]).read_u24()? as usize;
            if self.handshake_buf.len() < HANDSHAKE_HEADER_LEN + len {
                break;
            }
            let raw: Vec<u8> = self
                .handshake_buf
                .drain(..HANDSHAKE_HEADER_LEN + len)
                .collect();
            let version = self.version.unwrap_or(ProtocolVersion::TLS1_2);
            let message = Message::decode_versioned(ContentType::Handshake, &raw, version)?;
            self.handle_message(message, &raw)?;
        }
        Ok(())
    }

    fn handle_message(&mut self, message: Message, raw: &[u8]) -> Result<(), Error> {
        match message {
            Message::HelloRetryRequest(hrr) => {
                self.retries += 1;
                let suite = descriptor(hrr.cipher_suite)?;
                self.transcript
                    .replace_with_message_hash(&self.provider, suite.hash);
                self.transcript.append(raw);
                if !self.opts.ignore_retry_request {
                    self.shares.clear();
                    self.opts.key_shares = vec![hrr.selected_group];
                    self.add_share(hrr.selected_group);
                }
                let hello = self.client_hello();
                self.send_handshake(&hello, true);
            }

            Message::ServerHello(sh) => {
                let suite = descriptor(sh.cipher_suite)?;
                self.suite = Some(suite);
                self.server_random = sh.random;
                self.transcript.append(raw);

                let selected = sh
                    .extension(ExtensionType::SupportedVersions)
                    .map(SupportedVersionsServerHello::parse)
                    .transpose()?
                    .map(|v| v.selected_version);

                if selected == Some(ProtocolVersion::TLS1_3) {
                    self.version = Some(ProtocolVersion::TLS1_3);
                    let ext = sh
                        .extension(ExtensionType::KeyShare)
                        .ok_or_else(|| Error::MalformedMessage("no key_share".into()))?;
                    let entry = KeyShareServerHello::parse(ext)?.entry;
                    let index = self
                        .shares
                        .iter()
                        .position(|kx| kx.group() == entry.group)
                        .ok_or(Error::UnsupportedGroup)?;
                    let kx = self.shares.remove(index);
                    let mut shared = Buf::new();
                    kx.complete(&entry.key_exchange, &mut shared)
                        .map_err(Error::KeyExchangeFailure)?;

                    let mut ks = KeySchedule::new(&self.provider, suite.hash)?;
                    let hash = self.transcript_hash();
                    let (c, s) = ks.derive_handshake_secrets(&shared, &hash)?;
                    self.client_handshake = c;
                    self.server_handshake = s;
                    self.ks = Some(ks);
                    let read = self.tls13_protection(&self.server_handshake);
                    self.records.set_read_protection(read);
                } else {
                    self.version = Some(ProtocolVersion::TLS1_2);
                    self.ems = sh
                        .extension(ExtensionType::ExtendedMasterSecret)
                        .is_some();
                }
            }

            Message::EncryptedExtensions(_) => self.transcript.append(raw),

            Message::Certificate(c) => {
                self.leaf = c.chain.first().cloned();
                self.transcript.append(raw);
            }

            Message::CertificateVerify(cv) => {
                let hash = self.transcript_hash();
                let content = CertificateVerify::server_signed_content(&hash);
                self.verify(cv.scheme, &content, &cv.signature)?;
                self.transcript.append(raw);
            }

            Message::ServerKeyExchange(ske) => {
                let message = ServerKeyExchange::signed_message(
                    &self.random,
                    &self.server_random,
                    ske.group,
                    &ske.public,
                );
                self.verify(ske.scheme, &message, &ske.signature)?;
                self.server_kx = Some((ske.group, ske.public));
                self.transcript.append(raw);
            }

            Message::ServerHelloDone => {
                self.transcript.append(raw);
                self.tls12_client_flight()?;
            }

            Message::Finished(finished) if self.version == Some(ProtocolVersion::TLS1_3) => {
                self.tls13_finished(&finished, raw)?;
            }

            Message::Finished(finished) => {
                let suite = self.suite()?;
                let hash = self.transcript_hash();
                let expected = prf::verify_data(
                    &self.provider,
                    suite.hash,
                    &self.master_secret,
                    Sender::Server,
                    &hash,
                )?;
                if expected[..] != finished.verify_data[..] {
                    return Err(Error::DecryptError);
                }
                self.transcript.append(raw);
                self.connected = true;
            }

            Message::KeyUpdate(update) => {
                self.key_updates += 1;
                self.server_application = self.next_secret(&self.server_application);
                let read = self.tls13_protection(&self.server_application);
                self.records.set_read_protection(read);
                if update.update_requested {
                    self.send_key_update(false);
                }
            }

            other => {
                return Err(Error::UnexpectedMessage(format!(
                    "client got {:?}",
                    other.handshake_type()
                )))
            }
        }
        Ok(())
    }

    fn tls12_client_flight(&mut self) -> Result<(), Error> {
        let suite = self.suite()?;

        let (message, mut premaster) = match self.server_kx.take() {
            Some((group, public)) => {
                let kx = self
                    .provider
                    .find_kx_group(group)
                    .ok_or(Error::UnsupportedGroup)?
                    .start_exchange()
                    .map_err(Error::CryptoError)?;
                let ours = kx.pub_key().to_vec();
                let mut shared = Buf::new();
                kx.complete(&public, &mut shared)
                    .map_err(Error::KeyExchangeFailure)?;
                (ClientKeyExchange::ecdhe(&ours), shared)
            }
            None => {
                let mut premaster = Buf::from_slice(&[0x03, 0x03]);
                let mut rest = [0u8; 46];
                self.provider.random(&mut rest)?;
                premaster.extend_from_slice(&rest);
                let encrypted = self.leaf_rsa_key()?
                    .encrypt(&mut rand::thread_rng(), rsa::Pkcs1v15Encrypt, &premaster)
                    .map_err(|e| Error::CryptoError(e.to_string()))?;
                (ClientKeyExchange::rsa(&encrypted), premaster)
            }
        };
        self.send_handshake(&Message::ClientKeyExchange(message), true);

        self.master_secret = if self.ems {
            let hash = self.transcript_hash();
            prf::extended_master_secret(&self.provider, suite.hash, &premaster, &hash)?
        } else {
            prf::master_secret(
                &self.provider,
                suite.hash,
                &premaster,
                &self.random,
                &self.server_random,
            )?
        };
        premaster.zeroize();

        let kb = prf::key_block(
            &self.provider,
            suite,
            &self.master_secret,
            &self.random,
            &self.server_random,
        )?;
        let write = Protection::tls12(
            &self.provider,
            suite,
            &kb.client_key,
            &kb.client_iv,
            &kb.client_mac_key,
        )?;
        self.pending_read = Some(Protection::tls12(
            &self.provider,
            suite,
            &kb.server_key,
            &kb.server_iv,
            &kb.server_mac_key,
        )?);

        self.send_change_cipher_spec();
        self.records.set_write_protection(write);

        let hash = self.transcript_hash();
        let mut verify_data = prf::verify_data(
            &self.provider,
            suite.hash,
            &self.master_secret,
            Sender::Client,
            &hash,
        )?
        .to_vec();
        self.corrupt(&mut verify_data);
        self.send_handshake(&Message::Finished(Finished { verify_data }), true);
        Ok(())
    }

    fn tls13_finished(&mut self, finished: &Finished, raw: &[u8]) -> Result<(), Error> {
        let hash = self.transcript_hash();
        let expected = self
            .key_schedule()?
            .finished_verify_data(&self.server_handshake, &hash)?;
        if expected[..] != finished.verify_data[..] {
            return Err(Error::DecryptError);
        }
        self.transcript.append(raw);

        let hash = self.transcript_hash();
        let (c, s) = self
            .ks
            .as_mut()
            .ok_or(Error::ConnectionClosed)?
            .derive_application_secrets(&hash)?;
        self.client_application = c;
        self.server_application = s;

        if !self.opts.session_id.is_empty() {
            self.send_change_cipher_spec();
        }
        let write = self.tls13_protection(&self.client_handshake);
        self.records.set_write_protection(write);

        let mut verify_data = self
            .key_schedule()?
            .finished_verify_data(&self.client_handshake, &hash)?
            .to_vec();
        self.corrupt(&mut verify_data);
        self.send_handshake(&Message::Finished(Finished { verify_data }), true);

        let write = self.tls13_protection(&self.client_application);
        self.records.set_write_protection(write);
        let read = self.tls13_protection(&self.server_application);
        self.records.set_read_protection(read);
        self.connected = true;
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn client_hello(&self) -> Message {
        let o = &self.opts;
        let mut extensions = Vec::new();

        if o.tls13 {
            extensions.push(
                SupportedVersionsClientHello {
                    versions: vec![ProtocolVersion::TLS1_3, ProtocolVersion::TLS1_2],
                }
                .to_extension(),
            );
            extensions.push(
                KeyShareClientHello {
                    entries: self
                        .shares
                        .iter()
                        .map(|kx| KeyShareEntry {
                            group: kx.group(),
                            key_exchange: kx.pub_key().to_vec(),
                        })
                        .collect(),
                }
                .to_extension(),
            );
        } else {
            extensions.push(Extension::uncompressed_point_format());
        }
        if !o.groups.is_empty() {
            extensions.push(
                SupportedGroupsExtension {
                    groups: o.groups.clone(),
                }
                .to_extension(),
            );
        }
        extensions.push(
            SignatureAlgorithmsExtension {
                schemes: o.schemes.clone(),
            }
            .to_extension(),
        );
        if o.extended_master_secret {
            extensions.push(Extension::empty(ExtensionType::ExtendedMasterSecret));
        }
        if let Some(name) = &o.server_name {
            extensions.push(
                ServerNameExtension {
                    host_name: Some(name.clone()),
                }
                .to_extension(),
            );
        }
        extensions.push(Extension::empty_renegotiation_info());

        Message::ClientHello(ClientHello {
            legacy_version: ProtocolVersion::TLS1_2,
            random: self.random,
            session_id: o.session_id.clone(),
            cipher_suites: o.cipher_suites.clone(),
            compression_methods: vec![0],
            extensions,
        })
    }

    fn add_share(&mut self, group: NamedGroup) {
        let kx = self
            .provider
            .find_kx_group(group)
            .expect("group in provider")
            .start_exchange()
            .expect("start exchange");
        self.shares.push(kx);
    }

    fn send_handshake(&mut self, message: &Message, transcript: bool) {
        let mut buf = Buf::new();
        message.encode(&mut buf);
        if transcript {
            self.transcript.append(&buf);
        }
        self.seal(ContentType::Handshake, &buf);
    }

    fn send_change_cipher_spec(&mut self) {
        let mut out = Buf::new();
        self.records
            .seal_plain(ContentType::ChangeCipherSpec, &[1], &mut out);
        self.out.extend_from_slice(&out);
    }

    fn seal(&mut self, content_type: ContentType, data: &[u8]) {
        let mut out = Buf::new();
        self.records
            .seal(content_type, data, MAX_FRAGMENT_LEN, &mut out)
            .expect("seal");
        self.out.extend_from_slice(&out);
    }

    fn corrupt(&self, verify_data: &mut [u8]) {
        if let Some(i) = self.opts.corrupt_finished {
            verify_data[i] ^= 0x01;
        }
    }

    fn suite(&self) -> Result<&'static CipherSuiteDescriptor, Error> {
        self.suite
            .ok_or_else(|| Error::UnexpectedMessage("no ServerHello yet".into()))
    }

    fn key_schedule(&self) -> Result<&KeySchedule, Error> {
        self.ks
            .as_ref()
            .ok_or_else(|| Error::UnexpectedMessage("no TLS 1.3 key schedule".into()))
    }

    fn transcript_hash(&self) -> Buf {
        let hash = self.suite.map(|s| s.hash).unwrap_or(crate::types::HashAlgorithm::SHA256);
        self.transcript.hash(&self.provider, hash)
    }

    fn next_secret(&self, secret: &[u8]) -> Buf {
        self.ks
            .as_ref()
            .expect("key schedule")
            .next_traffic_secret(secret)
            .expect("next secret")
    }

    fn tls13_protection(&self, secret: &[u8]) -> Protection {
        let suite = self.suite.expect("suite");
        let ks = self.ks.as_ref().expect("key schedule");
        let (key, iv) = ks
            .derive_traffic_keys(secret, suite.key_len, suite.fixed_iv_len)
            .expect("traffic keys");
        Protection::tls13(&self.provider, suite, &key, &iv).expect("protection")
    }

    fn leaf(&self) -> Result<X509Certificate, Error> {
        let leaf = self
            .leaf
            .as_ref()
            .ok_or_else(|| Error::UnexpectedMessage("no Certificate yet".into()))?;
        X509Certificate::from_der(leaf)
            .map_err(|e| Error::InvalidCertificateData(e.to_string()))
    }

    fn leaf_spki(&self) -> Result<Vec<u8>, Error> {
        self.leaf()?
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| Error::InvalidCertificateData(e.to_string()))
    }

    fn leaf_rsa_key(&self) -> Result<RsaPublicKey, Error> {
        RsaPublicKey::from_public_key_der(&self.leaf_spki()?)
            .map_err(|e| Error::InvalidCertificateData(e.to_string()))
    }

    /// Check a server signature with the leaf public key.
    fn verify(&self, scheme: SignatureScheme, message: &[u8], sig: &[u8]) -> Result<(), Error> {
        let bad = |e: signature::Error| Error::HandshakeFailure(format!("bad signature: {}", e));
        match scheme {
            SignatureScheme::RsaPkcs1Sha256 => {
                let key = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(self.leaf_rsa_key()?);
                let sig = rsa::pkcs1v15::Signature::try_from(sig).map_err(bad)?;
                key.verify(message, &sig).map_err(bad)
            }
            SignatureScheme::RsaPssRsaeSha256 => {
                let key = rsa::pss::VerifyingKey::<Sha256>::new(self.leaf_rsa_key()?);
                let sig = rsa::pss::Signature::try_from(sig).map_err(bad)?;
                key.verify(message, &sig).map_err(bad)
            }
            SignatureScheme::RsaPssRsaeSha384 => {
                let key = rsa::pss::VerifyingKey::<Sha384>::new(self.leaf_rsa_key()?);
                let sig = rsa::pss::Signature::try_from(sig).map_err(bad)?;
                key.verify(message, &sig).map_err(bad)
            }
            SignatureScheme::EcdsaSecp256r1Sha256 => {
                let key = p256::ecdsa::VerifyingKey::from_public_key_der(&self.leaf_spki()?)
                    .map_err(|e| Error::InvalidCertificateData(e.to_string()))?;
                let sig = p256::ecdsa::DerSignature::try_from(sig).map_err(bad)?;
                key.verify(message, &sig).map_err(bad)
            }
            other => Err(Error::HandshakeFailure(format!(
                "client cannot verify {:?}",
                other
            ))),
        }
    }
}

fn descriptor(suite: CipherSuite) -> Result<&'static CipherSuiteDescriptor, Error> {
    suite.descriptor().ok_or(Error::UnsupportedCipherSuite)
}

impl fmt::Debug for TestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestClient")
            .field("version", &self.version)
            .field("suite", &self.suite.map(|s| s.suite))
            .field("connected", &self.connected)
            .field("retries", &self.retries)
            .field("alerts", &self.alerts)
            .finish()
    }
}

/// Shuttle bytes between client and server until neither has anything to
/// say. Returns the server's non-transmit outputs, or the first server error
/// after its alert has been delivered to the client.
pub fn pump(client: &mut TestClient, server: &mut Connection) -> Result<Vec<Output>, Error> {
    let mut events = Vec::new();
    let mut result = Ok(());

    for _ in 0..64 {
        let mut progressed = false;

        let to_server = client.take_output();
        if !to_server.is_empty() {
            progressed = true;
            if let Err(e) = server.handle_input(&to_server) {
                result = Err(e);
            }
        }

        loop {
            match server.poll_output() {
                Output::Transmit(bytes) => {
                    progressed = true;
                    client.handle_input(&bytes)?;
                }
                Output::Timeout(_) => break,
                other => events.push(other),
            }
        }

        if result.is_err() || !progressed {
            break;
        }
    }

    result.map(|_| events)
}
