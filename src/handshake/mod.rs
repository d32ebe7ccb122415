// TLS Server Handshake Flows
//
// TLS 1.2 (RFC 5246):
// 1. ClientHello
//    - Version, suite, group and signature scheme are chosen (see negotiate.rs)
// 2. Server sends ServerHello, Certificate, [ServerKeyExchange], ServerHelloDone
// 3. ClientKeyExchange
//    - Premaster secret from ECDHE or RSA decryption, master secret, key block
// 4. Client ChangeCipherSpec installs the client write keys for reading
// 5. Client Finished is verified
// 6. Server sends ChangeCipherSpec and Finished, handshake complete
//
// TLS 1.3 (RFC 8446):
// 1. ClientHello
//    - No key share for any of our groups: one HelloRetryRequest, then a
//      second ClientHello that must carry the requested share
// 2. Server sends ServerHello, derives the handshake secrets
// 3. Server sends EncryptedExtensions, Certificate, CertificateVerify and
//    Finished under the handshake keys, derives the application secrets
// 4. Client Finished (under the client handshake keys) is verified,
//    handshake complete
// 5. KeyUpdate may rotate either direction afterwards
//
// The machine is sans-IO. The connection decodes records into events, calls
// State::handle_event, and applies the returned effects in order.

mod negotiate;
mod tls12;
mod tls13;

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use log::{debug, trace};

use crate::buffer::Buf;
use crate::certificate::Identity;
use crate::crypto::{ActiveKeyExchange, CryptoProvider, Transcript};
use crate::message::{Alert, Message};
use crate::record::Protection;
use crate::rng::SeededRng;
use crate::suites::CipherSuiteDescriptor;
use crate::types::{AlertDescription, CipherSuite, NamedGroup, ProtocolVersion};
use crate::{Config, Error};

use negotiate::Negotiation;

/// Input to the state machine.
#[derive(Debug)]
pub enum Event {
    /// One complete handshake message and its exact bytes, header included.
    Handshake(Message, Vec<u8>),
    /// A ChangeCipherSpec record.
    ChangeCipherSpec,
}

/// Output of the state machine, applied by the connection in order.
#[derive(Debug)]
pub enum Effect {
    /// Encoded handshake message.
    SendHandshake(Vec<u8>),
    /// A ChangeCipherSpec record under the current write protection.
    SendChangeCipherSpec,
    SendAlert(Alert),
    SetReadProtection(Protection),
    SetWriteProtection(Protection),
    /// The protocol version is fixed from here on.
    VersionNegotiated(ProtocolVersion),
    HandshakeComplete,
}

/// Everything the handshake carries between states that is not
/// state-specific key material.
pub struct HandshakeContext {
    config: Arc<Config>,
    identity: Identity,
    transcript: Transcript,
    rng: SeededRng,
    version: Option<ProtocolVersion>,
    suite: Option<&'static CipherSuiteDescriptor>,
    group: Option<NamedGroup>,
    session_id: Vec<u8>,
    server_name: Option<String>,
    verified: bool,
    sent_change_cipher_spec: bool,
}

impl HandshakeContext {
    pub fn new(config: Arc<Config>, identity: Identity) -> Self {
        let rng = SeededRng::new(config.rng_seed());
        HandshakeContext {
            config,
            identity,
            transcript: Transcript::new(),
            rng,
            version: None,
            suite: None,
            group: None,
            session_id: Vec::new(),
            server_name: None,
            verified: false,
            sent_change_cipher_spec: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Negotiated version, once the ClientHello has been processed.
    pub fn version(&self) -> Option<ProtocolVersion> {
        self.version
    }

    pub fn cipher_suite(&self) -> Option<CipherSuite> {
        self.suite.map(|d| d.suite)
    }

    pub fn session_id(&self) -> &[u8] {
        &self.session_id
    }

    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    /// Whether the client Finished verify data matched.
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// Encode a handshake message, add it to the transcript and queue it.
    fn send(&mut self, message: &Message, effects: &mut Vec<Effect>) {
        let mut buf = Buf::new();
        message.encode(&mut buf);
        self.transcript.append(&buf);
        trace!("Send {:?} ({} bytes)", message.handshake_type(), buf.len());
        effects.push(Effect::SendHandshake(buf.into_vec()));
    }

    fn transcript_hash(&self, provider: &CryptoProvider, suite: &CipherSuiteDescriptor) -> Buf {
        self.transcript.hash(provider, suite.hash)
    }

    fn start_exchange(&self, group: NamedGroup) -> Result<Box<dyn ActiveKeyExchange>, Error> {
        self.config
            .crypto_provider()
            .find_kx_group(group)
            .ok_or(Error::UnsupportedGroup)?
            .start_exchange()
            .map_err(Error::CryptoError)
    }
}

impl fmt::Debug for HandshakeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeContext")
            .field("version", &self.version)
            .field("suite", &self.cipher_suite())
            .field("group", &self.group)
            .field("verified", &self.verified)
            .finish()
    }
}

/// Key material that is wiped when dropped.
struct Secret(Buf);

impl From<Buf> for Secret {
    fn from(buf: Buf) -> Self {
        Secret(buf)
    }
}

impl Deref for Secret {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Send the TLS 1.3 middlebox compatibility ChangeCipherSpec, at most once
/// and only when the client sent a legacy session id.
fn middlebox_change_cipher_spec(ctx: &mut HandshakeContext, effects: &mut Vec<Effect>) {
    if ctx.session_id.is_empty() || ctx.sent_change_cipher_spec {
        return;
    }
    ctx.sent_change_cipher_spec = true;
    effects.push(Effect::SendChangeCipherSpec);
}

/// Complete the key exchange and reject an all-zero shared secret.
fn complete_exchange(kx: Box<dyn ActiveKeyExchange>, peer: &[u8]) -> Result<Buf, Error> {
    let mut shared = Buf::new();
    kx.complete(peer, &mut shared)
        .map_err(Error::KeyExchangeFailure)?;
    if shared.iter().all(|b| *b == 0) {
        return Err(Error::KeyExchangeFailure("all-zero shared secret".into()));
    }
    Ok(shared)
}

/// Server handshake state.
pub enum State {
    AwaitClientHello,
    /// HelloRetryRequest sent; the next ClientHello must carry the share.
    AwaitRetryClientHello(Box<tls13::Retry>),
    AwaitClientKeyExchange(Box<tls12::Pending>),
    AwaitChangeCipherSpec(Box<tls12::Keys>),
    AwaitFinished12(Box<tls12::Keys>),
    AwaitFinished13(Box<tls13::Pending>),
    Tls12Connected,
    Tls13Connected(Box<tls13::Traffic>),
}

impl State {
    pub fn new() -> Self {
        State::AwaitClientHello
    }

    pub fn name(&self) -> &'static str {
        match self {
            State::AwaitClientHello => "AwaitClientHello",
            State::AwaitRetryClientHello(_) => "AwaitRetryClientHello",
            State::AwaitClientKeyExchange(_) => "AwaitClientKeyExchange",
            State::AwaitChangeCipherSpec(_) => "AwaitChangeCipherSpec",
            State::AwaitFinished12(_) => "AwaitFinished12",
            State::AwaitFinished13(_) => "AwaitFinished13",
            State::Tls12Connected => "Tls12Connected",
            State::Tls13Connected(_) => "Tls13Connected",
        }
    }

    /// Advance the handshake by one event.
    ///
    /// Effects are pushed in the order they must be applied. An `Err` leaves
    /// the connection unusable; the caller sends the matching alert.
    pub fn handle_event(
        self,
        ctx: &mut HandshakeContext,
        event: Event,
        effects: &mut Vec<Effect>,
    ) -> Result<State, Error> {
        let prev = self.name();

        let next = match (self, event) {
            (State::AwaitClientHello, Event::Handshake(Message::ClientHello(ch), raw)) => {
                ctx.server_name = ch.server_name()?;
                match negotiate::negotiate(ctx, &ch)? {
                    Negotiation::Tls13 {
                        suite,
                        group,
                        client_share,
                        scheme,
                    } => tls13::start(ctx, &ch, &raw, suite, group, &client_share, scheme, effects)?,
                    Negotiation::Retry { suite, group } => {
                        tls13::retry(ctx, &ch, &raw, suite, group, effects)?
                    }
                    Negotiation::Tls12 {
                        suite,
                        group,
                        scheme,
                    } => tls12::start(ctx, &ch, &raw, suite, group, scheme, effects)?,
                }
            }

            (State::AwaitRetryClientHello(retry), Event::Handshake(Message::ClientHello(ch), raw)) => {
                tls13::retry_client_hello(ctx, *retry, &ch, &raw, effects)?
            }

            (
                State::AwaitClientKeyExchange(pending),
                Event::Handshake(Message::ClientKeyExchange(cke), raw),
            ) => tls12::client_key_exchange(ctx, *pending, &cke, &raw)?,

            (State::AwaitChangeCipherSpec(keys), Event::ChangeCipherSpec) => {
                tls12::change_cipher_spec(keys, effects)?
            }

            (State::AwaitFinished12(keys), Event::Handshake(Message::Finished(finished), raw)) => {
                tls12::client_finished(ctx, keys, &finished, &raw, effects)?
            }

            (State::AwaitFinished13(pending), Event::Handshake(Message::Finished(finished), raw)) => {
                tls13::client_finished(ctx, *pending, &finished, &raw, effects)?
            }

            (State::Tls13Connected(traffic), Event::Handshake(Message::KeyUpdate(update), _)) => {
                tls13::key_update(ctx, traffic, update, effects)?
            }

            (State::Tls12Connected, Event::Handshake(Message::ClientHello(_), _)) => {
                debug!("Refusing renegotiation");
                effects.push(Effect::SendAlert(Alert::warning(
                    AlertDescription::NoRenegotiation,
                )));
                State::Tls12Connected
            }

            // Middlebox compatibility (RFC 8446 Appendix D.4).
            (
                state @ (State::AwaitRetryClientHello(_) | State::AwaitFinished13(_)),
                Event::ChangeCipherSpec,
            ) => {
                debug!("Dropping ChangeCipherSpec in {}", state.name());
                state
            }

            (state, Event::ChangeCipherSpec) => {
                return Err(Error::UnexpectedMessage(format!(
                    "ChangeCipherSpec in {}",
                    state.name()
                )))
            }

            (state, Event::Handshake(message, _)) => {
                return Err(Error::UnexpectedMessage(format!(
                    "{:?} in {}",
                    message.handshake_type(),
                    state.name()
                )))
            }
        };

        if next.name() != prev {
            trace!("{} -> {}", prev, next.name());
        }
        Ok(next)
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
