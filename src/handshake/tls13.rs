use std::sync::Arc;

use log::debug;
use subtle::ConstantTimeEq;

use crate::buffer::Buf;
use crate::crypto::{CryptoProvider, KeySchedule};
use crate::message::extensions::{Extension, ExtensionType, KeyShareEntry};
use crate::message::extensions::{KeyShareServerHello, SupportedVersionsServerHello};
use crate::message::{Certificate, CertificateVerify, ClientHello, EncryptedExtensions};
use crate::message::{Finished, HelloRetryRequest, KeyUpdate, Message, ServerHello};
use crate::message::COMPRESSION_NULL;
use crate::record::Protection;
use crate::suites::CipherSuiteDescriptor;
use crate::types::{NamedGroup, ProtocolVersion, SignatureScheme};
use crate::Error;

use super::negotiate::{self, Negotiation};
use super::{complete_exchange, middlebox_change_cipher_spec};
use super::{Effect, HandshakeContext, Secret, State};

/// HelloRetryRequest parameters the second ClientHello must honour.
pub struct Retry {
    suite: &'static CipherSuiteDescriptor,
    group: NamedGroup,
}

/// Server flight sent, waiting for the client Finished.
pub struct Pending {
    ks: KeySchedule,
    suite: &'static CipherSuiteDescriptor,
    client_handshake: Secret,
    client_application: Secret,
    server_application: Secret,
}

/// Application traffic secrets, kept for KeyUpdate.
pub struct Traffic {
    ks: KeySchedule,
    suite: &'static CipherSuiteDescriptor,
    client_application: Secret,
    server_application: Secret,
}

/// Record protection for one direction from a traffic secret.
fn protection(
    provider: &CryptoProvider,
    ks: &KeySchedule,
    suite: &'static CipherSuiteDescriptor,
    secret: &[u8],
) -> Result<Protection, Error> {
    let (mut key, mut iv) = ks.derive_traffic_keys(secret, suite.key_len, suite.fixed_iv_len)?;
    let protection = Protection::tls13(provider, suite, &key, &iv);
    key.zeroize();
    iv.zeroize();
    protection
}

fn check_compression(hello: &ClientHello) -> Result<(), Error> {
    // RFC 8446 Section 4.1.2: exactly one byte, null.
    if hello.compression_methods != [COMPRESSION_NULL] {
        return Err(Error::IllegalParameter(
            "legacy_compression_methods must be null only".into(),
        ));
    }
    Ok(())
}

fn version_negotiated(ctx: &mut HandshakeContext, effects: &mut Vec<Effect>) {
    if ctx.version.is_none() {
        ctx.version = Some(ProtocolVersion::TLS1_3);
        effects.push(Effect::VersionNegotiated(ProtocolVersion::TLS1_3));
    }
}

/// Ask the client for a key share in `group`.
pub(super) fn retry(
    ctx: &mut HandshakeContext,
    hello: &ClientHello,
    raw: &[u8],
    suite: &'static CipherSuiteDescriptor,
    group: NamedGroup,
    effects: &mut Vec<Effect>,
) -> Result<State, Error> {
    check_compression(hello)?;

    let config = Arc::clone(&ctx.config);
    let provider = config.crypto_provider();

    version_negotiated(ctx, effects);
    ctx.suite = Some(suite);
    ctx.session_id = hello.session_id.clone();

    // RFC 8446 Section 4.4.1: ClientHello1 is replaced by message_hash.
    ctx.transcript.append(raw);
    ctx.transcript.replace_with_message_hash(provider, suite.hash);

    let hrr = Message::HelloRetryRequest(HelloRetryRequest {
        session_id: hello.session_id.clone(),
        cipher_suite: suite.suite,
        selected_group: group,
    });
    ctx.send(&hrr, effects);
    middlebox_change_cipher_spec(ctx, effects);

    Ok(State::AwaitRetryClientHello(Box::new(Retry { suite, group })))
}

/// The ClientHello answering a HelloRetryRequest.
pub(super) fn retry_client_hello(
    ctx: &mut HandshakeContext,
    retry: Retry,
    hello: &ClientHello,
    raw: &[u8],
    effects: &mut Vec<Effect>,
) -> Result<State, Error> {
    if hello.session_id != ctx.session_id {
        return Err(Error::IllegalParameter(
            "retried ClientHello changed legacy_session_id".into(),
        ));
    }

    match negotiate::negotiate_retry(ctx, hello)? {
        Negotiation::Tls13 {
            suite,
            group,
            client_share,
            scheme,
        } if suite.suite == retry.suite.suite && group == retry.group => {
            start(ctx, hello, raw, suite, group, &client_share, scheme, effects)
        }
        other => Err(Error::IllegalParameter(format!(
            "retried ClientHello does not match HelloRetryRequest ({:?})",
            other
        ))),
    }
}

/// ServerHello through server Finished.
#[allow(clippy::too_many_arguments)]
pub(super) fn start(
    ctx: &mut HandshakeContext,
    hello: &ClientHello,
    raw: &[u8],
    suite: &'static CipherSuiteDescriptor,
    group: NamedGroup,
    client_share: &[u8],
    scheme: SignatureScheme,
    effects: &mut Vec<Effect>,
) -> Result<State, Error> {
    check_compression(hello)?;

    let config = Arc::clone(&ctx.config);
    let provider = config.crypto_provider();

    version_negotiated(ctx, effects);
    ctx.suite = Some(suite);
    ctx.group = Some(group);
    ctx.session_id = hello.session_id.clone();
    ctx.transcript.append(raw);

    let kx = ctx.start_exchange(group)?;
    let public = kx.pub_key().to_vec();
    let shared: Secret = complete_exchange(kx, client_share)?.into();

    let mut random = [0u8; 32];
    ctx.rng.fill(&mut random);

    let server_hello = Message::ServerHello(ServerHello {
        legacy_version: ProtocolVersion::TLS1_2,
        random,
        session_id: hello.session_id.clone(),
        cipher_suite: suite.suite,
        extensions: vec![
            SupportedVersionsServerHello {
                selected_version: ProtocolVersion::TLS1_3,
            }
            .to_extension(),
            KeyShareServerHello {
                entry: KeyShareEntry {
                    group,
                    key_exchange: public,
                },
            }
            .to_extension(),
        ],
    });
    ctx.send(&server_hello, effects);
    middlebox_change_cipher_spec(ctx, effects);

    let mut ks = KeySchedule::new(provider, suite.hash)?;
    let hash = ctx.transcript_hash(provider, suite);
    let (client_handshake, server_handshake) = ks.derive_handshake_secrets(&shared, &hash)?;
    let client_handshake = Secret::from(client_handshake);
    let server_handshake = Secret::from(server_handshake);
    drop(shared);

    effects.push(Effect::SetWriteProtection(protection(
        provider,
        &ks,
        suite,
        &server_handshake,
    )?));
    effects.push(Effect::SetReadProtection(protection(
        provider,
        &ks,
        suite,
        &client_handshake,
    )?));

    // Acknowledge SNI with an empty server_name (RFC 6066 Section 3).
    let mut extensions = Vec::new();
    if ctx.server_name.is_some() {
        extensions.push(Extension::empty(ExtensionType::ServerName));
    }
    ctx.send(
        &Message::EncryptedExtensions(EncryptedExtensions { extensions }),
        effects,
    );

    let certificate = Message::Certificate(Certificate {
        version: ProtocolVersion::TLS1_3,
        chain: ctx.identity.chain().to_vec(),
    });
    ctx.send(&certificate, effects);

    let hash = ctx.transcript_hash(provider, suite);
    let content = CertificateVerify::server_signed_content(&hash);
    let mut signature = Buf::new();
    ctx.identity
        .key()
        .sign(scheme, &content, &mut signature)
        .map_err(Error::CryptoError)?;
    ctx.send(
        &Message::CertificateVerify(CertificateVerify {
            scheme,
            signature: signature.into_vec(),
        }),
        effects,
    );

    let hash = ctx.transcript_hash(provider, suite);
    let verify_data = ks.finished_verify_data(&server_handshake, &hash)?;
    ctx.send(
        &Message::Finished(Finished {
            verify_data: verify_data.to_vec(),
        }),
        effects,
    );

    let hash = ctx.transcript_hash(provider, suite);
    let (client_application, server_application) = ks.derive_application_secrets(&hash)?;
    let client_application = Secret::from(client_application);
    let server_application = Secret::from(server_application);

    effects.push(Effect::SetWriteProtection(protection(
        provider,
        &ks,
        suite,
        &server_application,
    )?));

    debug!(
        "TLS 1.3 flight sent ({:?}, {:?}, {:?})",
        suite.suite, group, scheme
    );

    Ok(State::AwaitFinished13(Box::new(Pending {
        ks,
        suite,
        client_handshake,
        client_application,
        server_application,
    })))
}

pub(super) fn client_finished(
    ctx: &mut HandshakeContext,
    pending: Pending,
    finished: &Finished,
    raw: &[u8],
    effects: &mut Vec<Effect>,
) -> Result<State, Error> {
    let Pending {
        ks,
        suite,
        client_handshake,
        client_application,
        server_application,
    } = pending;

    let config = Arc::clone(&ctx.config);
    let provider = config.crypto_provider();

    let hash = ctx.transcript_hash(provider, suite);
    let expected = ks.finished_verify_data(&client_handshake, &hash)?;
    if !bool::from(expected.ct_eq(&finished.verify_data[..])) {
        return Err(Error::DecryptError);
    }
    drop(client_handshake);
    ctx.transcript.append(raw);
    ctx.verified = true;

    effects.push(Effect::SetReadProtection(protection(
        provider,
        &ks,
        suite,
        &client_application,
    )?));
    effects.push(Effect::HandshakeComplete);

    debug!("TLS 1.3 handshake complete with {:?}", suite.suite);
    Ok(State::Tls13Connected(Box::new(Traffic {
        ks,
        suite,
        client_application,
        server_application,
    })))
}

/// RFC 8446 Section 4.6.3.
pub(super) fn key_update(
    ctx: &mut HandshakeContext,
    mut traffic: Box<Traffic>,
    update: KeyUpdate,
    effects: &mut Vec<Effect>,
) -> Result<State, Error> {
    let config = Arc::clone(&ctx.config);
    let provider = config.crypto_provider();

    traffic.client_application = traffic
        .ks
        .next_traffic_secret(&traffic.client_application)?
        .into();
    effects.push(Effect::SetReadProtection(protection(
        provider,
        &traffic.ks,
        traffic.suite,
        &traffic.client_application,
    )?));

    if update.update_requested {
        // Post-handshake messages stay out of the transcript.
        let mut buf = Buf::new();
        Message::KeyUpdate(KeyUpdate {
            update_requested: false,
        })
        .encode(&mut buf);
        effects.push(Effect::SendHandshake(buf.into_vec()));

        traffic.server_application = traffic
            .ks
            .next_traffic_secret(&traffic.server_application)?
            .into();
        effects.push(Effect::SetWriteProtection(protection(
            provider,
            &traffic.ks,
            traffic.suite,
            &traffic.server_application,
        )?));
    }

    debug!(
        "KeyUpdate processed (update_requested: {})",
        update.update_requested
    );
    Ok(State::Tls13Connected(traffic))
}
