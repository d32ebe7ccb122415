use std::sync::Arc;

use log::debug;
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

use crate::buffer::Buf;
use crate::crypto::prf::{self, Sender, MASTER_SECRET_LEN};
use crate::crypto::{ActiveKeyExchange, CryptoProvider, SigningKey};
use crate::message::extensions::{Extension, ExtensionType};
use crate::message::{Certificate, ClientHello, ClientKeyExchange, Finished, Message};
use crate::message::{ServerHello, ServerKeyExchange, COMPRESSION_NULL, DOWNGRADE_TLS12};
use crate::record::Protection;
use crate::suites::CipherSuiteDescriptor;
use crate::types::{NamedGroup, ProtocolVersion, SignatureScheme};
use crate::Error;

use super::{complete_exchange, Effect, HandshakeContext, Secret, State};

/// Server flight sent, waiting for ClientKeyExchange.
pub struct Pending {
    suite: &'static CipherSuiteDescriptor,
    client_random: [u8; 32],
    server_random: [u8; 32],
    /// `None` for RSA key exchange.
    kx: Option<Box<dyn ActiveKeyExchange>>,
    extended_master_secret: bool,
    /// Highest version the client offered, checked inside the RSA premaster.
    client_version: ProtocolVersion,
}

/// Master secret and both directions' protection, installed one at a time.
pub struct Keys {
    suite: &'static CipherSuiteDescriptor,
    master_secret: Secret,
    read: Option<Protection>,
    write: Option<Protection>,
}

pub(super) fn start(
    ctx: &mut HandshakeContext,
    hello: &ClientHello,
    raw: &[u8],
    suite: &'static CipherSuiteDescriptor,
    group: Option<NamedGroup>,
    scheme: Option<SignatureScheme>,
    effects: &mut Vec<Effect>,
) -> Result<State, Error> {
    if !hello.compression_methods.contains(&COMPRESSION_NULL) {
        return Err(Error::IllegalParameter("null compression not offered".into()));
    }
    // RFC 5746 Section 3.6: an initial handshake carries an empty
    // renegotiated_connection.
    if let Some(reneg) = hello.extension(ExtensionType::RenegotiationInfo) {
        if reneg != [0] {
            return Err(Error::HandshakeFailure(
                "non-empty renegotiation_info".into(),
            ));
        }
    }

    let config = Arc::clone(&ctx.config);

    ctx.transcript.append(raw);
    ctx.version = Some(ProtocolVersion::TLS1_2);
    ctx.suite = Some(suite);
    ctx.group = group;
    effects.push(Effect::VersionNegotiated(ProtocolVersion::TLS1_2));

    let mut server_random = [0u8; 32];
    ctx.rng.fill(&mut server_random);
    if config.enable_tls13() {
        // RFC 8446 Section 4.1.3 downgrade sentinel.
        server_random[24..].copy_from_slice(&DOWNGRADE_TLS12);
    }

    let mut session_id = vec![0u8; 32];
    ctx.rng.fill(&mut session_id);
    ctx.session_id = session_id.clone();

    let extended_master_secret = config.with_extended_master_secret()
        && hello.has_extension(ExtensionType::ExtendedMasterSecret);

    let mut extensions = Vec::new();
    if hello.offers_secure_renegotiation() {
        extensions.push(Extension::empty_renegotiation_info());
    }
    if extended_master_secret {
        extensions.push(Extension::empty(ExtensionType::ExtendedMasterSecret));
    }
    if group.is_some() && hello.has_extension(ExtensionType::EcPointFormats) {
        extensions.push(Extension::uncompressed_point_format());
    }

    let server_hello = Message::ServerHello(ServerHello {
        legacy_version: ProtocolVersion::TLS1_2,
        random: server_random,
        session_id,
        cipher_suite: suite.suite,
        extensions,
    });
    ctx.send(&server_hello, effects);

    let certificate = Message::Certificate(Certificate {
        version: ProtocolVersion::TLS1_2,
        chain: ctx.identity.chain().to_vec(),
    });
    ctx.send(&certificate, effects);

    let kx = match (group, scheme) {
        (Some(group), Some(scheme)) => {
            let kx = ctx.start_exchange(group)?;
            let public = kx.pub_key().to_vec();
            let message =
                ServerKeyExchange::signed_message(&hello.random, &server_random, group, &public);

            let mut signature = Buf::new();
            ctx.identity
                .key()
                .sign(scheme, &message, &mut signature)
                .map_err(Error::CryptoError)?;

            let ske = Message::ServerKeyExchange(ServerKeyExchange {
                group,
                public,
                scheme,
                signature: signature.into_vec(),
            });
            ctx.send(&ske, effects);
            Some(kx)
        }
        _ => None,
    };

    ctx.send(&Message::ServerHelloDone, effects);

    debug!(
        "TLS 1.2 flight sent ({:?}, extended master secret: {})",
        suite.suite, extended_master_secret
    );

    Ok(State::AwaitClientKeyExchange(Box::new(Pending {
        suite,
        client_random: hello.random,
        server_random,
        kx,
        extended_master_secret,
        client_version: hello.legacy_version,
    })))
}

pub(super) fn client_key_exchange(
    ctx: &mut HandshakeContext,
    pending: Pending,
    message: &ClientKeyExchange,
    raw: &[u8],
) -> Result<State, Error> {
    let Pending {
        suite,
        client_random,
        server_random,
        kx,
        extended_master_secret,
        client_version,
    } = pending;

    let config = Arc::clone(&ctx.config);
    let provider = config.crypto_provider();

    let premaster: Secret = match kx {
        Some(kx) => complete_exchange(kx, message.ecdh_public()?)?.into(),
        None => rsa_premaster(
            provider,
            ctx.identity.key(),
            message.encrypted_pre_master_secret()?,
            client_version,
        )?
        .into(),
    };

    ctx.transcript.append(raw);

    let master_secret: Secret = if extended_master_secret {
        let session_hash = ctx.transcript_hash(provider, suite);
        prf::extended_master_secret(provider, suite.hash, &premaster, &session_hash)?
    } else {
        prf::master_secret(provider, suite.hash, &premaster, &client_random, &server_random)?
    }
    .into();
    drop(premaster);

    let kb = prf::key_block(provider, suite, &master_secret, &client_random, &server_random)?;
    let read = Protection::tls12(
        provider,
        suite,
        &kb.client_key,
        &kb.client_iv,
        &kb.client_mac_key,
    )?;
    let write = Protection::tls12(
        provider,
        suite,
        &kb.server_key,
        &kb.server_iv,
        &kb.server_mac_key,
    )?;

    Ok(State::AwaitChangeCipherSpec(Box::new(Keys {
        suite,
        master_secret,
        read: Some(read),
        write: Some(write),
    })))
}

/// Decrypt the RSA premaster secret without revealing whether it was valid.
///
/// RFC 5246 Section 7.4.7.1: on any failure (bad padding, wrong length or a
/// version mismatch) continue with 48 random bytes so the handshake fails
/// later at Finished, indistinguishable from a wrong key.
fn rsa_premaster(
    provider: &CryptoProvider,
    key: &dyn SigningKey,
    encrypted: &[u8],
    client_version: ProtocolVersion,
) -> Result<Buf, Error> {
    let mut fallback = [0u8; MASTER_SECRET_LEN];
    provider.random(&mut fallback)?;

    let mut decrypted = Buf::new();
    let decrypt_ok = key.decrypt(encrypted, &mut decrypted).is_ok();

    let mut candidate = [0u8; MASTER_SECRET_LEN];
    let len_ok = decrypted.len() == MASTER_SECRET_LEN;
    if len_ok {
        candidate.copy_from_slice(&decrypted);
    }
    decrypted.zeroize();

    let version = client_version.as_u16().to_be_bytes();
    let valid = Choice::from((decrypt_ok && len_ok) as u8) & candidate[..2].ct_eq(&version);

    let mut out = Buf::with_capacity(MASTER_SECRET_LEN);
    for (c, f) in candidate.iter().zip(fallback.iter()) {
        out.push(u8::conditional_select(f, c, valid));
    }

    candidate.iter_mut().for_each(|b| *b = 0);
    fallback.iter_mut().for_each(|b| *b = 0);

    Ok(out)
}

pub(super) fn change_cipher_spec(
    mut keys: Box<Keys>,
    effects: &mut Vec<Effect>,
) -> Result<State, Error> {
    let read = keys
        .read
        .take()
        .ok_or_else(|| Error::UnexpectedMessage("second ChangeCipherSpec".into()))?;
    effects.push(Effect::SetReadProtection(read));
    Ok(State::AwaitFinished12(keys))
}

pub(super) fn client_finished(
    ctx: &mut HandshakeContext,
    mut keys: Box<Keys>,
    finished: &Finished,
    raw: &[u8],
    effects: &mut Vec<Effect>,
) -> Result<State, Error> {
    let config = Arc::clone(&ctx.config);
    let provider = config.crypto_provider();
    let suite = keys.suite;

    let handshake_hash = ctx.transcript_hash(provider, suite);
    let expected = prf::verify_data(
        provider,
        suite.hash,
        &keys.master_secret,
        Sender::Client,
        &handshake_hash,
    )?;
    if !bool::from(expected.ct_eq(&finished.verify_data[..])) {
        return Err(Error::DecryptError);
    }
    ctx.transcript.append(raw);
    ctx.verified = true;

    let handshake_hash = ctx.transcript_hash(provider, suite);
    let verify_data = prf::verify_data(
        provider,
        suite.hash,
        &keys.master_secret,
        Sender::Server,
        &handshake_hash,
    )?;

    let write = keys
        .write
        .take()
        .ok_or_else(|| Error::UnexpectedMessage("write keys already installed".into()))?;

    effects.push(Effect::SendChangeCipherSpec);
    effects.push(Effect::SetWriteProtection(write));
    ctx.send(
        &Message::Finished(Finished {
            verify_data: verify_data.to_vec(),
        }),
        effects,
    );
    effects.push(Effect::HandshakeComplete);

    debug!("TLS 1.2 handshake complete with {:?}", suite.suite);
    Ok(State::Tls12Connected)
}
