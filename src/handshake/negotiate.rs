//! Version, cipher suite, group and signature scheme selection.
//!
//! Server preference wins everywhere: the first configured suite (group) the
//! client also offers is chosen.

use log::debug;

use crate::certificate::Identity;
use crate::message::extensions::{KeyShareClientHello, SupportedVersionsClientHello};
use crate::message::ClientHello;
use crate::suites::{CipherSuiteDescriptor, KeyExchangeAlgorithm};
use crate::types::{CipherSuite, NamedGroup, ProtocolVersion, SignatureAlgorithm, SignatureScheme};
use crate::{Config, Error};

use super::HandshakeContext;

/// Outcome of looking at a ClientHello.
#[derive(Debug)]
pub(super) enum Negotiation {
    Tls13 {
        suite: &'static CipherSuiteDescriptor,
        group: NamedGroup,
        client_share: Vec<u8>,
        scheme: SignatureScheme,
    },
    /// TLS 1.3 is possible but the client sent no usable key share.
    Retry {
        suite: &'static CipherSuiteDescriptor,
        group: NamedGroup,
    },
    Tls12 {
        suite: &'static CipherSuiteDescriptor,
        /// `None` for RSA key exchange.
        group: Option<NamedGroup>,
        /// `None` for RSA key exchange.
        scheme: Option<SignatureScheme>,
    },
}

/// The ClientHello extensions negotiation looks at, decoded once.
struct Offer<'a> {
    hello: &'a ClientHello,
    versions: Option<SupportedVersionsClientHello>,
    key_shares: KeyShareClientHello,
    groups: Option<Vec<NamedGroup>>,
    schemes: Option<Vec<SignatureScheme>>,
}

impl<'a> Offer<'a> {
    fn new(hello: &'a ClientHello) -> Result<Self, Error> {
        Ok(Offer {
            hello,
            versions: hello.supported_versions()?,
            key_shares: hello.key_shares()?,
            groups: hello.supported_groups()?,
            schemes: hello.signature_schemes()?,
        })
    }

    fn offers_tls13(&self) -> bool {
        self.versions
            .as_ref()
            .map(|v| v.contains(ProtocolVersion::TLS1_3))
            .unwrap_or(false)
    }

    fn offers_tls12(&self) -> bool {
        match &self.versions {
            Some(v) => v.contains(ProtocolVersion::TLS1_2),
            None => self.hello.legacy_version.as_u16() >= ProtocolVersion::TLS1_2.as_u16(),
        }
    }

    /// Configured suites the client also offers, in our order.
    fn common_suites(&self, ours: &[CipherSuite]) -> Vec<&'static CipherSuiteDescriptor> {
        ours.iter()
            .filter(|s| self.hello.cipher_suites.contains(*s))
            .filter_map(|s| s.descriptor())
            .collect()
    }
}

/// Pick version and parameters for the first ClientHello.
pub(super) fn negotiate(ctx: &HandshakeContext, hello: &ClientHello) -> Result<Negotiation, Error> {
    let offer = Offer::new(hello)?;
    let config = ctx.config();

    let mut failure = Error::ProtocolVersion;

    if offer.offers_tls13() && config.enable_tls13() {
        match select_tls13(config, &ctx.identity, &offer, true) {
            Ok(n) => return Ok(n),
            Err(e) => {
                debug!("TLS 1.3 not possible: {}", e);
                failure = e;
            }
        }
    }

    if offer.offers_tls12() && config.enable_tls12() {
        return select_tls12(config, &ctx.identity, &offer);
    }

    Err(failure)
}

/// Parameters for the ClientHello answering a HelloRetryRequest.
///
/// The version is already fixed at TLS 1.3 and a second retry is never
/// requested.
pub(super) fn negotiate_retry(
    ctx: &HandshakeContext,
    hello: &ClientHello,
) -> Result<Negotiation, Error> {
    let offer = Offer::new(hello)?;
    if !offer.offers_tls13() {
        return Err(Error::IllegalParameter(
            "retried ClientHello dropped TLS 1.3".into(),
        ));
    }
    select_tls13(ctx.config(), &ctx.identity, &offer, false)
}

fn select_tls13(
    config: &Config,
    identity: &Identity,
    offer: &Offer<'_>,
    allow_retry: bool,
) -> Result<Negotiation, Error> {
    let suite = *offer
        .common_suites(config.tls13_cipher_suites())
        .first()
        .ok_or(Error::UnsupportedCipherSuite)?;

    let scheme = scheme_tls13(identity, offer.schemes.as_deref())?;

    // A group we prefer that the client already sent a share for.
    for group in config.kx_groups() {
        if let Some(entry) = offer.key_shares.find(*group) {
            debug!(
                "Negotiated TLS 1.3 {:?} with {:?}, signing {:?}",
                suite.suite, group, scheme
            );
            return Ok(Negotiation::Tls13 {
                suite,
                group: *group,
                client_share: entry.key_exchange.clone(),
                scheme,
            });
        }
    }

    if !allow_retry {
        return Err(Error::IllegalParameter(
            "retried ClientHello without the requested key share".into(),
        ));
    }

    let client_groups = offer.groups.as_deref().unwrap_or(&[]);
    let group = config
        .kx_groups()
        .iter()
        .find(|g| client_groups.contains(g))
        .ok_or(Error::UnsupportedGroup)?;

    debug!("No usable key share, asking for {:?}", group);
    Ok(Negotiation::Retry {
        suite,
        group: *group,
    })
}

fn select_tls12(
    config: &Config,
    identity: &Identity,
    offer: &Offer<'_>,
) -> Result<Negotiation, Error> {
    // RFC 8422 Section 4: no supported_groups means the client takes anything,
    // we settle on P-256.
    let default_groups = [NamedGroup::Secp256r1];
    let client_groups = offer.groups.as_deref().unwrap_or(&default_groups);
    let group = config
        .kx_groups()
        .iter()
        .find(|g| client_groups.contains(g))
        .copied();
    let scheme = scheme_tls12(identity, offer.schemes.as_deref());

    let mut group_missing = false;

    for suite in offer.common_suites(config.tls12_cipher_suites()) {
        if suite.authentication != Some(identity.algorithm()) {
            continue;
        }
        match suite.key_exchange {
            KeyExchangeAlgorithm::Rsa => {
                debug!("Negotiated TLS 1.2 {:?} with RSA key exchange", suite.suite);
                return Ok(Negotiation::Tls12 {
                    suite,
                    group: None,
                    scheme: None,
                });
            }
            KeyExchangeAlgorithm::Ecdhe => {
                let (Some(group), Some(scheme)) = (group, scheme) else {
                    group_missing = true;
                    continue;
                };
                debug!(
                    "Negotiated TLS 1.2 {:?} with {:?}, signing {:?}",
                    suite.suite, group, scheme
                );
                return Ok(Negotiation::Tls12 {
                    suite,
                    group: Some(group),
                    scheme: Some(scheme),
                });
            }
            KeyExchangeAlgorithm::Negotiated => continue,
        }
    }

    if group_missing {
        Err(Error::UnsupportedGroup)
    } else {
        Err(Error::UnsupportedCipherSuite)
    }
}

/// TLS 1.3 forbids PKCS#1 v1.5 signatures in CertificateVerify.
fn scheme_tls13(
    identity: &Identity,
    offered: Option<&[SignatureScheme]>,
) -> Result<SignatureScheme, Error> {
    let offered = offered.ok_or_else(|| {
        Error::HandshakeFailure("ClientHello without signature_algorithms".into())
    })?;
    identity
        .key()
        .supported_schemes()
        .iter()
        .find(|s| !s.is_pkcs1() && offered.contains(s))
        .copied()
        .ok_or_else(|| Error::HandshakeFailure("no signature scheme in common".into()))
}

/// TLS 1.2 prefers PKCS#1 v1.5 for RSA keys and takes PSS only when that is
/// all the client lists.
fn scheme_tls12(identity: &Identity, offered: Option<&[SignatureScheme]>) -> Option<SignatureScheme> {
    let ours = identity.key().supported_schemes();
    match offered {
        Some(offered) => ours
            .iter()
            .find(|s| s.is_pkcs1() && offered.contains(s))
            .or_else(|| ours.iter().find(|s| offered.contains(s)))
            .copied(),
        // RFC 5246 Section 7.4.1.4.1 defaults to SHA-1, which we do not sign
        // with. Use the SHA-256 variant instead.
        None => match identity.algorithm() {
            SignatureAlgorithm::RSA => Some(SignatureScheme::RsaPkcs1Sha256),
            SignatureAlgorithm::ECDSA => ours.first().copied(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::message::extensions::{
        Extension, KeyShareEntry, SignatureAlgorithmsExtension, SupportedGroupsExtension,
    };

    const RSA_CERT: &str = include_str!("../../tests/fixtures/rsa-cert.pem");
    const RSA_KEY: &str = include_str!("../../tests/fixtures/rsa-key.pem");
    const EC_CERT: &str = include_str!("../../tests/fixtures/ec-cert.pem");
    const EC_KEY: &str = include_str!("../../tests/fixtures/ec-key.pem");

    fn ctx_with(config: Config, ecdsa: bool) -> HandshakeContext {
        let identity = if ecdsa {
            Identity::from_pem(EC_CERT, EC_KEY, &config).unwrap()
        } else {
            Identity::from_pem(RSA_CERT, RSA_KEY, &config).unwrap()
        };
        HandshakeContext::new(Arc::new(config), identity)
    }

    fn ctx() -> HandshakeContext {
        ctx_with(Config::builder().build().unwrap(), false)
    }

    fn hello(suites: &[CipherSuite], extensions: Vec<Extension>) -> ClientHello {
        ClientHello {
            legacy_version: ProtocolVersion::TLS1_2,
            random: [1; 32],
            session_id: vec![],
            cipher_suites: suites.to_vec(),
            compression_methods: vec![0],
            extensions,
        }
    }

    fn versions(v: &[ProtocolVersion]) -> Extension {
        SupportedVersionsClientHello {
            versions: v.to_vec(),
        }
        .to_extension()
    }

    fn groups(g: &[NamedGroup]) -> Extension {
        SupportedGroupsExtension { groups: g.to_vec() }.to_extension()
    }

    fn schemes(s: &[SignatureScheme]) -> Extension {
        SignatureAlgorithmsExtension {
            schemes: s.to_vec(),
        }
        .to_extension()
    }

    fn shares(g: &[NamedGroup]) -> Extension {
        KeyShareClientHello {
            entries: g
                .iter()
                .map(|g| KeyShareEntry {
                    group: *g,
                    key_exchange: vec![4; 32],
                })
                .collect(),
        }
        .to_extension()
    }

    fn tls13_hello(share: &[NamedGroup]) -> ClientHello {
        hello(
            &[
                CipherSuite::TLS13_CHACHA20_POLY1305_SHA256,
                CipherSuite::TLS13_AES_128_GCM_SHA256,
                CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
            ],
            vec![
                versions(&[ProtocolVersion::TLS1_3, ProtocolVersion::TLS1_2]),
                groups(&[NamedGroup::Secp256r1, NamedGroup::X25519]),
                schemes(&[
                    SignatureScheme::RsaPkcs1Sha256,
                    SignatureScheme::RsaPssRsaeSha256,
                ]),
                shares(share),
            ],
        )
    }

    #[test]
    fn tls13_with_share_uses_server_preference() {
        let n = negotiate(&ctx(), &tls13_hello(&[NamedGroup::Secp256r1, NamedGroup::X25519]))
            .unwrap();
        let Negotiation::Tls13 {
            suite,
            group,
            scheme,
            ..
        } = n
        else {
            panic!("expected TLS 1.3, got {:?}", n);
        };
        assert_eq!(suite.suite, CipherSuite::TLS13_AES_128_GCM_SHA256);
        assert_eq!(group, NamedGroup::X25519);
        assert_eq!(scheme, SignatureScheme::RsaPssRsaeSha256);
    }

    #[test]
    fn missing_share_asks_once() {
        let ch = tls13_hello(&[]);
        let n = negotiate(&ctx(), &ch).unwrap();
        assert!(matches!(
            n,
            Negotiation::Retry {
                group: NamedGroup::X25519,
                ..
            }
        ));

        let err = negotiate_retry(&ctx(), &ch).unwrap_err();
        assert!(matches!(err, Error::IllegalParameter(_)));
    }

    #[test]
    fn falls_back_to_tls12_without_common_group() {
        let mut ch = tls13_hello(&[]);
        ch.extensions[1] = groups(&[NamedGroup::Secp384r1]);
        let config = Config::builder()
            .kx_groups(&[NamedGroup::X25519])
            .build()
            .unwrap();
        let ctx = ctx_with(config, false);

        // No group in common and no RSA key exchange suite offered.
        assert!(matches!(
            negotiate(&ctx, &ch),
            Err(Error::UnsupportedGroup)
        ));

        ch.cipher_suites.push(CipherSuite::RSA_AES128_GCM_SHA256);
        let n = negotiate(&ctx, &ch).unwrap();
        assert!(matches!(
            n,
            Negotiation::Tls12 {
                group: None,
                scheme: None,
                ..
            }
        ));
    }

    #[test]
    fn tls12_prefers_ecdhe_gcm_then_rsa_gcm() {
        let ch = hello(
            &[
                CipherSuite::RSA_AES128_GCM_SHA256,
                CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
            ],
            vec![],
        );
        let Negotiation::Tls12 {
            suite,
            group,
            scheme,
        } = negotiate(&ctx(), &ch).unwrap()
        else {
            panic!("expected TLS 1.2");
        };
        assert_eq!(suite.suite, CipherSuite::ECDHE_RSA_AES128_GCM_SHA256);
        assert_eq!(group, Some(NamedGroup::Secp256r1));
        assert_eq!(scheme, Some(SignatureScheme::RsaPkcs1Sha256));

        let ch = hello(&[CipherSuite::RSA_AES128_GCM_SHA256], vec![]);
        let Negotiation::Tls12 { suite, group, .. } = negotiate(&ctx(), &ch).unwrap() else {
            panic!("expected TLS 1.2");
        };
        assert_eq!(suite.suite, CipherSuite::RSA_AES128_GCM_SHA256);
        assert_eq!(group, None);
    }

    #[test]
    fn identity_type_filters_suites() {
        let config = Config::builder().build().unwrap();
        let ctx = ctx_with(config, true);
        let ch = hello(
            &[
                CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
                CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256,
            ],
            vec![],
        );
        let Negotiation::Tls12 { suite, scheme, .. } = negotiate(&ctx, &ch).unwrap() else {
            panic!("expected TLS 1.2");
        };
        assert_eq!(suite.suite, CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256);
        assert_eq!(scheme, Some(SignatureScheme::EcdsaSecp256r1Sha256));

        let ch = hello(&[CipherSuite::RSA_AES128_GCM_SHA256], vec![]);
        assert!(matches!(
            negotiate(&ctx, &ch),
            Err(Error::UnsupportedCipherSuite)
        ));
    }

    #[test]
    fn version_rules() {
        // TLS 1.3 only client against a TLS 1.2 only server.
        let config = Config::builder().enable_tls13(false).build().unwrap();
        let mut ch = tls13_hello(&[NamedGroup::X25519]);
        ch.extensions[0] = versions(&[ProtocolVersion::TLS1_3]);
        assert!(matches!(
            negotiate(&ctx_with(config, false), &ch),
            Err(Error::ProtocolVersion)
        ));

        // TLS 1.0 client.
        let mut ch = hello(&[CipherSuite::ECDHE_RSA_AES128_GCM_SHA256], vec![]);
        ch.legacy_version = ProtocolVersion::TLS1_0;
        assert!(matches!(
            negotiate(&ctx(), &ch),
            Err(Error::ProtocolVersion)
        ));
    }

    #[test]
    fn tls13_needs_signature_algorithms() {
        let mut ch = tls13_hello(&[NamedGroup::X25519]);
        ch.extensions.remove(2);
        // Falls back to TLS 1.2 which has a default scheme.
        assert!(matches!(
            negotiate(&ctx(), &ch).unwrap(),
            Negotiation::Tls12 { .. }
        ));

        let config = Config::builder().enable_tls12(false).build().unwrap();
        assert!(matches!(
            negotiate(&ctx_with(config, false), &ch),
            Err(Error::HandshakeFailure(_))
        ));
    }
}
