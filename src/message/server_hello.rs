use crate::codec::{Reader, Writer};
use crate::types::{CipherSuite, NamedGroup, ProtocolVersion};
use crate::Error;

use super::client_hello::COMPRESSION_NULL;
use super::extensions::{find_extension, parse_extensions, serialize_extensions};
use super::extensions::{Extension, ExtensionType, KeyShareHelloRetryRequest};
use super::extensions::SupportedVersionsServerHello;

/// ServerHello.random of a HelloRetryRequest, SHA-256("HelloRetryRequest")
/// (RFC 8446 Section 4.1.3).
pub const HELLO_RETRY_REQUEST_RANDOM: [u8; 32] = [
    0xCF, 0x21, 0xAD, 0x74, 0xE5, 0x9A, 0x61, 0x11, 0xBE, 0x1D, 0x8C, 0x02, 0x1E, 0x65, 0xB8, 0x91,
    0xC2, 0xA2, 0x11, 0x16, 0x7A, 0xBB, 0x8C, 0x5E, 0x07, 0x9E, 0x09, 0xE2, 0xC8, 0xA8, 0x33, 0x9C,
];

/// Last 8 bytes of a TLS 1.3 capable server's random when it negotiates
/// TLS 1.2 (RFC 8446 Section 4.1.3).
pub const DOWNGRADE_TLS12: [u8; 8] = [0x44, 0x4F, 0x57, 0x4E, 0x47, 0x52, 0x44, 0x01];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHello {
    pub legacy_version: ProtocolVersion,
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    pub cipher_suite: CipherSuite,
    pub extensions: Vec<Extension>,
}

impl ServerHello {
    pub fn parse(r: &mut Reader<'_>) -> Result<ServerHello, Error> {
        let legacy_version = ProtocolVersion::from_u16(r.read_u16()?);
        let random = r.read_array::<32>()?;
        let session_id = r.read_vec_u8()?.to_vec();
        let cipher_suite = CipherSuite::from_u16(r.read_u16()?);
        if r.read_u8()? != COMPRESSION_NULL {
            return Err(Error::IllegalParameter("compression method".into()));
        }
        let extensions = parse_extensions(r)?;
        r.expect_end("ServerHello")?;

        Ok(ServerHello {
            legacy_version,
            random,
            session_id,
            cipher_suite,
            extensions,
        })
    }

    pub fn serialize(&self, w: &mut Writer<'_>) {
        w.put_u16(self.legacy_version.as_u16());
        w.put_bytes(&self.random);
        w.put_vec_u8(|w| w.put_bytes(&self.session_id));
        w.put_u16(self.cipher_suite.as_u16());
        w.put_u8(COMPRESSION_NULL);
        serialize_extensions(&self.extensions, w);
    }

    pub fn extension(&self, typ: ExtensionType) -> Option<&[u8]> {
        find_extension(&self.extensions, typ)
    }

    pub fn is_hello_retry_request(&self) -> bool {
        self.random == HELLO_RETRY_REQUEST_RANDOM
    }
}

/// A ServerHello with the special random asking the client to retry with a
/// key share for `selected_group`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloRetryRequest {
    pub session_id: Vec<u8>,
    pub cipher_suite: CipherSuite,
    pub selected_group: NamedGroup,
}

impl HelloRetryRequest {
    fn to_server_hello(&self) -> ServerHello {
        ServerHello {
            legacy_version: ProtocolVersion::TLS1_2,
            random: HELLO_RETRY_REQUEST_RANDOM,
            session_id: self.session_id.clone(),
            cipher_suite: self.cipher_suite,
            extensions: vec![
                SupportedVersionsServerHello {
                    selected_version: ProtocolVersion::TLS1_3,
                }
                .to_extension(),
                KeyShareHelloRetryRequest {
                    selected_group: self.selected_group,
                }
                .to_extension(),
            ],
        }
    }

    pub(crate) fn from_server_hello(sh: ServerHello) -> Result<Self, Error> {
        let selected_group = sh
            .extension(ExtensionType::KeyShare)
            .map(KeyShareHelloRetryRequest::parse)
            .transpose()?
            .ok_or_else(|| Error::MalformedMessage("HelloRetryRequest without key_share".into()))?
            .selected_group;
        Ok(HelloRetryRequest {
            session_id: sh.session_id,
            cipher_suite: sh.cipher_suite,
            selected_group,
        })
    }

    pub fn serialize(&self, w: &mut Writer<'_>) {
        self.to_server_hello().serialize(w);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buf;

    #[test]
    fn hello_retry_request_is_a_server_hello() {
        let hrr = HelloRetryRequest {
            session_id: vec![5; 32],
            cipher_suite: CipherSuite::TLS13_AES_128_GCM_SHA256,
            selected_group: NamedGroup::Secp256r1,
        };
        let mut buf = Buf::new();
        hrr.serialize(&mut Writer::new(&mut buf));

        let sh = ServerHello::parse(&mut Reader::new(&buf)).unwrap();
        assert!(sh.is_hello_retry_request());
        assert_eq!(sh.legacy_version, ProtocolVersion::TLS1_2);
        assert_eq!(HelloRetryRequest::from_server_hello(sh).unwrap(), hrr);
    }

    #[test]
    fn rejects_compression() {
        let sh = ServerHello {
            legacy_version: ProtocolVersion::TLS1_2,
            random: [0; 32],
            session_id: vec![],
            cipher_suite: CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
            extensions: vec![],
        };
        let mut buf = Buf::new();
        sh.serialize(&mut Writer::new(&mut buf));
        // Compression byte follows version, random, empty session id and suite.
        buf[2 + 32 + 1 + 2] = 1;
        assert!(ServerHello::parse(&mut Reader::new(&buf)).is_err());
    }
}
