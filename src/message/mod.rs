//! Protocol messages.
//!
//! [`Message`] is one variant per message the engine sends or receives.
//! Handshake variants encode with their 4 byte handshake header
//! (`HandshakeType(1) || Length(3) || Body`); the record layer adds the
//! record header.

mod alert;
mod certificate_verify;
mod client_hello;
mod client_key_exchange;
mod encrypted_extensions;
pub mod extensions;
mod finished;
mod key_update;
mod server_hello;
mod server_key_exchange;

pub use alert::Alert;
pub use certificate_verify::CertificateVerify;
pub use client_hello::{ClientHello, COMPRESSION_NULL};
pub use client_key_exchange::ClientKeyExchange;
pub use encrypted_extensions::EncryptedExtensions;
pub use finished::Finished;
pub use key_update::KeyUpdate;
pub use server_hello::{HelloRetryRequest, ServerHello};
pub use server_hello::{DOWNGRADE_TLS12, HELLO_RETRY_REQUEST_RANDOM};
pub use server_key_exchange::ServerKeyExchange;

use crate::buffer::Buf;
use crate::certificate::{decode_certificate_body, encode_certificate_body};
use crate::codec::{Reader, Writer};
use crate::types::{ContentType, HandshakeType, ProtocolVersion};
use crate::Error;

/// Length of the handshake message header.
pub const HANDSHAKE_HEADER_LEN: usize = 4;

/// Certificate handshake message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// Decides the body layout (TLS 1.3 adds a request context and per-entry
    /// extensions).
    pub version: ProtocolVersion,
    pub chain: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    ClientHello(ClientHello),
    ServerHello(ServerHello),
    HelloRetryRequest(HelloRetryRequest),
    EncryptedExtensions(EncryptedExtensions),
    Certificate(Certificate),
    ServerKeyExchange(ServerKeyExchange),
    CertificateVerify(CertificateVerify),
    ServerHelloDone,
    ClientKeyExchange(ClientKeyExchange),
    Finished(Finished),
    KeyUpdate(KeyUpdate),
    ChangeCipherSpec,
    Alert(Alert),
    ApplicationData(Vec<u8>),
}

impl Message {
    pub fn content_type(&self) -> ContentType {
        match self {
            Message::ChangeCipherSpec => ContentType::ChangeCipherSpec,
            Message::Alert(_) => ContentType::Alert,
            Message::ApplicationData(_) => ContentType::ApplicationData,
            _ => ContentType::Handshake,
        }
    }

    /// The handshake type, `None` for the non-handshake variants.
    pub fn handshake_type(&self) -> Option<HandshakeType> {
        let t = match self {
            Message::ClientHello(_) => HandshakeType::ClientHello,
            Message::ServerHello(_) | Message::HelloRetryRequest(_) => HandshakeType::ServerHello,
            Message::EncryptedExtensions(_) => HandshakeType::EncryptedExtensions,
            Message::Certificate(_) => HandshakeType::Certificate,
            Message::ServerKeyExchange(_) => HandshakeType::ServerKeyExchange,
            Message::CertificateVerify(_) => HandshakeType::CertificateVerify,
            Message::ServerHelloDone => HandshakeType::ServerHelloDone,
            Message::ClientKeyExchange(_) => HandshakeType::ClientKeyExchange,
            Message::Finished(_) => HandshakeType::Finished,
            Message::KeyUpdate(_) => HandshakeType::KeyUpdate,
            Message::ChangeCipherSpec | Message::Alert(_) | Message::ApplicationData(_) => {
                return None
            }
        };
        Some(t)
    }

    /// Append the wire form of this message to `out`.
    pub fn encode(&self, out: &mut Buf) {
        let mut w = Writer::new(out);

        match self {
            Message::ChangeCipherSpec => return w.put_u8(1),
            Message::Alert(alert) => return alert.serialize(&mut w),
            Message::ApplicationData(data) => return w.put_bytes(data),
            _ => {}
        }
        let Some(handshake_type) = self.handshake_type() else {
            return;
        };

        w.put_u8(handshake_type.as_u8());
        w.put_vec_u24(|w| match self {
            Message::ClientHello(m) => m.serialize(w),
            Message::ServerHello(m) => m.serialize(w),
            Message::HelloRetryRequest(m) => m.serialize(w),
            Message::EncryptedExtensions(m) => m.serialize(w),
            Message::Certificate(m) => w.put_bytes(&encode_certificate_body(&m.chain, m.version)),
            Message::ServerKeyExchange(m) => m.serialize(w),
            Message::CertificateVerify(m) => m.serialize(w),
            Message::ServerHelloDone => {}
            Message::ClientKeyExchange(m) => m.serialize(w),
            Message::Finished(m) => m.serialize(w),
            Message::KeyUpdate(m) => m.serialize(w),
            Message::ChangeCipherSpec | Message::Alert(_) | Message::ApplicationData(_) => {}
        });
    }

    /// Decode one message, assuming TLS 1.2 layouts where versions differ.
    pub fn decode(content_type: ContentType, bytes: &[u8]) -> Result<Message, Error> {
        Self::decode_versioned(content_type, bytes, ProtocolVersion::TLS1_2)
    }

    /// Decode one message. A handshake message must be exactly one complete
    /// message, header included.
    pub fn decode_versioned(
        content_type: ContentType,
        bytes: &[u8],
        version: ProtocolVersion,
    ) -> Result<Message, Error> {
        let mut r = Reader::new(bytes);

        match content_type {
            ContentType::Handshake => {}
            ContentType::ChangeCipherSpec => {
                if bytes != [1] {
                    return Err(Error::MalformedMessage("ChangeCipherSpec".into()));
                }
                return Ok(Message::ChangeCipherSpec);
            }
            ContentType::Alert => return Ok(Message::Alert(Alert::parse(&mut r)?)),
            ContentType::ApplicationData => return Ok(Message::ApplicationData(bytes.to_vec())),
            ContentType::Unknown(v) => {
                return Err(Error::UnexpectedMessage(format!("content type {}", v)))
            }
        }

        let handshake_type = HandshakeType::from_u8(r.read_u8()?);
        let body = r.read_vec_u24()?;
        r.expect_end("handshake message")?;
        let mut r = Reader::new(body);

        let message = match handshake_type {
            HandshakeType::ClientHello => Message::ClientHello(ClientHello::parse(&mut r)?),
            HandshakeType::ServerHello => {
                let sh = ServerHello::parse(&mut r)?;
                if sh.is_hello_retry_request() {
                    Message::HelloRetryRequest(HelloRetryRequest::from_server_hello(sh)?)
                } else {
                    Message::ServerHello(sh)
                }
            }
            HandshakeType::EncryptedExtensions => {
                Message::EncryptedExtensions(EncryptedExtensions::parse(&mut r)?)
            }
            HandshakeType::Certificate => Message::Certificate(Certificate {
                version,
                chain: decode_certificate_body(body, version)?,
            }),
            HandshakeType::ServerKeyExchange => {
                Message::ServerKeyExchange(ServerKeyExchange::parse(&mut r)?)
            }
            HandshakeType::CertificateVerify => {
                Message::CertificateVerify(CertificateVerify::parse(&mut r)?)
            }
            HandshakeType::ServerHelloDone => {
                r.expect_end("ServerHelloDone")?;
                Message::ServerHelloDone
            }
            HandshakeType::ClientKeyExchange => {
                Message::ClientKeyExchange(ClientKeyExchange::parse(&mut r)?)
            }
            HandshakeType::Finished => Message::Finished(Finished::parse(&mut r)?),
            HandshakeType::KeyUpdate => Message::KeyUpdate(KeyUpdate::parse(&mut r)?),
            HandshakeType::Unknown(v) => {
                return Err(Error::MalformedMessage(format!("handshake type {}", v)))
            }
            other => {
                return Err(Error::UnexpectedMessage(format!(
                    "unsupported handshake message {:?}",
                    other
                )))
            }
        };

        Ok(message)
    }
}
