use thiserror::Error;

use crate::types::AlertDescription;

/// Errors produced by the engine.
///
/// Errors raised while processing peer input are turned into a fatal alert by
/// the connection (see [`Error::alert`]) before it tears down. They never
/// unwind past the connection.
#[derive(Debug, Error)]
pub enum Error {
    /// A read ran past the end of the available bytes.
    #[error("truncated input")]
    TruncatedInput,

    /// Unknown content or handshake type, or a badly encoded field.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A message arrived that is not allowed in the current state.
    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),

    #[error("no cipher suite in common")]
    UnsupportedCipherSuite,

    #[error("no key exchange group in common")]
    UnsupportedGroup,

    /// AEAD tag or HMAC verification failed.
    #[error("bad record mac")]
    BadRecordMac,

    /// The configured certificate chain or key could not be used.
    #[error("invalid certificate data: {0}")]
    InvalidCertificateData(String),

    /// Bad peer public key or PreMasterSecret decryption failure.
    #[error("key exchange failed: {0}")]
    KeyExchangeFailure(String),

    /// The peer's Finished verify data did not match.
    #[error("finished verification failed")]
    DecryptError,

    #[error("handshake failure: {0}")]
    HandshakeFailure(String),

    #[error("illegal parameter: {0}")]
    IllegalParameter(String),

    #[error("no protocol version in common")]
    ProtocolVersion,

    #[error("record overflow: {0} bytes")]
    RecordOverflow(usize),

    /// The peer sent a fatal alert.
    #[error("peer sent fatal alert {0:?}")]
    PeerAlert(AlertDescription),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("handshake timed out")]
    Timeout,

    #[error("crypto error: {0}")]
    CryptoError(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("unknown session {0}")]
    UnknownSession(String),

    #[error("session resumption is not supported")]
    ResumptionUnsupported,

    /// Too many requests are waiting for the session.
    #[error("transmit queue full")]
    TransmitQueueFull,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The fatal alert to send to the peer for this error, if any.
    ///
    /// `None` means no alert goes out: the peer already closed, the transport
    /// failed, or the error is local configuration.
    pub fn alert(&self) -> Option<AlertDescription> {
        use AlertDescription as A;
        let alert = match self {
            Error::TruncatedInput | Error::MalformedMessage(_) => A::DecodeError,
            Error::UnexpectedMessage(_) => A::UnexpectedMessage,
            Error::UnsupportedCipherSuite | Error::UnsupportedGroup => A::HandshakeFailure,
            Error::HandshakeFailure(_) | Error::Timeout => A::HandshakeFailure,
            Error::BadRecordMac => A::BadRecordMac,
            Error::KeyExchangeFailure(_) | Error::DecryptError => A::DecryptError,
            Error::IllegalParameter(_) => A::IllegalParameter,
            Error::ProtocolVersion => A::ProtocolVersion,
            Error::RecordOverflow(_) => A::RecordOverflow,
            Error::CryptoError(_) | Error::InvalidCertificateData(_) => A::InternalError,
            Error::PeerAlert(_)
            | Error::ConnectionClosed
            | Error::ConfigError(_)
            | Error::UnknownSession(_)
            | Error::ResumptionUnsupported
            | Error::TransmitQueueFull
            | Error::Io(_) => return None,
        };
        Some(alert)
    }
}
