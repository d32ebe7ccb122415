use crate::types::ContentType;
use crate::Error;

use super::{MAX_CIPHERTEXT_TLS12, RECORD_HEADER_LEN};

/// One record as read off the wire, payload still protected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub content_type: ContentType,
    pub version: u16,
    pub payload: Vec<u8>,
}

/// Splits an incoming byte stream into records.
///
/// Bytes arrive in arbitrary chunks; a record is only handed out once it is
/// complete. The header is validated as soon as it is available, so a peer
/// speaking something other than TLS is rejected without waiting for a body.
#[derive(Debug)]
pub struct Deframer {
    buf: Vec<u8>,
    max_payload: usize,
}

impl Default for Deframer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deframer {
    pub fn new() -> Self {
        Deframer {
            buf: Vec::new(),
            max_payload: MAX_CIPHERTEXT_TLS12,
        }
    }

    /// Tighten the payload limit once the version is known.
    pub fn set_max_payload(&mut self, max_payload: usize) {
        self.max_payload = max_payload;
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes received but not yet handed out as records.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Next complete record, or `None` if more bytes are needed.
    pub fn next_record(&mut self) -> Result<Option<RawRecord>, Error> {
        if self.buf.len() < RECORD_HEADER_LEN {
            return Ok(None);
        }

        let content_type = ContentType::from_u8(self.buf[0]);
        if let ContentType::Unknown(v) = content_type {
            return Err(Error::UnexpectedMessage(format!("record content type {}", v)));
        }

        let version = u16::from_be_bytes([self.buf[1], self.buf[2]]);
        if version >> 8 != 0x03 {
            return Err(Error::MalformedMessage(format!(
                "record version 0x{:04x}",
                version
            )));
        }

        let len = u16::from_be_bytes([self.buf[3], self.buf[4]]) as usize;
        if len > self.max_payload {
            return Err(Error::RecordOverflow(len));
        }

        if self.buf.len() < RECORD_HEADER_LEN + len {
            return Ok(None);
        }

        let payload = self.buf[RECORD_HEADER_LEN..RECORD_HEADER_LEN + len].to_vec();
        self.buf.drain(..RECORD_HEADER_LEN + len);

        Ok(Some(RawRecord {
            content_type,
            version,
            payload,
        }))
    }
}
