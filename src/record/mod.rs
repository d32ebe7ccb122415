//! Record layer: framing of the byte stream into records and per-epoch
//! record protection.

mod deframer;
mod layer;

pub use deframer::{Deframer, RawRecord};
pub use layer::{Protection, RecordLayer};

/// `ContentType(1) || ProtocolVersion(2) || Length(2)`
pub const RECORD_HEADER_LEN: usize = 5;

/// Largest TLS 1.3 ciphertext (RFC 8446 Section 5.2).
pub const MAX_CIPHERTEXT_TLS13: usize = 16384 + 256;

/// Largest TLS 1.2 ciphertext (RFC 5246 Section 6.2.3).
pub const MAX_CIPHERTEXT_TLS12: usize = 16384 + 2048;

/// Record version written on every outgoing record, TLS 1.3 included.
pub const LEGACY_RECORD_VERSION: u16 = 0x0303;
