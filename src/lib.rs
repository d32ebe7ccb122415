//! timpl is a Sans-IO TLS 1.2 and 1.3 server engine.
//!
//! A [`Connection`] holds the state of one server-side TLS session. It does
//! no I/O of its own: bytes read from the transport go into
//! [`Connection::handle_input`], and everything the engine wants to say comes
//! back out of [`Connection::poll_output`]:
//!
//! - [`Output::Transmit`] bytes to write to the transport,
//! - [`Output::Connected`] once the handshake has completed and the client
//!   Finished was verified,
//! - [`Output::ApplicationData`] decrypted bytes from the client,
//! - [`Output::Closed`] after close_notify or a fatal alert,
//! - [`Output::Timeout`] when to call [`Connection::handle_timeout`] next.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use std::time::Instant;
//! # use timpl::{Config, Connection, Identity, Output};
//! # fn transport_read() -> Vec<u8> { vec![] }
//! # fn transport_write(_: &[u8]) {}
//! # let (cert_pem, key_pem) = ("", "");
//! let config = Config::builder().build().unwrap();
//! let identity = Identity::from_pem(cert_pem, key_pem, &config).unwrap();
//! let mut conn = Connection::new(Arc::new(config), identity, Instant::now());
//!
//! loop {
//!     if conn.handle_input(&transport_read()).is_err() {
//!         // The fatal alert is already queued below.
//!     }
//!     loop {
//!         match conn.poll_output() {
//!             Output::Transmit(bytes) => transport_write(&bytes),
//!             Output::ApplicationData(data) => println!("{} bytes", data.len()),
//!             Output::Connected | Output::Closed => {}
//!             Output::Timeout(_) => break,
//!         }
//!     }
//!     if conn.is_closed() {
//!         break;
//!     }
//! }
//! ```
//!
//! For servers on tokio, [`Engine`] runs one task per accepted transport,
//! keeps the session table and reports to a [`ConnectionEvents`]
//! implementation.
//!
//! Cryptography is behind [`crypto::CryptoProvider`]; the default provider
//! is built on the RustCrypto crates.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod buffer;
pub mod certificate;
pub mod codec;
pub mod crypto;
mod error;
mod handshake;
pub mod message;
pub mod record;
mod rng;
mod suites;
pub mod types;

mod config;
pub use config::{Config, ConfigBuilder, MAX_FRAGMENT_LEN};

mod connection;
pub use connection::{Connection, Output};

mod session;
pub use session::{ConnectionEvents, ConnectionInfo, Engine, NoEvents, Tag, SESSION_ID_LEN};

pub use buffer::{Buf, TmpBuf};
pub use certificate::Identity;
pub use error::Error;
pub use message::Alert;
pub use suites::CipherSuiteDescriptor;
pub use types::{AlertDescription, AlertLevel, CipherSuite, NamedGroup, ProtocolVersion};

#[cfg(test)]
mod test_client;
