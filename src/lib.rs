//! A sans-IO TLS 1.0-1.2 pre-shared key engine.
//!
//! Certificates are never used: both ends share a symmetric key named by
//! an opaque identity ([RFC 4279]). The engine does no I/O itself, bytes
//! are pushed in with [`TlsConnection::append_incoming`] and pulled out
//! with [`TlsConnection::take_outgoing`]. [`PskStream`] drives a
//! connection over any blocking `Read + Write` transport.
//!
//! [RFC 4279]: https://datatracker.ietf.org/doc/html/rfc4279

mod alert;
mod base;
mod cipher_suite;
mod client;
mod error;
mod handshake;
mod key_schedule;
pub(crate) mod parse;
mod record;
mod server;
mod session;
mod stream;
mod tls_version;

pub use alert::{Alert, AlertDescription, AlertLevel};
pub use base::{Role, TlsConnection, TlsState};
pub use cipher_suite::{BulkCipher, CipherSuite, MacHash, PrfHash};
pub use client::TlsClientBuilder;
pub use error::TlsError;
pub use handshake::extension::{ExtensionType, MaxFragmentLength};
pub use key_schedule::{
    CryptoProvider, PskCrypto, PskProtection, RecordProtection, SecurityParameters,
    VERIFY_DATA_LEN, prf, prf_md5_sha1,
};
pub use server::{PskResolver, PskTable, TlsServerBuilder};
pub use stream::PskStream;
pub use tls_version::TlsVersion;
