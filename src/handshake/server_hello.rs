use rand::{RngCore, rngs::OsRng};

use super::extension::Extensions;
use crate::{AlertDescription, parse};

/// Server Hello.
///
/// The cipher suite is kept as the raw code point, the client decides
/// whether it is one it offered.
///
/// # References
///
/// * [RFC 5246 Section 7.4.1.3](https://datatracker.ietf.org/doc/html/rfc5246#section-7.4.1.3)
///
/// ```text
/// struct {
///     ProtocolVersion server_version;
///     Random random;
///     SessionID session_id;
///     CipherSuite cipher_suite;
///     CompressionMethod compression_method;
///     select (extensions_present) {
///         case false:
///             struct {};
///         case true:
///             Extension extensions<0..2^16-1>;
///     };
/// } ServerHello;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHello {
    pub version: u16,
    pub random: [u8; 32],
    pub cipher_suite: u16,
    pub exts: Extensions,
}

impl ServerHello {
    pub fn new(version: u16, cipher_suite: u16, exts: Extensions) -> Self {
        let mut random: [u8; 32] = [0; 32];
        OsRng.fill_bytes(&mut random);

        Self {
            version,
            random,
            cipher_suite,
            exts,
        }
    }

    pub fn deser(b: &[u8]) -> Result<Self, AlertDescription> {
        let (b, version): (_, u16) = parse::u16("ServerHello server_version", b)?;
        let (b, random): (_, [u8; 32]) = parse::fixed::<32>("ServerHello random", b)?;

        let (b, session_id): (_, &[u8]) = parse::vec8("ServerHello session_id", b, 0, 32)?;
        if !session_id.is_empty() {
            log::info!("ServerHello ignoring session_id, resumption is not supported");
        }

        let (b, cipher_suite): (_, u16) = parse::u16("ServerHello cipher_suite", b)?;

        let (b, compression_method): (_, u8) = parse::u8("ServerHello compression_method", b)?;
        if compression_method != 0 {
            log::error!("ServerHello selected compression method {compression_method}");
            return Err(AlertDescription::DecodeError);
        }

        let exts: Extensions = Extensions::deser("ServerHello extensions", b)?;

        Ok(Self {
            version,
            random,
            cipher_suite,
            exts,
        })
    }

    pub fn ser(&self) -> Result<Vec<u8>, AlertDescription> {
        let mut buf: Vec<u8> = Vec::new();

        buf.extend_from_slice(&self.version.to_be_bytes());
        buf.extend_from_slice(&self.random);

        // session_id
        buf.push(0);

        buf.extend_from_slice(&self.cipher_suite.to_be_bytes());

        // compression_method
        buf.push(0);

        self.exts.ser(&mut buf)?;

        Ok(buf)
    }
}
