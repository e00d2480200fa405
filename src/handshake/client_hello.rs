use rand::{RngCore, rngs::OsRng};

use super::extension::Extensions;
use crate::{AlertDescription, cipher_suite::CipherSuite, parse};

/// Client Hello.
///
/// Session IDs are never sent, there is no resumption.
///
/// # References
///
/// * [RFC 5246 Section 7.4.1.2](https://datatracker.ietf.org/doc/html/rfc5246#section-7.4.1.2)
///
/// ```text
/// struct {
///     ProtocolVersion client_version;
///     Random random;
///     SessionID session_id;
///     CipherSuite cipher_suites<2..2^16-2>;
///     CompressionMethod compression_methods<1..2^8-1>;
///     select (extensions_present) {
///         case false:
///             struct {};
///         case true:
///             Extension extensions<0..2^16-1>;
///     };
/// } ClientHello;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    pub version: u16,
    pub random: [u8; 32],
    pub cipher_suites: Vec<CipherSuite>,
    pub exts: Extensions,
}

impl ClientHello {
    const NULL_COMPRESSION: u8 = 0;

    pub fn new(version: u16, cipher_suites: Vec<CipherSuite>, exts: Extensions) -> Self {
        let mut random: [u8; 32] = [0; 32];
        OsRng.fill_bytes(&mut random);

        Self {
            version,
            random,
            cipher_suites,
            exts,
        }
    }

    pub fn deser(b: &[u8]) -> Result<Self, AlertDescription> {
        let (b, version): (_, u16) = parse::u16("ClientHello client_version", b)?;
        let (b, random): (_, [u8; 32]) = parse::fixed::<32>("ClientHello random", b)?;

        let (b, session_id): (_, &[u8]) = parse::vec8("ClientHello session_id", b, 0, 32)?;
        if !session_id.is_empty() {
            log::info!("ClientHello ignoring session_id, resumption is not supported");
        }

        let (b, cipher_suites_buf): (_, &[u8]) =
            parse::vec16("ClientHello cipher_suites", b, 2, 2)?;

        let mut cipher_suites: Vec<CipherSuite> = Vec::new();
        for chunk in cipher_suites_buf.chunks_exact(2) {
            match CipherSuite::try_from(u16::from_be_bytes([chunk[0], chunk[1]])) {
                Ok(cs) => cipher_suites.push(cs),
                Err(e) => {
                    log::info!("ClientHello ignoring unknown cipher suite value: 0x{e:04X}");
                }
            }
        }

        let (b, compression_methods): (_, &[u8]) =
            parse::vec8("ClientHello compression_methods", b, 1, u8::MAX)?;

        if !compression_methods.contains(&Self::NULL_COMPRESSION) {
            log::error!("ClientHello compression_methods {compression_methods:?} lacks null");
            return Err(AlertDescription::DecodeError);
        }

        let exts: Extensions = Extensions::deser("ClientHello extensions", b)?;

        Ok(Self {
            version,
            random,
            cipher_suites,
            exts,
        })
    }

    pub fn ser(&self) -> Result<Vec<u8>, AlertDescription> {
        let mut buf: Vec<u8> = Vec::new();

        buf.extend_from_slice(&self.version.to_be_bytes());
        buf.extend_from_slice(&self.random);

        // session_id
        buf.push(0);

        let cipher_suites_len: u16 = match u16::try_from(self.cipher_suites.len() * 2) {
            Ok(len) if len >= 2 => len,
            _ => {
                log::error!(
                    "ClientHello cannot carry {} cipher suites",
                    self.cipher_suites.len()
                );
                return Err(AlertDescription::InternalError);
            }
        };
        buf.extend_from_slice(&cipher_suites_len.to_be_bytes());
        for cs in &self.cipher_suites {
            buf.extend_from_slice(&u16::from(*cs).to_be_bytes());
        }

        // compression_methods
        buf.extend_from_slice(&[1, Self::NULL_COMPRESSION]);

        self.exts.ser(&mut buf)?;

        Ok(buf)
    }
}
