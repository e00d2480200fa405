use crate::tls_version::TlsVersion;

/// Pre-shared key cipher suites.
///
/// # References
///
/// * [RFC 4279 Section 2](https://datatracker.ietf.org/doc/html/rfc4279#section-2)
/// * [RFC 5487 Section 3](https://datatracker.ietf.org/doc/html/rfc5487#section-3)
///
/// +---------------------------------+----------------+
/// | Description                     | Value          |
/// +---------------------------------+----------------+
/// | TLS_PSK_WITH_AES_128_CBC_SHA    | `[0x00, 0x8C]` |
/// | TLS_PSK_WITH_AES_256_CBC_SHA    | `[0x00, 0x8D]` |
/// | TLS_PSK_WITH_AES_128_GCM_SHA256 | `[0x00, 0xA8]` |
/// | TLS_PSK_WITH_AES_256_GCM_SHA384 | `[0x00, 0xA9]` |
/// | TLS_PSK_WITH_AES_128_CBC_SHA256 | `[0x00, 0xAE]` |
/// | TLS_PSK_WITH_AES_256_CBC_SHA384 | `[0x00, 0xAF]` |
/// | TLS_PSK_WITH_NULL_SHA256        | `[0x00, 0xB0]` |
/// | TLS_PSK_WITH_NULL_SHA384        | `[0x00, 0xB1]` |
/// +---------------------------------+----------------+
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
#[non_exhaustive]
#[allow(non_camel_case_types)]
pub enum CipherSuite {
    TLS_PSK_WITH_AES_128_CBC_SHA = 0x008C,
    TLS_PSK_WITH_AES_256_CBC_SHA = 0x008D,
    TLS_PSK_WITH_AES_128_GCM_SHA256 = 0x00A8,
    TLS_PSK_WITH_AES_256_GCM_SHA384 = 0x00A9,
    TLS_PSK_WITH_AES_128_CBC_SHA256 = 0x00AE,
    TLS_PSK_WITH_AES_256_CBC_SHA384 = 0x00AF,
    TLS_PSK_WITH_NULL_SHA256 = 0x00B0,
    TLS_PSK_WITH_NULL_SHA384 = 0x00B1,
}

impl From<CipherSuite> for u16 {
    #[inline]
    fn from(cipher_suite: CipherSuite) -> Self {
        cipher_suite as u16
    }
}

impl TryFrom<u16> for CipherSuite {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            x if x == (Self::TLS_PSK_WITH_AES_128_CBC_SHA as u16) => {
                Ok(Self::TLS_PSK_WITH_AES_128_CBC_SHA)
            }
            x if x == (Self::TLS_PSK_WITH_AES_256_CBC_SHA as u16) => {
                Ok(Self::TLS_PSK_WITH_AES_256_CBC_SHA)
            }
            x if x == (Self::TLS_PSK_WITH_AES_128_GCM_SHA256 as u16) => {
                Ok(Self::TLS_PSK_WITH_AES_128_GCM_SHA256)
            }
            x if x == (Self::TLS_PSK_WITH_AES_256_GCM_SHA384 as u16) => {
                Ok(Self::TLS_PSK_WITH_AES_256_GCM_SHA384)
            }
            x if x == (Self::TLS_PSK_WITH_AES_128_CBC_SHA256 as u16) => {
                Ok(Self::TLS_PSK_WITH_AES_128_CBC_SHA256)
            }
            x if x == (Self::TLS_PSK_WITH_AES_256_CBC_SHA384 as u16) => {
                Ok(Self::TLS_PSK_WITH_AES_256_CBC_SHA384)
            }
            x if x == (Self::TLS_PSK_WITH_NULL_SHA256 as u16) => Ok(Self::TLS_PSK_WITH_NULL_SHA256),
            x if x == (Self::TLS_PSK_WITH_NULL_SHA384 as u16) => Ok(Self::TLS_PSK_WITH_NULL_SHA384),
            _ => Err(value),
        }
    }
}

/// Bulk encryption algorithm of a suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkCipher {
    /// Integrity only.
    Null,
    Aes128Cbc,
    Aes256Cbc,
    Aes128Gcm,
    Aes256Gcm,
}

impl BulkCipher {
    pub const fn key_len(self) -> usize {
        match self {
            BulkCipher::Null => 0,
            BulkCipher::Aes128Cbc | BulkCipher::Aes128Gcm => 16,
            BulkCipher::Aes256Cbc | BulkCipher::Aes256Gcm => 32,
        }
    }

    /// Block ciphers are the only ones affected by encrypt_then_mac.
    pub const fn is_block_cipher(self) -> bool {
        matches!(self, BulkCipher::Aes128Cbc | BulkCipher::Aes256Cbc)
    }
}

/// Hash of the TLS 1.2 PRF and the `Finished` computation.
///
/// TLS 1.0 and 1.1 always use the MD5/SHA-1 PRF instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrfHash {
    Sha256,
    Sha384,
}

/// HMAC hash of the record MAC, for suites that are not AEAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacHash {
    Sha1,
    Sha256,
    Sha384,
}

impl MacHash {
    pub const fn output_len(self) -> usize {
        match self {
            MacHash::Sha1 => 20,
            MacHash::Sha256 => 32,
            MacHash::Sha384 => 48,
        }
    }
}

impl CipherSuite {
    /// Suites offered by default, strongest first.
    pub const DEFAULT: [CipherSuite; 8] = [
        CipherSuite::TLS_PSK_WITH_AES_256_GCM_SHA384,
        CipherSuite::TLS_PSK_WITH_AES_128_GCM_SHA256,
        CipherSuite::TLS_PSK_WITH_AES_256_CBC_SHA384,
        CipherSuite::TLS_PSK_WITH_AES_128_CBC_SHA256,
        CipherSuite::TLS_PSK_WITH_AES_256_CBC_SHA,
        CipherSuite::TLS_PSK_WITH_AES_128_CBC_SHA,
        CipherSuite::TLS_PSK_WITH_NULL_SHA384,
        CipherSuite::TLS_PSK_WITH_NULL_SHA256,
    ];

    pub const fn bulk_cipher(self) -> BulkCipher {
        match self {
            CipherSuite::TLS_PSK_WITH_AES_128_CBC_SHA
            | CipherSuite::TLS_PSK_WITH_AES_128_CBC_SHA256 => BulkCipher::Aes128Cbc,
            CipherSuite::TLS_PSK_WITH_AES_256_CBC_SHA
            | CipherSuite::TLS_PSK_WITH_AES_256_CBC_SHA384 => BulkCipher::Aes256Cbc,
            CipherSuite::TLS_PSK_WITH_AES_128_GCM_SHA256 => BulkCipher::Aes128Gcm,
            CipherSuite::TLS_PSK_WITH_AES_256_GCM_SHA384 => BulkCipher::Aes256Gcm,
            CipherSuite::TLS_PSK_WITH_NULL_SHA256 | CipherSuite::TLS_PSK_WITH_NULL_SHA384 => {
                BulkCipher::Null
            }
        }
    }

    /// The SHA-1 suites predate TLS 1.2 and take its default SHA-256 PRF.
    pub const fn prf_hash(self) -> PrfHash {
        match self {
            CipherSuite::TLS_PSK_WITH_AES_256_GCM_SHA384
            | CipherSuite::TLS_PSK_WITH_AES_256_CBC_SHA384
            | CipherSuite::TLS_PSK_WITH_NULL_SHA384 => PrfHash::Sha384,
            _ => PrfHash::Sha256,
        }
    }

    /// `None` for AEAD suites, the tag is part of the cipher.
    pub const fn mac_hash(self) -> Option<MacHash> {
        match self {
            CipherSuite::TLS_PSK_WITH_AES_128_GCM_SHA256
            | CipherSuite::TLS_PSK_WITH_AES_256_GCM_SHA384 => None,
            CipherSuite::TLS_PSK_WITH_AES_128_CBC_SHA
            | CipherSuite::TLS_PSK_WITH_AES_256_CBC_SHA => Some(MacHash::Sha1),
            CipherSuite::TLS_PSK_WITH_AES_128_CBC_SHA256
            | CipherSuite::TLS_PSK_WITH_NULL_SHA256 => Some(MacHash::Sha256),
            CipherSuite::TLS_PSK_WITH_AES_256_CBC_SHA384
            | CipherSuite::TLS_PSK_WITH_NULL_SHA384 => Some(MacHash::Sha384),
        }
    }

    pub fn has_bulk_cipher(self) -> bool {
        self.bulk_cipher() != BulkCipher::Null
    }

    /// Oldest protocol version the suite may be negotiated with.
    ///
    /// SHA-2 based suites and AEAD ciphers depend on TLS 1.2.
    pub const fn min_version(self) -> TlsVersion {
        match self {
            CipherSuite::TLS_PSK_WITH_AES_128_CBC_SHA
            | CipherSuite::TLS_PSK_WITH_AES_256_CBC_SHA => TlsVersion::V1_0,
            _ => TlsVersion::V1_2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_points() {
        for suite in CipherSuite::DEFAULT {
            assert_eq!(CipherSuite::try_from(u16::from(suite)), Ok(suite));
        }
        assert_eq!(CipherSuite::try_from(0x008B), Err(0x008B));
    }

    #[test]
    fn only_aead_suites_lack_a_mac() {
        for suite in CipherSuite::DEFAULT {
            let aead: bool = matches!(
                suite.bulk_cipher(),
                BulkCipher::Aes128Gcm | BulkCipher::Aes256Gcm
            );
            assert_eq!(suite.mac_hash().is_none(), aead, "{suite:?}");
        }
    }

    #[test]
    fn legacy_versions_need_sha1_suites() {
        let legacy: Vec<CipherSuite> = CipherSuite::DEFAULT
            .into_iter()
            .filter(|cs| cs.min_version() < TlsVersion::V1_2)
            .collect();
        assert_eq!(
            legacy,
            [
                CipherSuite::TLS_PSK_WITH_AES_256_CBC_SHA,
                CipherSuite::TLS_PSK_WITH_AES_128_CBC_SHA
            ]
        );
    }
}
