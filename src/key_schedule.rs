//! PSK key schedule and record protection for TLS 1.0 to 1.2.
//!
//! # References
//!
//! * [RFC 4279 Section 2](https://datatracker.ietf.org/doc/html/rfc4279#section-2) premaster secret
//! * [RFC 2246 Section 5](https://datatracker.ietf.org/doc/html/rfc2246#section-5) MD5/SHA-1 PRF
//! * [RFC 5246 Section 5](https://datatracker.ietf.org/doc/html/rfc5246#section-5) PRF
//! * [RFC 5246 Section 6.3](https://datatracker.ietf.org/doc/html/rfc5246#section-6.3) key block
//! * [RFC 5246 Section 7.4.9](https://datatracker.ietf.org/doc/html/rfc5246#section-7.4.9) verify_data
//! * [RFC 5288 Section 3](https://datatracker.ietf.org/doc/html/rfc5288#section-3) AES-GCM records
//! * [RFC 6066 Section 7](https://datatracker.ietf.org/doc/html/rfc6066#section-7) truncated HMAC

mod cbc;

use aes_gcm::{
    Aes128Gcm, Aes256Gcm, KeyInit,
    aead::{Aead, AeadCore, Payload, consts::U12},
};
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest as _, Sha256, Sha384};
use subtle::{Choice, ConstantTimeEq as _};
use zeroize::Zeroizing;

use self::cbc::CbcRecords;
use crate::{
    AlertDescription,
    cipher_suite::{BulkCipher, CipherSuite, MacHash, PrfHash},
    handshake::Finished,
    tls_version::TlsVersion,
};

pub const MASTER_SECRET_LEN: usize = 48;
pub const VERIFY_DATA_LEN: usize = Finished::VERIFY_DATA_LEN;
pub(crate) const GCM_TAG_LEN: usize = 16;
const GCM_EXPLICIT_NONCE_LEN: usize = 8;
const GCM_FIXED_IV_LEN: usize = 4;
const TRUNCATED_HMAC_LEN: usize = 10;

/// Everything the key schedule needs from a negotiated session.
pub struct SecurityParameters<'a> {
    pub version: TlsVersion,
    pub cipher_suite: CipherSuite,
    pub client_random: &'a [u8; 32],
    pub server_random: &'a [u8; 32],
    pub psk: &'a [u8],
    pub encrypt_then_mac: bool,
    pub truncated_hmac: bool,
}

/// One direction of record protection.
pub trait RecordProtection: Send {
    /// Protect a plaintext fragment, returning `TLSCiphertext.fragment`.
    fn encode(
        &mut self,
        content_type: u8,
        version: u16,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, AlertDescription>;

    /// Remove protection from `TLSCiphertext.fragment`.
    ///
    /// An authentication failure is `BadRecordMac`.
    fn decode(
        &mut self,
        content_type: u8,
        version: u16,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, AlertDescription>;

    /// `Finished.verify_data` over the handshake messages in `transcript`.
    fn calc_verify_data(
        &self,
        is_from_server: bool,
        transcript: &[u8],
    ) -> Result<[u8; VERIFY_DATA_LEN], AlertDescription>;
}

/// Creates record protection from a negotiated session.
pub trait CryptoProvider: Send + Sync {
    fn create_encoder(
        &self,
        params: &SecurityParameters<'_>,
        is_server_keys: bool,
    ) -> Result<Box<dyn RecordProtection>, AlertDescription>;

    fn create_decoder(
        &self,
        params: &SecurityParameters<'_>,
        is_server_keys: bool,
    ) -> Result<Box<dyn RecordProtection>, AlertDescription>;
}

fn new_mac<M: Mac + KeyInit>(key: &[u8]) -> Result<M, AlertDescription> {
    <M as KeyInit>::new_from_slice(key).map_err(|_| {
        log::error!("HMAC key of {} B rejected", key.len());
        AlertDescription::InternalError
    })
}

fn p_hash<M: Mac + KeyInit + Clone>(
    secret: &[u8],
    seed: &[u8],
    out: &mut [u8],
) -> Result<(), AlertDescription> {
    let base: M = new_mac(secret)?;

    // A(1) = HMAC_hash(secret, A(0)), A(0) = seed
    let mut a = base.clone().chain_update(seed).finalize().into_bytes();

    for chunk in out.chunks_mut(a.len()) {
        let block = base
            .clone()
            .chain_update(&a)
            .chain_update(seed)
            .finalize()
            .into_bytes();
        chunk.copy_from_slice(&block[..chunk.len()]);
        a = base.clone().chain_update(&a).finalize().into_bytes();
    }

    Ok(())
}

fn label_seed(label: &[u8], seed: &[u8]) -> Vec<u8> {
    let mut label_seed: Vec<u8> = Vec::with_capacity(label.len() + seed.len());
    label_seed.extend_from_slice(label);
    label_seed.extend_from_slice(seed);
    label_seed
}

/// TLS 1.2 `PRF(secret, label, seed)`, filling `out`.
///
/// ```text
/// PRF(secret, label, seed) = P_<hash>(secret, label + seed)
/// ```
pub fn prf(
    hash: PrfHash,
    secret: &[u8],
    label: &[u8],
    seed: &[u8],
    out: &mut [u8],
) -> Result<(), AlertDescription> {
    let label_seed: Vec<u8> = label_seed(label, seed);

    match hash {
        PrfHash::Sha256 => p_hash::<Hmac<Sha256>>(secret, &label_seed, out),
        PrfHash::Sha384 => p_hash::<Hmac<Sha384>>(secret, &label_seed, out),
    }
}

/// TLS 1.0 and 1.1 `PRF(secret, label, seed)`, filling `out`.
///
/// ```text
/// PRF(secret, label, seed) = P_MD5(S1, label + seed) XOR P_SHA-1(S2, label + seed)
/// ```
///
/// `S1` and `S2` are the first and second half of `secret`, sharing the
/// middle byte when the length is odd.
pub fn prf_md5_sha1(
    secret: &[u8],
    label: &[u8],
    seed: &[u8],
    out: &mut [u8],
) -> Result<(), AlertDescription> {
    let label_seed: Vec<u8> = label_seed(label, seed);
    let half: usize = secret.len().div_ceil(2);

    p_hash::<Hmac<Md5>>(&secret[..half], &label_seed, out)?;

    let mut sha1_out: Zeroizing<Vec<u8>> = Zeroizing::new(vec![0; out.len()]);
    p_hash::<Hmac<Sha1>>(&secret[secret.len() - half..], &label_seed, &mut sha1_out)?;

    out.iter_mut()
        .zip(sha1_out.iter())
        .for_each(|(o, s)| *o ^= s);

    Ok(())
}

/// PRF of a negotiated session, fixed by the version and the suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionPrf {
    Md5Sha1,
    Tls12(PrfHash),
}

impl SessionPrf {
    fn new(version: TlsVersion, suite: CipherSuite) -> Self {
        if version < TlsVersion::V1_2 {
            SessionPrf::Md5Sha1
        } else {
            SessionPrf::Tls12(suite.prf_hash())
        }
    }

    fn derive(
        self,
        secret: &[u8],
        label: &[u8],
        seed: &[u8],
        out: &mut [u8],
    ) -> Result<(), AlertDescription> {
        match self {
            SessionPrf::Md5Sha1 => prf_md5_sha1(secret, label, seed, out),
            SessionPrf::Tls12(hash) => prf(hash, secret, label, seed, out),
        }
    }

    /// Handshake hash fed to the PRF for `verify_data`.
    fn transcript_hash(self, transcript: &[u8]) -> Vec<u8> {
        match self {
            SessionPrf::Md5Sha1 => {
                let mut hash: Vec<u8> = Md5::digest(transcript).to_vec();
                hash.extend_from_slice(&Sha1::digest(transcript));
                hash
            }
            SessionPrf::Tls12(PrfHash::Sha256) => Sha256::digest(transcript).to_vec(),
            SessionPrf::Tls12(PrfHash::Sha384) => Sha384::digest(transcript).to_vec(),
        }
    }
}

/// Plain PSK premaster secret.
///
/// ```text
/// uint16 N | N zero octets | uint16 N | psk
/// ```
fn premaster_secret(psk: &[u8]) -> Result<Zeroizing<Vec<u8>>, AlertDescription> {
    let len: [u8; 2] = match u16::try_from(psk.len()) {
        Ok(len) => len.to_be_bytes(),
        Err(_) => {
            log::error!("PSK of {} B is too long", psk.len());
            return Err(AlertDescription::InternalError);
        }
    };

    let mut pms: Zeroizing<Vec<u8>> = Zeroizing::new(Vec::with_capacity(4 + 2 * psk.len()));
    pms.extend_from_slice(&len);
    pms.resize(2 + psk.len(), 0);
    pms.extend_from_slice(&len);
    pms.extend_from_slice(psk);
    Ok(pms)
}

/// `master_secret = PRF(pre_master_secret, "master secret",
/// ClientHello.random + ServerHello.random)[0..47]`
fn master_secret(
    prf: SessionPrf,
    params: &SecurityParameters<'_>,
) -> Result<Zeroizing<[u8; MASTER_SECRET_LEN]>, AlertDescription> {
    let pms = premaster_secret(params.psk)?;

    let mut seed: [u8; 64] = [0; 64];
    seed[..32].copy_from_slice(params.client_random);
    seed[32..].copy_from_slice(params.server_random);

    let mut ms: Zeroizing<[u8; MASTER_SECRET_LEN]> = Zeroizing::new([0; MASTER_SECRET_LEN]);
    prf.derive(&pms, b"master secret", &seed, ms.as_mut())?;
    Ok(ms)
}

/// Key material for one direction, cut from the key block.
struct DirectionKeys {
    mac_key: Zeroizing<Vec<u8>>,
    enc_key: Zeroizing<Vec<u8>>,
    iv: Vec<u8>,
}

fn direction_keys(
    prf: SessionPrf,
    master_secret: &[u8],
    params: &SecurityParameters<'_>,
    is_server_keys: bool,
) -> Result<DirectionKeys, AlertDescription> {
    let suite: CipherSuite = params.cipher_suite;
    let bulk: BulkCipher = suite.bulk_cipher();

    let mac_key_len: usize = suite.mac_hash().map_or(0, MacHash::output_len);
    let enc_key_len: usize = bulk.key_len();
    let iv_len: usize = match bulk {
        BulkCipher::Aes128Gcm | BulkCipher::Aes256Gcm => GCM_FIXED_IV_LEN,
        // TLS 1.1 moved the CBC IV into each record
        BulkCipher::Aes128Cbc | BulkCipher::Aes256Cbc if params.version == TlsVersion::V1_0 => {
            cbc::BLOCK_LEN
        }
        _ => 0,
    };

    let mut seed: [u8; 64] = [0; 64];
    seed[..32].copy_from_slice(params.server_random);
    seed[32..].copy_from_slice(params.client_random);

    let mut key_block: Zeroizing<Vec<u8>> =
        Zeroizing::new(vec![0; 2 * (mac_key_len + enc_key_len + iv_len)]);
    prf.derive(master_secret, b"key expansion", &seed, &mut key_block)?;

    // client_write_MAC_key, server_write_MAC_key, client_write_key,
    // server_write_key, client_write_IV, server_write_IV
    let side: usize = usize::from(is_server_keys);
    let mac_start: usize = side * mac_key_len;
    let key_start: usize = 2 * mac_key_len + side * enc_key_len;
    let iv_start: usize = 2 * (mac_key_len + enc_key_len) + side * iv_len;

    Ok(DirectionKeys {
        mac_key: Zeroizing::new(key_block[mac_start..mac_start + mac_key_len].to_vec()),
        enc_key: Zeroizing::new(key_block[key_start..key_start + enc_key_len].to_vec()),
        iv: key_block[iv_start..iv_start + iv_len].to_vec(),
    })
}

/// Additional data / MAC header.
///
/// ```text
/// seq_num + TLSCompressed.type + TLSCompressed.version + TLSCompressed.length
/// ```
fn record_aad(seq: u64, content_type: u8, version: u16, len: usize) -> [u8; 13] {
    let mut aad: [u8; 13] = [0; 13];
    aad[..8].copy_from_slice(&seq.to_be_bytes());
    aad[8] = content_type;
    aad[9..11].copy_from_slice(&version.to_be_bytes());
    // record layer bounds plaintext far below u16::MAX
    aad[11..13].copy_from_slice(&(len as u16).to_be_bytes());
    aad
}

fn gcm_seal<A: Aead + AeadCore<NonceSize = U12>>(
    aead: &A,
    fixed_iv: &[u8; GCM_FIXED_IV_LEN],
    seq: u64,
    content_type: u8,
    version: u16,
    plaintext: &[u8],
) -> Result<Vec<u8>, AlertDescription> {
    let explicit: [u8; GCM_EXPLICIT_NONCE_LEN] = seq.to_be_bytes();
    let mut nonce: [u8; 12] = [0; 12];
    nonce[..GCM_FIXED_IV_LEN].copy_from_slice(fixed_iv);
    nonce[GCM_FIXED_IV_LEN..].copy_from_slice(&explicit);

    let aad: [u8; 13] = record_aad(seq, content_type, version, plaintext.len());

    let sealed: Vec<u8> = match aead.encrypt(
        aes_gcm::Nonce::<U12>::from_slice(&nonce),
        Payload {
            msg: plaintext,
            aad: &aad,
        },
    ) {
        Ok(sealed) => sealed,
        Err(_) => {
            log::error!("Failed to encrypt record");
            return Err(AlertDescription::InternalError);
        }
    };

    let mut out: Vec<u8> = Vec::with_capacity(GCM_EXPLICIT_NONCE_LEN + sealed.len());
    out.extend_from_slice(&explicit);
    out.extend_from_slice(&sealed);
    Ok(out)
}

fn gcm_open<A: Aead + AeadCore<NonceSize = U12>>(
    aead: &A,
    fixed_iv: &[u8; GCM_FIXED_IV_LEN],
    seq: u64,
    content_type: u8,
    version: u16,
    ciphertext: &[u8],
) -> Result<Vec<u8>, AlertDescription> {
    let Some(plaintext_len) = ciphertext
        .len()
        .checked_sub(GCM_EXPLICIT_NONCE_LEN + GCM_TAG_LEN)
    else {
        log::error!(
            "Received encrypted record with length {} which is too short to contain an AES-GCM tag",
            ciphertext.len()
        );
        return Err(AlertDescription::BadRecordMac);
    };

    let (explicit, sealed) = ciphertext.split_at(GCM_EXPLICIT_NONCE_LEN);
    let mut nonce: [u8; 12] = [0; 12];
    nonce[..GCM_FIXED_IV_LEN].copy_from_slice(fixed_iv);
    nonce[GCM_FIXED_IV_LEN..].copy_from_slice(explicit);

    let aad: [u8; 13] = record_aad(seq, content_type, version, plaintext_len);

    aead.decrypt(
        aes_gcm::Nonce::<U12>::from_slice(&nonce),
        Payload {
            msg: sealed,
            aad: &aad,
        },
    )
    .map_err(|_| {
        log::error!("Tag mismatch during record decryption");
        AlertDescription::BadRecordMac
    })
}

enum MacKey {
    Sha1(Hmac<Sha1>),
    Sha256(Hmac<Sha256>),
    Sha384(Hmac<Sha384>),
}

fn full_tag<M: Mac + Clone>(mac: &M, header: &[u8], data: &[u8]) -> Vec<u8> {
    mac.clone()
        .chain_update(header)
        .chain_update(data)
        .finalize()
        .into_bytes()
        .to_vec()
}

/// Record MAC of the CBC and NULL suites.
struct RecordMac {
    key: MacKey,
    /// Output length, 10 with truncated_hmac.
    len: usize,
}

impl RecordMac {
    fn new(hash: MacHash, key: &[u8], truncated_hmac: bool) -> Result<Self, AlertDescription> {
        let key: MacKey = match hash {
            MacHash::Sha1 => MacKey::Sha1(new_mac(key)?),
            MacHash::Sha256 => MacKey::Sha256(new_mac(key)?),
            MacHash::Sha384 => MacKey::Sha384(new_mac(key)?),
        };

        let len: usize = if truncated_hmac {
            TRUNCATED_HMAC_LEN
        } else {
            hash.output_len()
        };

        Ok(Self { key, len })
    }

    fn len(&self) -> usize {
        self.len
    }

    /// MAC over `header | data`, truncated to [`Self::len`].
    fn tag(&self, header: &[u8], data: &[u8]) -> Vec<u8> {
        let mut tag: Vec<u8> = match &self.key {
            MacKey::Sha1(mac) => full_tag(mac, header, data),
            MacKey::Sha256(mac) => full_tag(mac, header, data),
            MacKey::Sha384(mac) => full_tag(mac, header, data),
        };
        tag.truncate(self.len);
        tag
    }

    fn verify(&self, header: &[u8], data: &[u8], tag: &[u8]) -> Choice {
        self.tag(header, data).as_slice().ct_eq(tag)
    }
}

fn null_seal(
    mac: &RecordMac,
    seq: u64,
    content_type: u8,
    version: u16,
    plaintext: &[u8],
) -> Vec<u8> {
    let aad: [u8; 13] = record_aad(seq, content_type, version, plaintext.len());
    let mut out: Vec<u8> = Vec::with_capacity(plaintext.len() + mac.len());
    out.extend_from_slice(plaintext);
    out.extend_from_slice(&mac.tag(&aad, plaintext));
    out
}

fn null_open(
    mac: &RecordMac,
    seq: u64,
    content_type: u8,
    version: u16,
    ciphertext: &[u8],
) -> Result<Vec<u8>, AlertDescription> {
    let Some(plaintext_len) = ciphertext.len().checked_sub(mac.len()) else {
        log::error!(
            "Received record with length {} which is too short to contain a {} B MAC",
            ciphertext.len(),
            mac.len()
        );
        return Err(AlertDescription::BadRecordMac);
    };

    let (plaintext, tag) = ciphertext.split_at(plaintext_len);
    let aad: [u8; 13] = record_aad(seq, content_type, version, plaintext_len);

    if bool::from(mac.verify(&aad, plaintext, tag)) {
        Ok(plaintext.to_vec())
    } else {
        log::error!("MAC mismatch during record decryption");
        Err(AlertDescription::BadRecordMac)
    }
}

enum RecordCipher {
    Aes128Gcm {
        aead: Box<Aes128Gcm>,
        fixed_iv: [u8; GCM_FIXED_IV_LEN],
    },
    Aes256Gcm {
        aead: Box<Aes256Gcm>,
        fixed_iv: [u8; GCM_FIXED_IV_LEN],
    },
    Cbc(Box<CbcRecords>),
    Null(RecordMac),
}

/// Record protection of the PSK suites.
pub struct PskProtection {
    prf: SessionPrf,
    master_secret: Zeroizing<[u8; MASTER_SECRET_LEN]>,
    cipher: RecordCipher,
    // https://datatracker.ietf.org/doc/html/rfc5246#section-6.1
    // Sequence numbers are of type uint64 and may not exceed 2^64-1.
    // A sequence number is incremented after each record.
    seq: u64,
}

impl PskProtection {
    pub fn new(
        params: &SecurityParameters<'_>,
        is_server_keys: bool,
    ) -> Result<Self, AlertDescription> {
        let suite: CipherSuite = params.cipher_suite;
        let bulk: BulkCipher = suite.bulk_cipher();

        if params.version < suite.min_version() {
            log::error!(
                "{suite:?} cannot be used with {:?}, requires {:?}",
                params.version,
                suite.min_version()
            );
            return Err(AlertDescription::IllegalParameter);
        }

        if params.encrypt_then_mac && !bulk.is_block_cipher() {
            log::debug!("encrypt_then_mac has no effect on {suite:?}");
        }

        let prf: SessionPrf = SessionPrf::new(params.version, suite);
        let master_secret = master_secret(prf, params)?;
        let keys: DirectionKeys =
            direction_keys(prf, master_secret.as_ref(), params, is_server_keys)?;

        let mac: Option<RecordMac> = suite
            .mac_hash()
            .map(|hash| RecordMac::new(hash, &keys.mac_key, params.truncated_hmac))
            .transpose()?;

        let cipher: RecordCipher = match (bulk, mac) {
            (BulkCipher::Aes128Gcm, _) => RecordCipher::Aes128Gcm {
                aead: Box::new(
                    <Aes128Gcm as KeyInit>::new_from_slice(&keys.enc_key)
                        .map_err(|_| AlertDescription::InternalError)?,
                ),
                fixed_iv: gcm_fixed_iv(&keys.iv)?,
            },
            (BulkCipher::Aes256Gcm, _) => RecordCipher::Aes256Gcm {
                aead: Box::new(
                    <Aes256Gcm as KeyInit>::new_from_slice(&keys.enc_key)
                        .map_err(|_| AlertDescription::InternalError)?,
                ),
                fixed_iv: gcm_fixed_iv(&keys.iv)?,
            },
            (BulkCipher::Aes128Cbc | BulkCipher::Aes256Cbc, Some(mac)) => {
                RecordCipher::Cbc(Box::new(CbcRecords::new(
                    bulk,
                    &keys.enc_key,
                    mac,
                    params.encrypt_then_mac,
                    keys.iv.as_slice().try_into().ok(),
                )?))
            }
            (BulkCipher::Null, Some(mac)) => RecordCipher::Null(mac),
            (bulk, None) => {
                log::error!("{suite:?} has no record MAC for {bulk:?}");
                return Err(AlertDescription::InternalError);
            }
        };

        log::debug!(
            "Created {suite:?} {} keys for {:?}",
            if is_server_keys { "server" } else { "client" },
            params.version
        );

        Ok(Self {
            prf,
            master_secret,
            cipher,
            seq: 0,
        })
    }

    fn next_seq(&mut self) -> Result<u64, AlertDescription> {
        let seq: u64 = self.seq;
        match seq.checked_add(1) {
            Some(next) => {
                self.seq = next;
                Ok(seq)
            }
            None => {
                log::error!("Record sequence number exhausted");
                Err(AlertDescription::InternalError)
            }
        }
    }
}

fn gcm_fixed_iv(iv: &[u8]) -> Result<[u8; GCM_FIXED_IV_LEN], AlertDescription> {
    iv.try_into().map_err(|_| {
        log::error!("AES-GCM salt of {} B, expected {GCM_FIXED_IV_LEN}", iv.len());
        AlertDescription::InternalError
    })
}

impl RecordProtection for PskProtection {
    fn encode(
        &mut self,
        content_type: u8,
        version: u16,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, AlertDescription> {
        let seq: u64 = self.next_seq()?;
        match &mut self.cipher {
            RecordCipher::Aes128Gcm { aead, fixed_iv } => {
                gcm_seal(aead.as_ref(), fixed_iv, seq, content_type, version, plaintext)
            }
            RecordCipher::Aes256Gcm { aead, fixed_iv } => {
                gcm_seal(aead.as_ref(), fixed_iv, seq, content_type, version, plaintext)
            }
            RecordCipher::Cbc(cbc) => Ok(cbc.seal(seq, content_type, version, plaintext)),
            RecordCipher::Null(mac) => Ok(null_seal(mac, seq, content_type, version, plaintext)),
        }
    }

    fn decode(
        &mut self,
        content_type: u8,
        version: u16,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, AlertDescription> {
        let seq: u64 = self.next_seq()?;
        match &mut self.cipher {
            RecordCipher::Aes128Gcm { aead, fixed_iv } => {
                gcm_open(aead.as_ref(), fixed_iv, seq, content_type, version, ciphertext)
            }
            RecordCipher::Aes256Gcm { aead, fixed_iv } => {
                gcm_open(aead.as_ref(), fixed_iv, seq, content_type, version, ciphertext)
            }
            RecordCipher::Cbc(cbc) => cbc.open(seq, content_type, version, ciphertext),
            RecordCipher::Null(mac) => null_open(mac, seq, content_type, version, ciphertext),
        }
    }

    fn calc_verify_data(
        &self,
        is_from_server: bool,
        transcript: &[u8],
    ) -> Result<[u8; VERIFY_DATA_LEN], AlertDescription> {
        let label: &[u8] = if is_from_server {
            b"server finished"
        } else {
            b"client finished"
        };

        let mut verify_data: [u8; VERIFY_DATA_LEN] = [0; VERIFY_DATA_LEN];
        self.prf.derive(
            self.master_secret.as_ref(),
            label,
            &self.prf.transcript_hash(transcript),
            &mut verify_data,
        )?;
        Ok(verify_data)
    }
}

/// Crypto provider for the PSK suites, backed by RustCrypto.
#[derive(Debug, Default, Clone, Copy)]
pub struct PskCrypto;

impl CryptoProvider for PskCrypto {
    fn create_encoder(
        &self,
        params: &SecurityParameters<'_>,
        is_server_keys: bool,
    ) -> Result<Box<dyn RecordProtection>, AlertDescription> {
        Ok(Box::new(PskProtection::new(params, is_server_keys)?))
    }

    fn create_decoder(
        &self,
        params: &SecurityParameters<'_>,
        is_server_keys: bool,
    ) -> Result<Box<dyn RecordProtection>, AlertDescription> {
        Ok(Box::new(PskProtection::new(params, is_server_keys)?))
    }
}
