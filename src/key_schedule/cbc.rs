//! AES-CBC record protection.
//!
//! # References
//!
//! * [RFC 2246 Section 6.2.3.2](https://datatracker.ietf.org/doc/html/rfc2246#section-6.2.3.2) padding, IV chained across records
//! * [RFC 4346 Section 6.2.3.2](https://datatracker.ietf.org/doc/html/rfc4346#section-6.2.3.2) explicit IV
//! * [RFC 7366 Section 3](https://datatracker.ietf.org/doc/html/rfc7366#section-3) encrypt-then-MAC

use aes::{
    Aes128, Aes256,
    cipher::{BlockDecrypt, BlockEncrypt, KeyInit},
};
use rand::{RngCore, rngs::OsRng};
use subtle::{Choice, ConstantTimeEq as _};

use super::{RecordMac, record_aad};
use crate::{AlertDescription, cipher_suite::BulkCipher};

pub(super) const BLOCK_LEN: usize = 16;

/// Longest padding the wire format can express, including the length byte.
const MAX_PADDING_LEN: usize = 256;

enum BlockCipher {
    Aes128(Box<Aes128>),
    Aes256(Box<Aes256>),
}

impl BlockCipher {
    fn new(bulk: BulkCipher, key: &[u8]) -> Result<Self, AlertDescription> {
        let cipher = match bulk {
            BulkCipher::Aes128Cbc => {
                <Aes128 as KeyInit>::new_from_slice(key).map(|c| Self::Aes128(Box::new(c)))
            }
            BulkCipher::Aes256Cbc => {
                <Aes256 as KeyInit>::new_from_slice(key).map(|c| Self::Aes256(Box::new(c)))
            }
            bulk => {
                log::error!("{bulk:?} is not a block cipher");
                return Err(AlertDescription::InternalError);
            }
        };

        cipher.map_err(|_| {
            log::error!("AES key of {} B rejected", key.len());
            AlertDescription::InternalError
        })
    }

    /// CBC encrypt in place, `data` is a whole number of blocks.
    fn encrypt(&self, iv: &[u8; BLOCK_LEN], data: &mut [u8]) {
        let mut prev: [u8; BLOCK_LEN] = *iv;

        for chunk in data.chunks_exact_mut(BLOCK_LEN) {
            chunk.iter_mut().zip(prev).for_each(|(b, p)| *b ^= p);
            let block: &mut aes::Block = aes::Block::from_mut_slice(chunk);
            match self {
                Self::Aes128(c) => c.encrypt_block(block),
                Self::Aes256(c) => c.encrypt_block(block),
            }
            prev.copy_from_slice(chunk);
        }
    }

    /// CBC decrypt in place, padding is left for the caller.
    fn decrypt(&self, iv: &[u8; BLOCK_LEN], data: &mut [u8]) {
        let mut prev: [u8; BLOCK_LEN] = *iv;

        for chunk in data.chunks_exact_mut(BLOCK_LEN) {
            let mut saved: [u8; BLOCK_LEN] = [0; BLOCK_LEN];
            saved.copy_from_slice(chunk);

            let block: &mut aes::Block = aes::Block::from_mut_slice(chunk);
            match self {
                Self::Aes128(c) => c.decrypt_block(block),
                Self::Aes256(c) => c.decrypt_block(block),
            }
            chunk.iter_mut().zip(prev).for_each(|(b, p)| *b ^= p);
            prev = saved;
        }
    }
}

/// Append `padding_length + 1` bytes of value `padding_length`, filling the
/// last block.
fn add_padding(data: &mut Vec<u8>) {
    let padding_length: usize = BLOCK_LEN - 1 - data.len() % BLOCK_LEN;
    // padding_length < BLOCK_LEN
    data.resize(data.len() + padding_length + 1, padding_length as u8);
}

/// Check the padding at the end of `data`, keeping at least `reserved`
/// bytes in front of it.
///
/// Inspects every byte that could be padding regardless of where the
/// padding ends. Returns the padding length including the length byte, 0
/// when invalid.
fn check_padding(data: &[u8], reserved: usize) -> (Choice, usize) {
    let Some(&last) = data.last() else {
        return (Choice::from(0), 0);
    };

    let padding_len: usize = usize::from(last) + 1;
    let mut ok: Choice = Choice::from(u8::from(padding_len + reserved <= data.len()));

    let scan: usize = data.len().min(MAX_PADDING_LEN);
    for (i, byte) in data[data.len() - scan..].iter().rev().enumerate() {
        let in_padding: Choice = Choice::from(u8::from(i < padding_len));
        ok &= !in_padding | byte.ct_eq(&last);
    }

    let len: usize = if bool::from(ok) { padding_len } else { 0 };
    (ok, len)
}

/// One direction of AES-CBC record protection.
///
/// MAC-then-encrypt by default:
///
/// ```text
/// IV | ENC(content | MAC(seq | type | version | length | content) | padding)
/// ```
///
/// With encrypt_then_mac:
///
/// ```text
/// IV | ENC(content | padding) | MAC(seq | type | version | length | IV | ENC(...))
/// ```
pub(super) struct CbcRecords {
    cipher: BlockCipher,
    mac: RecordMac,
    encrypt_then_mac: bool,
    /// TLS 1.0 continues the CBC chain of the previous record and sends no
    /// IV, later versions send a fresh random IV with each record.
    chained_iv: Option<[u8; BLOCK_LEN]>,
}

impl CbcRecords {
    pub fn new(
        bulk: BulkCipher,
        enc_key: &[u8],
        mac: RecordMac,
        encrypt_then_mac: bool,
        chained_iv: Option<[u8; BLOCK_LEN]>,
    ) -> Result<Self, AlertDescription> {
        Ok(Self {
            cipher: BlockCipher::new(bulk, enc_key)?,
            mac,
            encrypt_then_mac,
            chained_iv,
        })
    }

    fn explicit_iv_len(&self) -> usize {
        if self.chained_iv.is_some() {
            0
        } else {
            BLOCK_LEN
        }
    }

    fn next_iv(&self) -> [u8; BLOCK_LEN] {
        match self.chained_iv {
            Some(iv) => iv,
            None => {
                let mut iv: [u8; BLOCK_LEN] = [0; BLOCK_LEN];
                OsRng.fill_bytes(&mut iv);
                iv
            }
        }
    }

    /// Keep the last ciphertext block as the next IV when IVs are chained.
    fn chain(&mut self, ciphertext: &[u8]) {
        if let (Some(iv), Some(last)) = (
            self.chained_iv.as_mut(),
            ciphertext.last_chunk::<BLOCK_LEN>(),
        ) {
            *iv = *last;
        }
    }

    fn split_iv<'a>(
        &self,
        body: &'a [u8],
    ) -> Result<([u8; BLOCK_LEN], &'a [u8]), AlertDescription> {
        match (self.chained_iv, body.split_first_chunk::<BLOCK_LEN>()) {
            (Some(iv), _) => Ok((iv, body)),
            (None, Some((iv, ciphertext))) => Ok((*iv, ciphertext)),
            (None, None) => {
                log::error!("CBC record of {} B has no room for an IV", body.len());
                Err(AlertDescription::BadRecordMac)
            }
        }
    }

    pub fn seal(&mut self, seq: u64, content_type: u8, version: u16, plaintext: &[u8]) -> Vec<u8> {
        let iv: [u8; BLOCK_LEN] = self.next_iv();

        let mut data: Vec<u8> = Vec::with_capacity(plaintext.len() + self.mac.len() + BLOCK_LEN);
        data.extend_from_slice(plaintext);
        if !self.encrypt_then_mac {
            let header: [u8; 13] = record_aad(seq, content_type, version, plaintext.len());
            data.extend_from_slice(&self.mac.tag(&header, plaintext));
        }
        add_padding(&mut data);

        self.cipher.encrypt(&iv, &mut data);
        self.chain(&data);

        let mut out: Vec<u8> =
            Vec::with_capacity(self.explicit_iv_len() + data.len() + self.mac.len());
        if self.explicit_iv_len() != 0 {
            out.extend_from_slice(&iv);
        }
        out.extend_from_slice(&data);

        if self.encrypt_then_mac {
            let header: [u8; 13] = record_aad(seq, content_type, version, out.len());
            let tag: Vec<u8> = self.mac.tag(&header, &out);
            out.extend_from_slice(&tag);
        }

        out
    }

    pub fn open(
        &mut self,
        seq: u64,
        content_type: u8,
        version: u16,
        fragment: &[u8],
    ) -> Result<Vec<u8>, AlertDescription> {
        if self.encrypt_then_mac {
            self.open_encrypt_then_mac(seq, content_type, version, fragment)
        } else {
            self.open_mac_then_encrypt(seq, content_type, version, fragment)
        }
    }

    fn open_mac_then_encrypt(
        &mut self,
        seq: u64,
        content_type: u8,
        version: u16,
        fragment: &[u8],
    ) -> Result<Vec<u8>, AlertDescription> {
        let explicit: usize = self.explicit_iv_len();
        let mac_len: usize = self.mac.len();

        // content may be empty, the MAC and the padding length byte may not
        let min_len: usize = explicit + (mac_len + 1).next_multiple_of(BLOCK_LEN);
        if fragment.len() < min_len || (fragment.len() - explicit) % BLOCK_LEN != 0 {
            log::error!(
                "Received CBC record with length {} which is not a valid number of blocks",
                fragment.len()
            );
            return Err(AlertDescription::BadRecordMac);
        }

        let (iv, ciphertext) = self.split_iv(fragment)?;
        let mut data: Vec<u8> = ciphertext.to_vec();
        self.cipher.decrypt(&iv, &mut data);

        let (padding_ok, padding_len) = check_padding(&data, mac_len);
        let content_len: usize = data.len() - padding_len - mac_len;
        let header: [u8; 13] = record_aad(seq, content_type, version, content_len);
        let mac_ok: Choice = self.mac.verify(
            &header,
            &data[..content_len],
            &data[content_len..content_len + mac_len],
        );

        if !bool::from(padding_ok & mac_ok) {
            log::error!("MAC or padding mismatch during record decryption");
            return Err(AlertDescription::BadRecordMac);
        }

        self.chain(ciphertext);
        data.truncate(content_len);
        Ok(data)
    }

    fn open_encrypt_then_mac(
        &mut self,
        seq: u64,
        content_type: u8,
        version: u16,
        fragment: &[u8],
    ) -> Result<Vec<u8>, AlertDescription> {
        let explicit: usize = self.explicit_iv_len();

        let body_len: usize = match fragment.len().checked_sub(self.mac.len()) {
            Some(len) if len >= explicit + BLOCK_LEN && (len - explicit) % BLOCK_LEN == 0 => len,
            _ => {
                log::error!(
                    "Received CBC record with length {} which is not a valid number of blocks",
                    fragment.len()
                );
                return Err(AlertDescription::BadRecordMac);
            }
        };

        let (body, tag) = fragment.split_at(body_len);
        let header: [u8; 13] = record_aad(seq, content_type, version, body_len);
        if !bool::from(self.mac.verify(&header, body, tag)) {
            log::error!("MAC mismatch during record decryption");
            return Err(AlertDescription::BadRecordMac);
        }

        let (iv, ciphertext) = self.split_iv(body)?;
        let mut data: Vec<u8> = ciphertext.to_vec();
        self.cipher.decrypt(&iv, &mut data);

        let (padding_ok, padding_len) = check_padding(&data, 0);
        if !bool::from(padding_ok) {
            log::error!("Invalid padding in authenticated record");
            return Err(AlertDescription::BadRecordMac);
        }

        self.chain(ciphertext);
        data.truncate(data.len() - padding_len);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher_suite::MacHash;

    fn records(encrypt_then_mac: bool, chained_iv: Option<[u8; BLOCK_LEN]>) -> CbcRecords {
        let mac = RecordMac::new(MacHash::Sha1, &[0x07; 20], false).unwrap();
        CbcRecords::new(
            BulkCipher::Aes128Cbc,
            &[0x42; 16],
            mac,
            encrypt_then_mac,
            chained_iv,
        )
        .unwrap()
    }

    #[test]
    fn padding_fills_the_last_block() {
        for (len, padded) in [(0, 16), (15, 16), (16, 32), (31, 32)] {
            let mut data: Vec<u8> = vec![0xEE; len];
            add_padding(&mut data);
            assert_eq!(data.len(), padded);
            let pad: u8 = *data.last().unwrap();
            assert!(data[len..].iter().all(|b| *b == pad));
            assert_eq!(check_padding(&data, len).1, padded - len);
        }
    }

    #[test]
    fn bad_padding_detected() {
        let mut data: Vec<u8> = vec![0xEE; 5];
        add_padding(&mut data);
        data[10] ^= 1;
        assert!(!bool::from(check_padding(&data, 5).0));

        // padding longer than the data in front of it allows
        let data: Vec<u8> = vec![0x0F; 16];
        assert!(bool::from(check_padding(&data, 0).0));
        assert!(!bool::from(check_padding(&data, 1).0));
    }

    #[test]
    fn record_layout() {
        // explicit IV | 5 B content + 20 B MAC padded to 32
        let ct = records(false, None).seal(0, 23, 0x0302, b"hello");
        assert_eq!(ct.len(), 16 + 32);

        // explicit IV | 5 B content padded to 16 | 20 B MAC
        let ct = records(true, None).seal(0, 23, 0x0302, b"hello");
        assert_eq!(ct.len(), 16 + 16 + 20);

        // TLS 1.0 sends no IV
        let ct = records(false, Some([0; BLOCK_LEN])).seal(0, 23, 0x0301, b"hello");
        assert_eq!(ct.len(), 32);
    }

    #[test]
    fn open_in_order() {
        for encrypt_then_mac in [false, true] {
            for chained_iv in [None, Some([0x99; BLOCK_LEN])] {
                let mut enc = records(encrypt_then_mac, chained_iv);
                let mut dec = records(encrypt_then_mac, chained_iv);

                let a = enc.seal(0, 23, 0x0301, b"same");
                let b = enc.seal(1, 23, 0x0301, b"same");
                assert_ne!(a, b);

                assert_eq!(dec.open(0, 23, 0x0301, &a).unwrap(), b"same");
                assert_eq!(dec.open(1, 23, 0x0301, &b).unwrap(), b"same");
            }
        }
    }

    #[test]
    fn tampering_is_bad_record_mac() {
        for encrypt_then_mac in [false, true] {
            let mut enc = records(encrypt_then_mac, None);
            let ct = enc.seal(0, 23, 0x0303, &[0xAB; 40]);

            for idx in [0, 20, ct.len() - 1] {
                let mut tampered: Vec<u8> = ct.clone();
                tampered[idx] ^= 0x80;
                assert_eq!(
                    records(encrypt_then_mac, None).open(0, 23, 0x0303, &tampered),
                    Err(AlertDescription::BadRecordMac),
                    "encrypt_then_mac={encrypt_then_mac} idx={idx}"
                );
            }

            // wrong sequence number
            assert_eq!(
                records(encrypt_then_mac, None).open(1, 23, 0x0303, &ct),
                Err(AlertDescription::BadRecordMac)
            );
        }
    }

    #[test]
    fn short_records_rejected() {
        for encrypt_then_mac in [false, true] {
            let mut dec = records(encrypt_then_mac, None);
            for len in [0, 15, 16, 17, 31] {
                assert_eq!(
                    dec.open(0, 23, 0x0303, &vec![0; len]),
                    Err(AlertDescription::BadRecordMac),
                    "len={len}"
                );
            }
        }
    }
}
