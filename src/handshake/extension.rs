use std::collections::BTreeMap;

use crate::{alert::AlertDescription, parse};

/// Extension type.
///
/// Only the extensions a PSK session can act on are named, everything
/// else is carried as a raw code point.
///
/// # References
///
/// * [RFC 6066 Section 4](https://datatracker.ietf.org/doc/html/rfc6066#section-4)
/// * [RFC 6066 Section 7](https://datatracker.ietf.org/doc/html/rfc6066#section-7)
/// * [RFC 7366 Section 2](https://datatracker.ietf.org/doc/html/rfc7366#section-2)
#[repr(u16)]
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionType {
    MaxFragmentLength = 1, // RFC 6066
    TruncatedHmac = 4,     // RFC 6066
    EncryptThenMac = 22,   // RFC 7366
}

impl ExtensionType {
    pub const fn to_be_bytes(self) -> [u8; 2] {
        (self as u16).to_be_bytes()
    }
}

impl From<ExtensionType> for u16 {
    #[inline]
    fn from(extension_type: ExtensionType) -> Self {
        extension_type as u16
    }
}

impl TryFrom<u16> for ExtensionType {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            x if x == (Self::MaxFragmentLength as u16) => Ok(Self::MaxFragmentLength),
            x if x == (Self::TruncatedHmac as u16) => Ok(Self::TruncatedHmac),
            x if x == (Self::EncryptThenMac as u16) => Ok(Self::EncryptThenMac),
            _ => Err(value),
        }
    }
}

/// Maximum fragment length negotiation.
///
/// # References
///
/// * [RFC 6066 Section 4](https://datatracker.ietf.org/doc/html/rfc6066#section-4)
///
/// ```text
/// enum{
///     2^9(1), 2^10(2), 2^11(3), 2^12(4), (255)
/// } MaxFragmentLength;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxFragmentLength(u8);

impl MaxFragmentLength {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub fn new(code: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&code)
            .then_some(Self(code))
    }

    pub fn deser(data: &[u8]) -> Result<Self, AlertDescription> {
        let code: u8 = match data {
            [code] => *code,
            _ => {
                log::error!(
                    "MaxFragmentLength size {} does not match expected of 1",
                    data.len()
                );
                return Err(AlertDescription::IllegalParameter);
            }
        };

        match Self::new(code) {
            Some(mfl) => Ok(mfl),
            None => {
                log::error!(
                    "MaxFragmentLength value {code} outside of {}..={}",
                    Self::MIN,
                    Self::MAX
                );
                Err(AlertDescription::IllegalParameter)
            }
        }
    }

    pub fn code(&self) -> u8 {
        self.0
    }

    /// Plaintext fragment limit, 2^(8+n).
    pub fn limit(&self) -> usize {
        1 << (8 + usize::from(self.0))
    }
}

/// Extension block of a hello message, keyed by extension type.
///
/// Unknown types are kept so that a server can decide what to echo and a
/// client can compare echoed values byte for byte.
///
/// # References
///
/// * [RFC 5246 Section 7.4.1.4](https://datatracker.ietf.org/doc/html/rfc5246#section-7.4.1.4)
///
/// ```text
/// struct {
///     ExtensionType extension_type;
///     opaque extension_data<0..2^16-1>;
/// } Extension;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions(BTreeMap<u16, Vec<u8>>);

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, extension_type: u16) -> Option<&[u8]> {
        self.0.get(&extension_type).map(Vec::as_slice)
    }

    pub fn insert(&mut self, extension_type: u16, data: Vec<u8>) -> Option<Vec<u8>> {
        self.0.insert(extension_type, data)
    }

    pub fn remove(&mut self, extension_type: ExtensionType) -> Option<Vec<u8>> {
        self.0.remove(&u16::from(extension_type))
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &[u8])> {
        self.0.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Keep only the extensions whose type satisfies `keep`.
    pub fn retain<F: FnMut(u16) -> bool>(&mut self, mut keep: F) {
        self.0.retain(|k, _| keep(*k))
    }

    /// Parse an optional extension block.
    ///
    /// An absent block is an empty map.
    pub fn deser(name: &str, b: &[u8]) -> Result<Self, AlertDescription> {
        let mut ret: Self = Self::new();

        if b.is_empty() {
            return Ok(ret);
        }

        let (remain, mut b): (_, &[u8]) = parse::vec16(name, b, 0, 1)?;
        parse::end(name, remain)?;

        while !b.is_empty() {
            let (new_b, extension_type): (_, u16) = parse::u16("extension_type", b)?;
            let (new_b, data): (_, &[u8]) = parse::vec16("extension_data", new_b, 0, 1)?;
            b = new_b;

            let extension_pretty: String = match ExtensionType::try_from(extension_type) {
                Ok(et) => format!("{et:?}"),
                Err(val) => format!("0x{val:04X}"),
            };

            // https://datatracker.ietf.org/doc/html/rfc5246#section-7.4.1.4
            // There MUST NOT be more than one extension of the same type.
            if ret.insert(extension_type, data.to_vec()).is_some() {
                log::error!("{name} extension appeared more than once: {extension_pretty}");
                return Err(AlertDescription::DecodeError);
            }

            log::debug!("{name} {extension_pretty} length={}", data.len());
        }

        Ok(ret)
    }

    /// Serialize the extension block, nothing at all for an empty map.
    pub fn ser(&self, buf: &mut Vec<u8>) -> Result<(), AlertDescription> {
        if self.is_empty() {
            return Ok(());
        }

        let len_idx: usize = buf.len();
        buf.extend_from_slice(&[0, 0]);

        for (extension_type, data) in self.iter() {
            let data_len: u16 = match u16::try_from(data.len()) {
                Ok(len) => len,
                Err(_) => {
                    log::error!("Extension 0x{extension_type:04X} data does not fit in u16");
                    return Err(AlertDescription::InternalError);
                }
            };
            buf.extend_from_slice(&extension_type.to_be_bytes());
            buf.extend_from_slice(&data_len.to_be_bytes());
            buf.extend_from_slice(data);
        }

        let total: u16 = match u16::try_from(buf.len() - len_idx - 2) {
            Ok(len) => len,
            Err(_) => {
                log::error!("Extension block does not fit in u16");
                return Err(AlertDescription::InternalError);
            }
        };
        buf[len_idx..len_idx + 2].copy_from_slice(&total.to_be_bytes());

        Ok(())
    }
}

impl FromIterator<(u16, Vec<u8>)> for Extensions {
    fn from_iter<T: IntoIterator<Item = (u16, Vec<u8>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
