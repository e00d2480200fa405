use std::fmt::Debug;

use crate::alert::AlertDescription;

/// Content Type.
///
/// # References
///
/// * [RFC 5246 Section 6.2.1](https://datatracker.ietf.org/doc/html/rfc5246#section-6.2.1)
///
/// ```text
/// enum {
///     change_cipher_spec(20), alert(21), handshake(22),
///     application_data(23), (255)
/// } ContentType;
/// ```
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentType {
    ChangeCipherSpec = 20,
    Alert = 21,
    Handshake = 22,
    ApplicationData = 23,
}

impl From<ContentType> for u8 {
    #[inline]
    fn from(content_type: ContentType) -> Self {
        content_type as u8
    }
}

impl TryFrom<u8> for ContentType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            x if x == (Self::ChangeCipherSpec as u8) => Ok(Self::ChangeCipherSpec),
            x if x == (Self::Alert as u8) => Ok(Self::Alert),
            x if x == (Self::Handshake as u8) => Ok(Self::Handshake),
            x if x == (Self::ApplicationData as u8) => Ok(Self::ApplicationData),
            _ => Err(value),
        }
    }
}

/// The only ChangeCipherSpec body.
///
/// ```text
/// struct {
///     enum { change_cipher_spec(1), (255) } type;
/// } ChangeCipherSpec;
/// ```
pub const CHANGE_CIPHER_SPEC: [u8; 1] = [1];

/// # References
///
/// * [RFC 5246 Section 6.2.1](https://datatracker.ietf.org/doc/html/rfc5246#section-6.2.1)
///
/// ```text
/// struct {
///     ContentType type;
///     ProtocolVersion version;
///     uint16 length;
///     opaque fragment[TLSPlaintext.length];
/// } TLSPlaintext;
/// ```
///
/// The content type is kept raw, unknown types are rejected by the
/// record layer once the record is complete.
#[derive(Clone, Copy)]
pub struct RecordHeader {
    buf: [u8; Self::LEN],
}

impl RecordHeader {
    pub const LEN: usize = 5;

    pub fn content_type(&self) -> Result<ContentType, u8> {
        ContentType::try_from(self.buf[0])
    }

    /// Content type exactly as received, for the record MAC / AAD.
    pub fn content_type_byte(&self) -> u8 {
        self.buf[0]
    }

    pub fn version(&self) -> u16 {
        u16::from_be_bytes([self.buf[1], self.buf[2]])
    }

    pub fn length(&self) -> u16 {
        u16::from_be_bytes([self.buf[3], self.buf[4]])
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.buf
    }

    pub fn ser(
        content_type: ContentType,
        version: u16,
        len: usize,
    ) -> Result<Self, AlertDescription> {
        let len_u16: u16 = match u16::try_from(len) {
            Ok(len) => len,
            Err(_) => {
                log::error!("Attempted to create record with length={len} greater than u16");
                return Err(AlertDescription::InternalError);
            }
        };

        let version: [u8; 2] = version.to_be_bytes();
        let len: [u8; 2] = len_u16.to_be_bytes();

        Ok(Self {
            buf: [content_type.into(), version[0], version[1], len[0], len[1]],
        })
    }

    pub fn deser(buf: [u8; Self::LEN]) -> Self {
        Self { buf }
    }
}

impl Debug for RecordHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("RecordHeader");
        match self.content_type() {
            Ok(ct) => s.field("ContentType", &ct),
            Err(raw) => s.field("ContentType", &raw),
        };
        s.field("Version", &format_args!("0x{:04X}", self.version()))
            .field("Length", &self.length())
            .finish()
    }
}
