/// Protocol version.
///
/// # References
///
/// * [RFC 5246 Section 6.2.1](https://datatracker.ietf.org/doc/html/rfc5246#section-6.2.1)
///
/// ```text
/// struct {
///     uint8 major;
///     uint8 minor;
/// } ProtocolVersion;
/// ```
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    V1_0 = 0x0301,
    V1_1 = 0x0302,
    V1_2 = 0x0303,
}

impl From<TlsVersion> for u16 {
    #[inline]
    fn from(tls_version: TlsVersion) -> Self {
        tls_version as u16
    }
}

impl TryFrom<u16> for TlsVersion {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            x if x == (Self::V1_0 as u16) => Ok(Self::V1_0),
            x if x == (Self::V1_1 as u16) => Ok(Self::V1_1),
            x if x == (Self::V1_2 as u16) => Ok(Self::V1_2),
            _ => Err(value),
        }
    }
}

impl TlsVersion {
    pub const MIN: Self = Self::V1_0;
    pub const MAX: Self = Self::V1_2;

    pub const fn to_be_bytes(self) -> [u8; 2] {
        (self as u16).to_be_bytes()
    }

    /// Version both sides speak when a client offers `offered`.
    ///
    /// Anything newer than `max` is answered with `max`; anything older
    /// than TLS 1.0 has no counterpart.
    pub fn negotiate(offered: u16, max: TlsVersion) -> Option<TlsVersion> {
        if offered < u16::from(Self::MIN) {
            None
        } else if offered >= u16::from(max) {
            Some(max)
        } else {
            TlsVersion::try_from(offered).ok()
        }
    }
}
