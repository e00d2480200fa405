/// Alert level.
///
/// # References
///
/// * [RFC 5246 Section 7.2](https://datatracker.ietf.org/doc/html/rfc5246#section-7.2)
///
/// ```text
/// enum { warning(1), fatal(2), (255) } AlertLevel;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Warning,
    Fatal,
    /// Level byte outside of the registry, kept as received.
    Unknown(u8),
}

impl From<AlertLevel> for u8 {
    #[inline]
    fn from(level: AlertLevel) -> Self {
        match level {
            AlertLevel::Warning => 1,
            AlertLevel::Fatal => 2,
            AlertLevel::Unknown(val) => val,
        }
    }
}

impl From<u8> for AlertLevel {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Warning,
            2 => Self::Fatal,
            _ => Self::Unknown(value),
        }
    }
}

/// Alert description.
///
/// # References
///
/// * [RFC 5246 Section 7.2](https://datatracker.ietf.org/doc/html/rfc5246#section-7.2)
/// * [RFC 4279 Section 2](https://datatracker.ietf.org/doc/html/rfc4279#section-2)
/// * [RFC 6066 Section 4](https://datatracker.ietf.org/doc/html/rfc6066#section-4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AlertDescription {
    CloseNotify,
    UnexpectedMessage,
    BadRecordMac,
    DecryptionFailed,
    RecordOverflow,
    DecompressionFailure,
    HandshakeFailure,
    IllegalParameter,
    AccessDenied,
    DecodeError,
    DecryptError,
    ProtocolVersion,
    InsufficientSecurity,
    InternalError,
    UserCanceled,
    NoRenegotiation,
    UnsupportedExtension,
    UnknownPskIdentity,
    /// Description code without a variant above, kept as received.
    ///
    /// Only produced by parsing; registered codes always map to their
    /// named variant.
    Unknown(u8),
}

impl From<AlertDescription> for u8 {
    fn from(description: AlertDescription) -> Self {
        match description {
            AlertDescription::CloseNotify => 0,
            AlertDescription::UnexpectedMessage => 10,
            AlertDescription::BadRecordMac => 20,
            AlertDescription::DecryptionFailed => 21,
            AlertDescription::RecordOverflow => 22,
            AlertDescription::DecompressionFailure => 30,
            AlertDescription::HandshakeFailure => 40,
            AlertDescription::IllegalParameter => 47,
            AlertDescription::AccessDenied => 49,
            AlertDescription::DecodeError => 50,
            AlertDescription::DecryptError => 51,
            AlertDescription::ProtocolVersion => 70,
            AlertDescription::InsufficientSecurity => 71,
            AlertDescription::InternalError => 80,
            AlertDescription::UserCanceled => 90,
            AlertDescription::NoRenegotiation => 100,
            AlertDescription::UnsupportedExtension => 110,
            AlertDescription::UnknownPskIdentity => 115,
            AlertDescription::Unknown(val) => val,
        }
    }
}

impl From<u8> for AlertDescription {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::CloseNotify,
            10 => Self::UnexpectedMessage,
            20 => Self::BadRecordMac,
            21 => Self::DecryptionFailed,
            22 => Self::RecordOverflow,
            30 => Self::DecompressionFailure,
            40 => Self::HandshakeFailure,
            47 => Self::IllegalParameter,
            49 => Self::AccessDenied,
            50 => Self::DecodeError,
            51 => Self::DecryptError,
            70 => Self::ProtocolVersion,
            71 => Self::InsufficientSecurity,
            80 => Self::InternalError,
            90 => Self::UserCanceled,
            100 => Self::NoRenegotiation,
            110 => Self::UnsupportedExtension,
            115 => Self::UnknownPskIdentity,
            _ => Self::Unknown(value),
        }
    }
}

/// # References
///
/// * [RFC 5246 Section 7.2](https://datatracker.ietf.org/doc/html/rfc5246#section-7.2)
///
/// ```text
/// struct {
///     AlertLevel level;
///     AlertDescription description;
/// } Alert;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub description: AlertDescription,
}

impl Alert {
    pub const LEN: usize = 2;

    pub const fn new_fatal(description: AlertDescription) -> Self {
        Self {
            level: AlertLevel::Fatal,
            description,
        }
    }

    pub const fn new_warning(description: AlertDescription) -> Self {
        Self {
            level: AlertLevel::Warning,
            description,
        }
    }

    pub fn to_be_bytes(self) -> [u8; Self::LEN] {
        [self.level.into(), self.description.into()]
    }

    /// Parse an alert from the wire.
    ///
    /// Never fails: the peer is shutting the connection down whatever the
    /// bytes say, so unregistered codes are kept as received.
    pub fn from_be_bytes(buf: [u8; Self::LEN]) -> Self {
        Self {
            level: AlertLevel::from(buf[0]),
            description: AlertDescription::from(buf[1]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_codes_are_named() {
        let alert = Alert::from_be_bytes([2, 115]);
        assert_eq!(alert, Alert::new_fatal(AlertDescription::UnknownPskIdentity));
        assert_eq!(alert.to_be_bytes(), [2, 115]);
        assert_eq!(
            Alert::from_be_bytes([1, 0]),
            Alert::new_warning(AlertDescription::CloseNotify)
        );
    }

    #[test]
    fn unregistered_codes_kept() {
        // bad_certificate is not part of a PSK handshake
        let alert = Alert::from_be_bytes([7, 42]);
        assert_eq!(alert.level, AlertLevel::Unknown(7));
        assert_eq!(alert.description, AlertDescription::Unknown(42));
        assert_eq!(alert.to_be_bytes(), [7, 42]);
    }
}
