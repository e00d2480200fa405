use crate::alert::AlertDescription;

/// Errors returned by a TLS-PSK connection.
///
/// Every protocol error is fatal: after any of these is returned the
/// connection refuses further use with [`TlsError::Closed`].
#[derive(Debug)]
pub enum TlsError {
    /// A fatal condition was detected locally, the matching alert was sent.
    SendAlert(AlertDescription),
    /// The peer sent an alert.
    RecvAlert(AlertDescription),
    /// Transport failure, only produced by [`PskStream`](crate::PskStream).
    Io(std::io::Error),
    /// The handshake was already started on this connection.
    AlreadyStarted,
    /// The handshake has not been started yet.
    NotStarted,
    /// Application data requires a completed handshake.
    NotConnected,
    /// The connection was closed or failed previously.
    Closed,
}

impl TlsError {
    /// Alert description carried by this error, if any.
    pub fn alert(&self) -> Option<AlertDescription> {
        match self {
            TlsError::SendAlert(ad) | TlsError::RecvAlert(ad) => Some(*ad),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TlsError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<AlertDescription> for TlsError {
    fn from(value: AlertDescription) -> Self {
        Self::SendAlert(value)
    }
}

impl std::fmt::Display for TlsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TlsError::SendAlert(alert_description) => {
                write!(f, "Sent alert {alert_description:?}")
            }
            TlsError::RecvAlert(alert_description) => {
                write!(f, "Received alert {alert_description:?}")
            }
            TlsError::Io(error) => error.fmt(f),
            TlsError::AlreadyStarted => f.write_str("Handshake already started"),
            TlsError::NotStarted => f.write_str("Handshake not started"),
            TlsError::NotConnected => f.write_str("Handshake not complete"),
            TlsError::Closed => f.write_str("Connection closed"),
        }
    }
}

impl std::error::Error for TlsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TlsError::Io(e) => Some(e),
            _ => None,
        }
    }
}
