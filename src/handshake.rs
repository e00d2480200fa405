mod client_hello;
pub mod extension;
mod finished;
mod key_exchange;
mod server_hello;

pub use client_hello::ClientHello;
pub use extension::Extensions;
pub(crate) use finished::Finished;
pub(crate) use key_exchange::PskIdentity;
pub use server_hello::ServerHello;

use crate::AlertDescription;

/// Handshake Type.
///
/// # References
///
/// * [RFC 5246 Section 7.4](https://datatracker.ietf.org/doc/html/rfc5246#section-7.4)
///
/// ```text
/// enum {
///     hello_request(0), client_hello(1), server_hello(2),
///     certificate(11), server_key_exchange (12),
///     certificate_request(13), server_hello_done(14),
///     certificate_verify(15), client_key_exchange(16),
///     finished(20), (255)
/// } HandshakeType;
/// ```
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum HandshakeType {
    HelloRequest = 0,
    ClientHello = 1,
    ServerHello = 2,
    Certificate = 11,
    ServerKeyExchange = 12,
    CertificateRequest = 13,
    ServerHelloDone = 14,
    CertificateVerify = 15,
    ClientKeyExchange = 16,
    Finished = 20,
}

impl From<HandshakeType> for u8 {
    #[inline]
    fn from(handshake_type: HandshakeType) -> Self {
        handshake_type as u8
    }
}

impl TryFrom<u8> for HandshakeType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            x if x == (Self::HelloRequest as u8) => Ok(Self::HelloRequest),
            x if x == (Self::ClientHello as u8) => Ok(Self::ClientHello),
            x if x == (Self::ServerHello as u8) => Ok(Self::ServerHello),
            x if x == (Self::Certificate as u8) => Ok(Self::Certificate),
            x if x == (Self::ServerKeyExchange as u8) => Ok(Self::ServerKeyExchange),
            x if x == (Self::CertificateRequest as u8) => Ok(Self::CertificateRequest),
            x if x == (Self::ServerHelloDone as u8) => Ok(Self::ServerHelloDone),
            x if x == (Self::CertificateVerify as u8) => Ok(Self::CertificateVerify),
            x if x == (Self::ClientKeyExchange as u8) => Ok(Self::ClientKeyExchange),
            x if x == (Self::Finished as u8) => Ok(Self::Finished),
            _ => Err(value),
        }
    }
}

/// # References
///
/// * [RFC 5246 Section 7.4](https://datatracker.ietf.org/doc/html/rfc5246#section-7.4)
///
/// ```text
/// struct {
///     HandshakeType msg_type;    /* handshake type */
///     uint24 length;             /* bytes in message */
///     select (HandshakeType) { ... } body;
/// } Handshake;
/// ```
#[derive(Debug)]
pub struct HandshakeHeader {
    msg_type: HandshakeType,
    length: u32,
}

impl HandshakeHeader {
    pub const LEN: usize = 4;

    /// Largest message accepted from a peer.
    ///
    /// The wire allows 2^24-1, nothing in a PSK handshake comes close.
    pub const MAX_LENGTH: u32 = 1 << 15;

    pub fn deser(buf: [u8; Self::LEN]) -> Result<Self, AlertDescription> {
        let msg_type: HandshakeType = match buf[0].try_into() {
            Ok(msg_type) => msg_type,
            Err(val) => {
                log::error!("Peer sent an invalid HandshakeType value: 0x{val:02X}");
                return Err(AlertDescription::UnexpectedMessage);
            }
        };
        let length: u32 = u32::from_be_bytes(buf) & 0x00FF_FFFF;

        if length > Self::MAX_LENGTH {
            log::error!(
                "{msg_type:?} length={length} is greater than maximum of {}",
                Self::MAX_LENGTH
            );
            return Err(AlertDescription::RecordOverflow);
        }

        Ok(Self { msg_type, length })
    }

    pub fn msg_type(&self) -> HandshakeType {
        self.msg_type
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    /// Frame a handshake body as `msg_type | uint24 length | body`.
    pub fn prepend_header(
        msg_type: HandshakeType,
        data: &[u8],
    ) -> Result<Vec<u8>, AlertDescription> {
        let length: u32 = match u32::try_from(data.len()) {
            Ok(len) if len <= 0x00FF_FFFF => len,
            _ => {
                log::error!("{msg_type:?} body of {} B does not fit in uint24", data.len());
                return Err(AlertDescription::InternalError);
            }
        };

        log::debug!("> {msg_type:?} length={length}");

        let mut buf: Vec<u8> = Vec::with_capacity(Self::LEN + data.len());
        buf.extend_from_slice(&length.to_be_bytes());
        buf[0] = msg_type.into();
        buf.extend_from_slice(data);

        Ok(buf)
    }
}

/// A handshake message reassembled from one or more records.
#[derive(Debug)]
pub struct HandshakeMessage {
    pub msg_type: HandshakeType,
    /// Header and body, exactly as they appear in the transcript.
    pub raw: Vec<u8>,
}

impl HandshakeMessage {
    pub fn body(&self) -> &[u8] {
        &self.raw[HandshakeHeader::LEN..]
    }
}

/// Reassembles handshake messages from the plaintext of HANDSHAKE records.
///
/// Messages may span records and records may carry several messages.
#[derive(Debug, Default)]
pub struct HandshakeBuffer {
    buf: Vec<u8>,
}

impl HandshakeBuffer {
    pub fn extend(&mut self, fragment: &[u8]) {
        self.buf.extend_from_slice(fragment);
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Pop the next complete message, `Ok(None)` if more data is required.
    pub fn next_message(&mut self) -> Result<Option<HandshakeMessage>, AlertDescription> {
        let Some(hdr_buf) = self.buf.first_chunk::<{ HandshakeHeader::LEN }>() else {
            return Ok(None);
        };

        let hdr: HandshakeHeader = HandshakeHeader::deser(*hdr_buf)?;

        // MAX_LENGTH keeps this well within usize
        let total: usize = HandshakeHeader::LEN + hdr.length() as usize;
        if self.buf.len() < total {
            log::trace!(
                "{:?} incomplete, have {} B of {} B",
                hdr.msg_type(),
                self.buf.len(),
                total
            );
            return Ok(None);
        }

        log::debug!("< {hdr:?}");

        let raw: Vec<u8> = self.buf.drain(..total).collect();

        Ok(Some(HandshakeMessage {
            msg_type: hdr.msg_type(),
            raw,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_split_across_fragments() {
        let msg = HandshakeHeader::prepend_header(HandshakeType::Finished, &[7; 12]).unwrap();

        let mut hb = HandshakeBuffer::default();
        hb.extend(&msg[..3]);
        assert!(hb.next_message().unwrap().is_none());
        hb.extend(&msg[3..10]);
        assert!(hb.next_message().unwrap().is_none());
        hb.extend(&msg[10..]);

        let out = hb.next_message().unwrap().unwrap();
        assert_eq!(out.msg_type, HandshakeType::Finished);
        assert_eq!(out.raw, msg);
        assert_eq!(out.body(), &[7; 12]);
        assert!(hb.is_empty());
    }

    #[test]
    fn two_messages_in_one_fragment() {
        let mut data =
            HandshakeHeader::prepend_header(HandshakeType::ServerHelloDone, &[]).unwrap();
        data.extend(HandshakeHeader::prepend_header(HandshakeType::Finished, &[1; 12]).unwrap());

        let mut hb = HandshakeBuffer::default();
        hb.extend(&data);

        assert_eq!(
            hb.next_message().unwrap().unwrap().msg_type,
            HandshakeType::ServerHelloDone
        );
        assert_eq!(
            hb.next_message().unwrap().unwrap().msg_type,
            HandshakeType::Finished
        );
        assert!(hb.next_message().unwrap().is_none());
    }

    #[test]
    fn oversized_message_is_record_overflow() {
        let mut hb = HandshakeBuffer::default();
        hb.extend(&[HandshakeType::ClientHello.into(), 0x00, 0x80, 0x01]);
        assert_eq!(
            hb.next_message().err(),
            Some(AlertDescription::RecordOverflow)
        );
    }

    #[test]
    fn unknown_type_is_unexpected() {
        let mut hb = HandshakeBuffer::default();
        hb.extend(&[0x63, 0x00, 0x00, 0x00]);
        assert_eq!(
            hb.next_message().err(),
            Some(AlertDescription::UnexpectedMessage)
        );
    }
}
