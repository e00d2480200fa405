use crate::{AlertDescription, parse};

/// PSK identity or identity hint.
///
/// Used as the body of both ServerKeyExchange (hint) and
/// ClientKeyExchange (identity) for plain PSK key exchange.
///
/// # References
///
/// * [RFC 4279 Section 2](https://datatracker.ietf.org/doc/html/rfc4279#section-2)
///
/// ```text
/// struct {
///     select (KeyExchangeAlgorithm) {
///         case psk:  /* NEW */
///             opaque psk_identity_hint<0..2^16-1>;
///     };
/// } ServerKeyExchange;
///
/// struct {
///     select (KeyExchangeAlgorithm) {
///         case psk:   /* NEW */
///             opaque psk_identity<0..2^16-1>;
///     } exchange_keys;
/// } ClientKeyExchange;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PskIdentity(pub Vec<u8>);

impl PskIdentity {
    pub fn deser(name: &str, b: &[u8]) -> Result<Self, AlertDescription> {
        let (remain, identity): (_, &[u8]) = parse::vec16(name, b, 0, 1)?;
        parse::end(name, remain)?;
        Ok(Self(identity.to_vec()))
    }

    pub fn ser(&self) -> Result<Vec<u8>, AlertDescription> {
        let len: u16 = match u16::try_from(self.0.len()) {
            Ok(len) => len,
            Err(_) => {
                log::error!("PSK identity of {} B does not fit in u16", self.0.len());
                return Err(AlertDescription::InternalError);
            }
        };

        let mut buf: Vec<u8> = Vec::with_capacity(2 + self.0.len());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(&self.0);
        Ok(buf)
    }
}
