use crate::AlertDescription;

/// # References
///
/// * [RFC 5246 Section 7.4.9](https://datatracker.ietf.org/doc/html/rfc5246#section-7.4.9)
///
/// ```text
/// struct {
///     opaque verify_data[verify_data_length];
/// } Finished;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finished {
    pub verify_data: [u8; Self::VERIFY_DATA_LEN],
}

impl Finished {
    /// verify_data_length for every suite this crate implements.
    pub const VERIFY_DATA_LEN: usize = 12;

    pub fn deser(b: &[u8]) -> Result<Self, AlertDescription> {
        match b.try_into() {
            Ok(verify_data) => Ok(Self { verify_data }),
            Err(_) => {
                log::error!(
                    "Unexpected length for Finished, expected {} B got {} B",
                    Self::VERIFY_DATA_LEN,
                    b.len()
                );
                Err(AlertDescription::DecodeError)
            }
        }
    }
}
