// Every helper takes the remaining buffer and returns (remaining, value)
// so parsers read top to bottom like the wire struct they decode.

use crate::AlertDescription;

fn take<'a>(
    name: &str,
    buf: &'a [u8],
    n: usize,
) -> Result<(&'a [u8], &'a [u8]), AlertDescription> {
    match buf.split_at_checked(n) {
        Some((val, remain)) => Ok((remain, val)),
        None => {
            log::error!("{name} is missing, need {n} B have {} B", buf.len());
            Err(AlertDescription::DecodeError)
        }
    }
}

pub fn u8<'a>(name: &str, buf: &'a [u8]) -> Result<(&'a [u8], u8), AlertDescription> {
    let (remain, val) = take(name, buf, 1)?;
    Ok((remain, val[0]))
}

pub fn u16<'a>(name: &str, buf: &'a [u8]) -> Result<(&'a [u8], u16), AlertDescription> {
    let (remain, val) = fixed::<2>(name, buf)?;
    Ok((remain, u16::from_be_bytes(val)))
}

pub fn fixed<'a, const N: usize>(
    name: &str,
    buf: &'a [u8],
) -> Result<(&'a [u8], [u8; N]), AlertDescription> {
    let (remain, val) = take(name, buf, N)?;
    let mut ret: [u8; N] = [0; N];
    ret.copy_from_slice(val);
    Ok((remain, ret))
}

fn check_len(
    name: &str,
    len: usize,
    min: usize,
    max: usize,
    multiple: usize,
) -> Result<(), AlertDescription> {
    if len < min {
        log::error!("{name} length {len} is less than minimum of {min}");
        return Err(AlertDescription::DecodeError);
    }

    if len > max {
        log::error!("{name} length {len} is greater than maximum of {max}");
        return Err(AlertDescription::DecodeError);
    }

    if len % multiple != 0 {
        log::error!("{name} length {len} is not a multiple of {multiple}");
        return Err(AlertDescription::DecodeError);
    }

    Ok(())
}

/// `opaque data<min..max>` with a one byte length prefix.
pub fn vec8<'a>(
    name: &str,
    buf: &'a [u8],
    min: u8,
    max: u8,
) -> Result<(&'a [u8], &'a [u8]), AlertDescription> {
    let (buf, len) = u8(name, buf)?;
    check_len(name, len.into(), min.into(), max.into(), 1)?;
    take(name, buf, len.into())
}

/// `T data<min..2^16-1>` with a two byte length prefix, where the length
/// must be a multiple of `multiple`.
pub fn vec16<'a>(
    name: &str,
    buf: &'a [u8],
    min: u16,
    multiple: u16,
) -> Result<(&'a [u8], &'a [u8]), AlertDescription> {
    let (buf, len) = u16(name, buf)?;
    check_len(name, len.into(), min.into(), u16::MAX.into(), multiple.into())?;
    take(name, buf, len.into())
}

/// Require that a message has been consumed completely.
pub fn end(name: &str, buf: &[u8]) -> Result<(), AlertDescription> {
    if buf.is_empty() {
        Ok(())
    } else {
        log::error!("{name} has {} B of trailing data", buf.len());
        Err(AlertDescription::DecodeError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec16_rejects_odd_length() {
        assert_eq!(
            vec16("suites", &[0x00, 0x03, 0x00, 0xA8, 0x00], 2, 2),
            Err(AlertDescription::DecodeError)
        );
    }

    #[test]
    fn vec16_rejects_truncated_data() {
        assert_eq!(
            vec16("suites", &[0x00, 0x04, 0x00, 0xA8], 2, 2),
            Err(AlertDescription::DecodeError)
        );
    }

    #[test]
    fn vec8_enforces_maximum() {
        let mut buf: Vec<u8> = vec![33];
        buf.extend_from_slice(&[0; 33]);
        assert_eq!(
            vec8("session_id", &buf, 0, 32),
            Err(AlertDescription::DecodeError)
        );
    }

    #[test]
    fn end_rejects_trailing_bytes() {
        assert!(end("hello", &[]).is_ok());
        assert_eq!(end("hello", &[0]), Err(AlertDescription::DecodeError));
    }
}
