//! Small pure helpers for units: hex decoding, block depadding, offset rendering.

use crate::error::{Error, Result};
use std::fmt::Write as _;

/// Decode a hex string, with or without a `0x`/`0X` prefix.
///
/// ```
/// use binmill::codec::decode_hex;
///
/// assert_eq!(decode_hex("0xFF").unwrap(), decode_hex("ff").unwrap());
/// let err = decode_hex("0x1G").unwrap_err();
/// assert_eq!(err.position, Some(3));
/// ```
///
/// # Errors
///
/// `Malformed` for an odd number of digits or a non-hex character; the error's
/// `position` is the character index in `text` (prefix included).
pub fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let (digits, skipped) = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(rest) => (rest, 2),
        None => (text, 0),
    };
    hex::decode(digits).map_err(|e| match e {
        hex::FromHexError::InvalidHexCharacter { index, .. } => {
            // `index` counts bytes; everything before the first bad character is ASCII.
            let pos = skipped + index;
            let c = text[pos..].chars().next().unwrap_or_default();
            Error::malformed(format!("invalid hex character {c:?}")).at(pos)
        }
        hex::FromHexError::OddLength => {
            Error::malformed(format!("odd number of hex digits ({})", digits.len())).at(text.len())
        }
        other => Error::malformed(other.to_string()),
    })
}

/// Render `value` as upper-case hex, zero-padded to exactly `width` digits.
///
/// # Errors
///
/// `Malformed` if `value` needs more than `width` digits.
pub fn format_offset(value: u64, width: usize) -> Result<String> {
    let needed = if value == 0 {
        1
    } else {
        (64 - value.leading_zeros() as usize).div_ceil(4)
    };
    if needed > width {
        return Err(Error::malformed(format!(
            "{value:#X} needs {needed} hex digits, width is {width}"
        )));
    }
    let mut out = String::with_capacity(width);
    let _ = write!(out, "{value:0width$X}");
    Ok(out)
}

/// Block padding schemes that [`Padding::depad`] can strip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Padding {
    /// Nothing to strip.
    None,
    /// Trailing zero bytes.
    Zeros,
    /// `n` bytes of value `n`.
    Pkcs7,
    /// `n - 1` zero bytes followed by `n`.
    AnsiX923,
    /// A `0x80` sentinel followed by zero bytes (ISO/IEC 7816-4).
    Iso7816,
}

impl Padding {
    /// Return `data` without its padding.
    ///
    /// # Errors
    ///
    /// `Malformed` if the padding is inconsistent, or if an `Iso7816` block has
    /// no `0x80` sentinel.
    pub fn depad(self, data: &[u8]) -> Result<&[u8]> {
        match self {
            Self::None => Ok(data),
            Self::Zeros => {
                let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                Ok(&data[..end])
            }
            Self::Pkcs7 => {
                let n = counted_pad(data)?;
                let pad = &data[data.len() - n..];
                if pad.iter().any(|&b| usize::from(b) != n) {
                    return Err(Error::malformed("inconsistent PKCS#7 padding bytes"));
                }
                Ok(&data[..data.len() - n])
            }
            Self::AnsiX923 => {
                let n = counted_pad(data)?;
                let fill = &data[data.len() - n..data.len() - 1];
                if let Some(i) = fill.iter().position(|&b| b != 0) {
                    return Err(Error::malformed("non-zero ANSI X.923 fill byte")
                        .at(data.len() - n + i));
                }
                Ok(&data[..data.len() - n])
            }
            Self::Iso7816 => match data.iter().rposition(|&b| b != 0) {
                Some(i) if data[i] == 0x80 => Ok(&data[..i]),
                Some(i) => Err(Error::malformed(format!(
                    "expected 0x80 padding sentinel, found {:#04x}",
                    data[i]
                ))
                .at(i)),
                None => Err(Error::malformed("no 0x80 padding sentinel")),
            },
        }
    }
}

/// Pad length announced by the last byte, checked against the data length.
fn counted_pad(data: &[u8]) -> Result<usize> {
    let Some(&last) = data.last() else {
        return Err(Error::malformed("cannot depad empty data"));
    };
    let n = usize::from(last);
    if n == 0 || n > data.len() {
        return Err(Error::malformed(format!(
            "pad length {n} invalid for {} byte(s)",
            data.len()
        ))
        .at(data.len() - 1));
    }
    Ok(n)
}
