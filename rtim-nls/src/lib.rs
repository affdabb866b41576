//! Text decoding for sequence string tables.
//!
//! Sequence text blobs are raw bytes in whatever code page the release was
//! authored in. File names are plain ASCII, dialogue labels are not.

use encoding_rs::{Encoding as RsEncoding, SHIFT_JIS, UTF_8, WINDOWS_1252};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

pub trait TextDecoder {
    fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str>;

    /// Decode C-style string: stop at the first NUL (0x00).
    fn decode_cstr<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        self.decode(&bytes[..end])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Utf8,
    /// Western European DOS/Windows releases.
    #[default]
    Western,
    /// PC-98 / FM-Towns Japanese releases.
    ShiftJis,
}

impl Encoding {
    #[inline]
    pub fn as_encoding_rs(self) -> &'static RsEncoding {
        match self {
            Encoding::Utf8 => UTF_8,
            Encoding::Western => WINDOWS_1252,
            Encoding::ShiftJis => SHIFT_JIS,
        }
    }
}

/// A simple decoder bound to one encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    enc: Encoding,
}

impl Decoder {
    #[inline]
    pub fn new(enc: Encoding) -> Self {
        Self { enc }
    }

    #[inline]
    pub fn encoding(&self) -> Encoding {
        self.enc
    }
}

impl TextDecoder for Decoder {
    fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self.enc {
            Encoding::Utf8 => match std::str::from_utf8(bytes) {
                Ok(s) => Cow::Borrowed(s),
                Err(_) => Cow::Owned(String::from_utf8_lossy(bytes).into_owned()),
            },
            Encoding::Western | Encoding::ShiftJis => {
                let (cow, _had_errors) = self
                    .enc
                    .as_encoding_rs()
                    .decode_without_bom_handling(bytes);
                cow
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cstr_stops_at_nul() {
        let d = Decoder::new(Encoding::Western);
        assert_eq!(d.decode_cstr(b"INTRO.WSA\0junk"), "INTRO.WSA");
        assert_eq!(d.decode_cstr(b"NOTERM"), "NOTERM");
    }

    #[test]
    fn western_maps_high_bytes() {
        let d = Decoder::new(Encoding::Western);
        assert_eq!(d.decode(&[0x4A, 0xE4]), "J\u{e4}");
    }

    #[test]
    fn shift_jis_decodes_double_byte() {
        let d = Decoder::new(Encoding::ShiftJis);
        assert_eq!(d.decode(&[0x82, 0xCD, 0x82, 0xA2]), "はい");
    }
}
