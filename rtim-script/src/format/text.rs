use std::borrow::Cow;
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
use rtim_nls::{Decoder, Encoding, TextDecoder};

/// String table from a `TEXT` chunk.
///
/// Entry `i` lives at the byte offset stored as a little-endian u16 at byte
/// `2 * i`, and runs up to the next NUL.
#[derive(Debug, Clone, Default)]
pub struct TextTable {
    blob: Option<Arc<[u8]>>,
    decoder: Decoder,
}

impl TextTable {
    pub fn new(blob: Option<Arc<[u8]>>, encoding: Encoding) -> Self {
        Self {
            blob,
            decoder: Decoder::new(encoding),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blob.as_ref().map_or(true, |b| b.is_empty())
    }

    pub fn blob(&self) -> Option<&Arc<[u8]>> {
        self.blob.as_ref()
    }

    pub fn encoding(&self) -> Encoding {
        self.decoder.encoding()
    }

    /// Bytes from entry `index` to the end of the blob; the entry itself
    /// stops at the first NUL.
    fn entry_tail(&self, index: u16) -> Option<&[u8]> {
        let blob = self.blob.as_deref()?;
        let pos = index as usize * 2;
        if pos + 2 > blob.len() {
            return None;
        }
        let off = LittleEndian::read_u16(&blob[pos..pos + 2]) as usize;
        blob.get(off..).filter(|s| !s.is_empty())
    }

    pub fn entry(&self, index: u16) -> Option<Cow<'_, str>> {
        self.entry_tail(index).map(|b| self.decoder.decode_cstr(b))
    }
}
