//! Minimal IFF walker over an in-memory buffer.
//!
//! Chunk headers are big-endian, as in every IFF file. Payloads are handed out
//! untouched; interpreting their byte order is the caller's business.

use byteorder::{BigEndian, ByteOrder};

use crate::error::LoadError;

pub type ChunkId = [u8; 4];

pub const FORM_ID: ChunkId = *b"FORM";

#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub id: ChunkId,
    pub data: &'a [u8],
}

#[derive(Debug, Clone)]
pub struct Form<'a> {
    pub form_type: ChunkId,
    pub chunks: Vec<Chunk<'a>>,
}

impl<'a> Form<'a> {
    pub fn find(&self, id: &ChunkId) -> Option<&Chunk<'a>> {
        self.chunks.iter().find(|c| &c.id == id)
    }
}

pub fn id_str(id: &[u8]) -> String {
    String::from_utf8_lossy(id).into_owned()
}

pub fn read_form(bytes: &[u8]) -> Result<Form<'_>, LoadError> {
    if bytes.len() < 4 || bytes[..4] != FORM_ID {
        return Err(LoadError::InvalidHeader {
            found: id_str(&bytes[..bytes.len().min(4)]),
        });
    }
    if bytes.len() < 8 {
        return Err(LoadError::Truncated {
            chunk: id_str(&FORM_ID),
            declared: 4,
            available: bytes.len() - 4,
        });
    }

    let declared = BigEndian::read_u32(&bytes[4..8]) as usize;
    let body = &bytes[8..];
    if declared > body.len() || declared < 4 {
        return Err(LoadError::Truncated {
            chunk: id_str(&FORM_ID),
            declared: declared.max(4),
            available: body.len().min(declared),
        });
    }
    let body = &body[..declared];

    let mut form_type = [0u8; 4];
    form_type.copy_from_slice(&body[..4]);

    let mut chunks = Vec::new();
    let mut off = 4;
    while off < body.len() {
        let remaining = body.len() - off;
        if remaining < 8 {
            return Err(LoadError::Truncated {
                chunk: id_str(&body[off..off + remaining.min(4)]),
                declared: 8,
                available: remaining,
            });
        }

        let mut id = [0u8; 4];
        id.copy_from_slice(&body[off..off + 4]);
        let size = BigEndian::read_u32(&body[off + 4..off + 8]) as usize;
        let start = off + 8;
        let available = body.len() - start;
        if size > available {
            return Err(LoadError::Truncated {
                chunk: id_str(&id),
                declared: size,
                available,
            });
        }

        chunks.push(Chunk {
            id,
            data: &body[start..start + size],
        });

        // payloads are padded to even length; a missing final pad byte is tolerated
        off = start + size + (size & 1);
    }

    Ok(Form { form_type, chunks })
}
