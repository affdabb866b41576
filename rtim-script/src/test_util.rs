//! Builders for hand-made sequence images used by tests.
//!
//! Kept free of crate paths so integration tests can include it as well.

#![allow(dead_code)]

use std::collections::BTreeMap;

pub const TABLE_LEN: usize = 10;

/// One record: `[length, delay, opcode, params...]`.
pub fn rec(delay: u16, opcode: u8, params: &[u16]) -> Vec<u16> {
    let mut r = vec![(3 + params.len()) as u16, delay, opcode as u16];
    r.extend_from_slice(params);
    r
}

pub fn avtl(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

pub fn iff_chunk(id: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = id.to_vec();
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
    if data.len() % 2 == 1 {
        out.push(0);
    }
    out
}

pub fn form(form_type: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = b"FORM".to_vec();
    out.extend_from_slice(&((body.len() + 4) as u32).to_be_bytes());
    out.extend_from_slice(form_type);
    out.extend_from_slice(body);
    out
}

pub fn text_blob(strings: &[&str]) -> Vec<u8> {
    let mut offsets = Vec::new();
    let mut data = Vec::new();
    let base = strings.len() * 2;
    for s in strings {
        offsets.extend_from_slice(&((base + data.len()) as u16).to_le_bytes());
        data.extend_from_slice(s.as_bytes());
        data.push(0);
    }
    offsets.extend(data);
    offsets
}

/// Lays out functions back to back after a ten-entry function table.
#[derive(Default, Clone)]
pub struct ProgramImage {
    functions: BTreeMap<usize, Vec<Vec<u16>>>,
    text: Option<Vec<u8>>,
}

impl ProgramImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function(mut self, index: usize, records: Vec<Vec<u16>>) -> Self {
        self.functions.insert(index, records);
        self
    }

    pub fn text(mut self, strings: &[&str]) -> Self {
        self.text = Some(text_blob(strings));
        self
    }

    /// Word offset of record `n` of function `index`.
    pub fn offset_of(&self, index: usize, n: usize) -> usize {
        let mut off = TABLE_LEN;
        for (&i, records) in &self.functions {
            for (k, r) in records.iter().enumerate() {
                if i == index && k == n {
                    return off;
                }
                off += r.len();
            }
            if i == index && n == records.len() {
                return off;
            }
        }
        panic!("no record {n} in function {index}");
    }

    pub fn words(&self) -> Vec<u16> {
        let mut table = vec![0u16; TABLE_LEN];
        let mut code = Vec::new();
        for (&i, records) in &self.functions {
            table[i] = (TABLE_LEN + code.len()) as u16;
            for r in records {
                code.extend_from_slice(r);
            }
        }
        table.extend(code);
        table
    }

    pub fn build(&self) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(text) = &self.text {
            body.extend(iff_chunk(b"TEXT", text));
        }
        body.extend(iff_chunk(b"AVTL", &avtl(&self.words())));
        form(b"AVFS", &body)
    }
}
