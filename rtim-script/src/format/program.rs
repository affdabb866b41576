use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use byteorder::{ByteOrder, LittleEndian};

use super::iff::{self, ChunkId};
use crate::error::LoadError;
use crate::vm::opcode::Opcode;

/// Upper bound on independently scheduled functions per program.
pub const MAX_FUNCTIONS: usize = 10;

/// `[length, delay, opcode]`
pub const RECORD_HEADER: usize = 3;

const AVFS_ID: ChunkId = *b"AVFS";
const AVTL_ID: ChunkId = *b"AVTL";
const TEXT_ID: ChunkId = *b"TEXT";

/// A decoded view of one instruction record.
///
/// Offsets and lengths are in 16-bit words, relative to the start of the
/// instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    pub offset: usize,
    pub length: usize,
    pub delay: u16,
    pub opcode: u8,
    pub params: &'a [u16],
}

impl<'a> Instruction<'a> {
    /// Parameter `i`, or 0 when the record is shorter.
    #[inline]
    pub fn param(&self, i: usize) -> u16 {
        self.params.get(i).copied().unwrap_or(0)
    }

    #[inline]
    pub fn next_offset(&self) -> usize {
        self.offset + self.length
    }

    #[inline]
    pub fn decoded(&self) -> Option<Opcode> {
        Opcode::decode(self.opcode)
    }
}

/// A loaded sequence program. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Program {
    function_table: Vec<u16>,
    instructions: Arc<[u16]>,
    text: Option<Arc<[u8]>>,
}

impl Program {
    /// Parse an `AVFS` IFF image.
    ///
    /// Every record reachable by linear walk is validated here, so decoding at
    /// run time never reads out of bounds.
    pub fn load(bytes: &[u8]) -> Result<Self, LoadError> {
        let form = iff::read_form(bytes)?;
        if form.form_type != AVFS_ID {
            return Err(LoadError::UnsupportedForm {
                found: iff::id_str(&form.form_type),
            });
        }

        let avtl = form.find(&AVTL_ID).ok_or(LoadError::MissingChunk("AVTL"))?;
        if avtl.data.len() % 2 != 0 {
            return Err(LoadError::OddChunkSize {
                chunk: "AVTL",
                size: avtl.data.len(),
            });
        }

        let mut words = vec![0u16; avtl.data.len() / 2];
        LittleEndian::read_u16_into(avtl.data, &mut words);

        let table_len = words.len().min(MAX_FUNCTIONS);
        let function_table = words[..table_len].to_vec();
        let boundaries = validate_records(&words, table_len)?;

        for (index, &off) in function_table.iter().enumerate() {
            if off != 0 && boundaries.binary_search(&(off as usize)).is_err() {
                return Err(LoadError::InvalidFunctionOffset {
                    index,
                    offset: off as usize,
                });
            }
        }

        let text = form.find(&TEXT_ID).map(|c| Arc::<[u8]>::from(c.data));

        log::debug!(
            "loaded sequence program: {} functions, {} words, {} records, text={}",
            function_table.iter().filter(|&&o| o != 0).count(),
            words.len(),
            boundaries.len(),
            text.as_ref().map_or(0, |t| t.len())
        );

        Ok(Self {
            function_table,
            instructions: words.into(),
            text,
        })
    }

    pub fn load_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("read {:?}", path))?;
        let program = Self::load(&bytes).with_context(|| format!("load sequence {:?}", path))?;
        Ok(program)
    }

    pub fn function_table(&self) -> &[u16] {
        &self.function_table
    }

    /// Entry offset of function `index`, `None` when undefined.
    pub fn function_entry(&self, index: usize) -> Option<usize> {
        match self.function_table.get(index) {
            Some(&off) if off != 0 => Some(off as usize),
            _ => None,
        }
    }

    pub fn instructions(&self) -> &[u16] {
        &self.instructions
    }

    /// First word after the function table.
    pub fn code_start(&self) -> usize {
        self.function_table.len()
    }

    pub fn text(&self) -> Option<&Arc<[u8]>> {
        self.text.as_ref()
    }

    pub fn instruction_at(&self, offset: usize) -> Option<Instruction<'_>> {
        let words = &self.instructions;
        let header = words.get(offset..offset + RECORD_HEADER)?;
        let length = header[0] as usize;
        let params = words.get(offset + RECORD_HEADER..offset + length)?;
        Some(Instruction {
            offset,
            length,
            delay: header[1],
            opcode: (header[2] & 0xFF) as u8,
            params,
        })
    }

    /// Walk records linearly starting at `offset`.
    pub fn records_from(&self, offset: usize) -> Records<'_> {
        Records {
            program: self,
            offset,
        }
    }
}

pub struct Records<'a> {
    program: &'a Program,
    offset: usize,
}

impl<'a> Iterator for Records<'a> {
    type Item = Instruction<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let insn = self.program.instruction_at(self.offset)?;
        self.offset = insn.next_offset();
        Some(insn)
    }
}

fn validate_records(words: &[u16], start: usize) -> Result<Vec<usize>, LoadError> {
    let mut starts = Vec::new();
    let mut off = start;
    while off < words.len() {
        let len = words[off] as usize;
        if len < RECORD_HEADER {
            return Err(LoadError::MalformedInstruction {
                offset: off,
                reason: format!("record length {} is shorter than the header", len),
            });
        }
        if off + len > words.len() {
            return Err(LoadError::MalformedInstruction {
                offset: off,
                reason: format!(
                    "record of {} words runs past the end of the stream ({} words)",
                    len,
                    words.len()
                ),
            });
        }
        if let Some(op) = Opcode::decode((words[off + 2] & 0xFF) as u8) {
            if len < RECORD_HEADER + op.arity() {
                return Err(LoadError::MalformedInstruction {
                    offset: off,
                    reason: format!(
                        "{} needs {} parameter words, record has {}",
                        op,
                        op.arity(),
                        len - RECORD_HEADER
                    ),
                });
            }
        }
        starts.push(off);
        off += len;
    }
    Ok(starts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{avtl, form, iff_chunk, rec, ProgramImage};
    use pretty_assertions::assert_eq;

    #[test]
    fn loads_functions_and_text() {
        let bytes = ProgramImage::new()
            .function(0, vec![rec(0, 4, &[1]), rec(0, 1, &[])])
            .function(1, vec![rec(2, 23, &[])])
            .text(&["A.WSA"])
            .build();

        let p = Program::load(&bytes).unwrap();
        assert_eq!(p.function_table().len(), MAX_FUNCTIONS);
        assert_eq!(p.function_entry(0), Some(MAX_FUNCTIONS));
        assert!(p.function_entry(1).is_some());
        assert_eq!(p.function_entry(2), None);
        assert_eq!(p.function_entry(42), None);
        assert!(p.text().is_some());

        let first = p.instruction_at(p.code_start()).unwrap();
        assert_eq!(first.length, 4);
        assert_eq!(first.decoded(), Some(Opcode::InitFunc));
        assert_eq!(first.params, &[1]);

        let ops: Vec<u8> = p.records_from(p.code_start()).map(|i| i.opcode).collect();
        assert_eq!(ops, vec![4, 1, 23]);
    }

    #[test]
    fn missing_avtl_is_reported() {
        let bytes = form(b"AVFS", &iff_chunk(b"TEXT", &[0, 0]));
        assert_eq!(Program::load(&bytes).unwrap_err(), LoadError::MissingChunk("AVTL"));
    }

    #[test]
    fn wrong_form_type_is_rejected() {
        let bytes = form(b"WSA ", &iff_chunk(b"AVTL", &[0, 0]));
        assert!(matches!(Program::load(&bytes).unwrap_err(), LoadError::UnsupportedForm { .. }));
    }

    #[test]
    fn odd_avtl_is_rejected() {
        let bytes = form(b"AVFS", &iff_chunk(b"AVTL", &[0, 0, 0]));
        assert!(matches!(Program::load(&bytes).unwrap_err(), LoadError::OddChunkSize { .. }));
    }

    #[test]
    fn record_running_off_the_end_fails_at_load() {
        let mut words = vec![0u16; MAX_FUNCTIONS];
        words[0] = MAX_FUNCTIONS as u16;
        words.extend_from_slice(&[8, 0, 1]);
        let bytes = form(b"AVFS", &iff_chunk(b"AVTL", &avtl(&words)));
        assert!(matches!(
            Program::load(&bytes).unwrap_err(),
            LoadError::MalformedInstruction { offset: MAX_FUNCTIONS, .. }
        ));
    }

    #[test]
    fn zero_length_record_fails_at_load() {
        let mut words = vec![0u16; MAX_FUNCTIONS];
        words.extend_from_slice(&[0, 0, 1]);
        let bytes = form(b"AVFS", &iff_chunk(b"AVTL", &avtl(&words)));
        assert!(matches!(Program::load(&bytes).unwrap_err(), LoadError::MalformedInstruction { .. }));
    }

    #[test]
    fn short_params_for_known_opcode_fail_at_load() {
        // init_anim needs six parameters
        let bytes = ProgramImage::new().function(0, vec![rec(0, 2, &[0, 0])]).build();
        assert!(matches!(Program::load(&bytes).unwrap_err(), LoadError::MalformedInstruction { .. }));
    }

    #[test]
    fn unknown_opcode_passes_validation() {
        let bytes = ProgramImage::new()
            .function(0, vec![rec(0, 200, &[1, 2, 3]), rec(0, 1, &[])])
            .build();
        assert!(Program::load(&bytes).is_ok());
    }

    #[test]
    fn function_offset_inside_record_is_rejected() {
        let mut words = vec![0u16; MAX_FUNCTIONS];
        words[0] = MAX_FUNCTIONS as u16 + 1;
        words.extend_from_slice(&[3, 0, 1]);
        let bytes = form(b"AVFS", &iff_chunk(b"AVTL", &avtl(&words)));
        assert_eq!(
            Program::load(&bytes).unwrap_err(),
            LoadError::InvalidFunctionOffset {
                index: 0,
                offset: MAX_FUNCTIONS + 1
            }
        );
    }
}
