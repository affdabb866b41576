//! Human-readable listing of a loaded program.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::format::{Instruction, Program, TextTable};
use crate::vm::opcode::{Opcode, NO_TEXT};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inst {
    pub address: usize,
    pub delay: u16,
    pub mnemonic: String,
    pub operands: Vec<String>,
}

impl Inst {
    fn from_instruction(insn: &Instruction<'_>, text: &TextTable) -> Self {
        let Some(op) = insn.decoded() else {
            return Self {
                address: insn.offset,
                delay: insn.delay,
                mnemonic: format!("op_{}", insn.opcode),
                operands: insn.params.iter().map(|p| p.to_string()).collect(),
            };
        };

        let text_params = op.text_params();
        let operands = insn
            .params
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                if !text_params.contains(&i) {
                    return p.to_string();
                }
                if p == NO_TEXT {
                    return "-".to_string();
                }
                match text.entry(p) {
                    Some(s) => format!("{:?}", s),
                    None => format!("text#{}", p),
                }
            })
            .collect();

        Self {
            address: insn.offset,
            delay: insn.delay,
            mnemonic: op.mnemonic().to_string(),
            operands,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub index: usize,
    pub address: usize,
    pub insts: Vec<Inst>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub functions: Vec<Function>,
}

impl Listing {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for func in &self.functions {
            writeln!(f, "function {} @ 0x{:04X}:", func.index, func.address)?;
            for inst in &func.insts {
                write!(f, "  0x{:04X} +{:<4} {}", inst.address, inst.delay, inst.mnemonic)?;
                if !inst.operands.is_empty() {
                    write!(f, " {}", inst.operands.join(", "))?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// List each defined function's records, from its entry up to the next
/// function entry or the end of the stream.
pub fn disassemble(program: &Program) -> Listing {
    disassemble_with(program, &TextTable::new(program.text().cloned(), Default::default()))
}

/// Like [`disassemble`], resolving text through `text`.
pub fn disassemble_with(program: &Program, text: &TextTable) -> Listing {
    let mut entries: Vec<(usize, usize)> = (0..program.function_table().len())
        .filter_map(|i| program.function_entry(i).map(|entry| (i, entry)))
        .collect();
    entries.sort_by_key(|&(_, entry)| entry);

    let mut functions = Vec::with_capacity(entries.len());
    for (n, &(index, entry)) in entries.iter().enumerate() {
        let end = entries[n + 1..]
            .iter()
            .map(|&(_, e)| e)
            .find(|&e| e > entry)
            .unwrap_or(program.instructions().len());
        let insts = program
            .records_from(entry)
            .take_while(|insn| insn.offset < end)
            .map(|insn| Inst::from_instruction(&insn, text))
            .collect();
        functions.push(Function {
            index,
            address: entry,
            insts,
        });
    }
    functions.sort_by_key(|f| f.index);

    Listing { functions }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{rec, ProgramImage};
    use pretty_assertions::assert_eq;

    #[test]
    fn lists_functions_with_text_resolved() {
        let image = ProgramImage::new()
            .text(&["INTRO.WSA", "Yes"])
            .function(
                0,
                vec![
                    rec(0, Opcode::InitAnim as u8, &[0, 0, 10, 20, 1, 0]),
                    rec(4, Opcode::StopCurFunc as u8, &[]),
                ],
            )
            .function(2, vec![rec(0, Opcode::DialogueBox as u8, &[1, NO_TEXT, NO_TEXT]), rec(0, 99, &[7])]);
        let program = Program::load(&image.build()).unwrap();
        let listing = disassemble(&program);

        assert_eq!(listing.functions.len(), 2);
        assert_eq!(
            listing.functions[0].insts,
            vec![
                Inst {
                    address: image.offset_of(0, 0),
                    delay: 0,
                    mnemonic: "init_anim".into(),
                    operands: vec!["0", "\"INTRO.WSA\"", "10", "20", "1", "0"]
                        .into_iter()
                        .map(String::from)
                        .collect(),
                },
                Inst {
                    address: image.offset_of(0, 1),
                    delay: 4,
                    mnemonic: "stop_cur_func".into(),
                    operands: vec![],
                },
            ]
        );
        let f2 = &listing.functions[1];
        assert_eq!(f2.index, 2);
        assert_eq!(f2.insts[0].operands, vec!["\"Yes\"", "-", "-"]);
        assert_eq!(f2.insts[1].mnemonic, "op_99");

        let text = listing.to_string();
        assert!(text.contains("function 2 @ 0x"));
        assert!(text.contains("dialogue_box \"Yes\", -, -"));

        let json: serde_json::Value = serde_json::from_str(&listing.to_json().unwrap()).unwrap();
        assert_eq!(json["functions"][1]["index"], 2);
        assert_eq!(json["functions"][0]["insts"][0]["mnemonic"], "init_anim");
    }
}
