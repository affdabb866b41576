//! Interpreter for timed animation sequences.
//!
//! A sequence is an IFF `AVFS` file holding up to ten cooperatively
//! scheduled functions of fixed-layout records. The host loads a
//! [`Program`], wraps it in a [`Sequencer`] together with a
//! [`SequenceHost`] implementation, and calls [`Sequencer::step`] once per
//! frame.
//!
//! ```no_run
//! # use rtim_script::*;
//! # fn run<H: SequenceHost>(host: &mut H, clock: impl Fn() -> u64) -> anyhow::Result<()> {
//! let program = Program::load_file("INTRO.TIM")?;
//! let config = SequencerConfig::default();
//! let mut seq = Sequencer::new(program, &config);
//! while seq.step(host, clock()) == StepResult::Running {
//!     seq.present(host);
//! }
//! let _program = seq.unload(host);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod diag;
pub mod disasm;
pub mod error;
pub mod format;
pub mod host;
pub mod snapshot;
pub mod trace;
pub mod vm;

#[cfg(test)]
mod test_util;

pub use config::{LoggerConfig, SequencerConfig, SequencerConfigBuilder, SequencerConfigReader};
pub use diag::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{LoadError, OpenError, SlotError};
pub use format::{Instruction, Program, TextTable};
pub use host::{DialogueEvent, FadeDirection, HostContext, HostOpcodeTable, SequenceHost, Surface};
pub use vm::dialogue::{DialogueExtension, DialogueLayout, DialogueState};
pub use vm::{CommandResult, Dispatcher, Sequencer, StepResult};
