//! Cooperative scheduler for sequence programs.
//!
//! A [`Sequencer`] owns a loaded [`Program`] plus its ten function slots. The
//! host calls [`Sequencer::step`] once per frame with its clock; every due
//! function then runs records until one of them asks to wait, stop or park.

pub mod anim;
pub mod dialogue;
pub mod dispatch;
pub mod function;
pub mod opcode;
mod runtime;

use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::SequencerConfig;
use crate::diag::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::format::{Instruction, Program, TextTable, MAX_FUNCTIONS};
use crate::host::{HostOpcodeTable, SequenceHost};
use crate::snapshot::SequenceSnapshot;
use crate::trace::{self, TraceKind, TraceRecord};

use anim::AnimationSlots;
use dialogue::{DialogueExtension, DialogueState};
use dispatch::Exec;
use function::FunctionSlot;
use opcode::Opcode;
use runtime::Runtime;

pub use dispatch::{CommandResult, Dispatcher};

/// Upper bound of the random extra wait added by `continue_loop`, before it
/// is scaled by the loop factor.
const JITTER_SCALE: u32 = 0x8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Running,
    /// Function 0 has stopped, or a record stopped the whole program.
    Finished,
}

pub struct Sequencer<H: SequenceHost> {
    program: Program,
    text: TextTable,
    dispatcher: Dispatcher<H>,
    opcodes: Option<HostOpcodeTable<H>>,
    rt: Runtime<H::Animation>,
    diag: Diagnostics,
    rng: SmallRng,
    tick_length: u64,
    max_burst: usize,
    started: bool,
    steps: u64,
    trace: Option<Vec<TraceRecord>>,
}

impl<H: SequenceHost> Sequencer<H> {
    /// Wrap `program` without running anything; function 0 starts on the
    /// first [`step`](Self::step).
    pub fn new(program: Program, config: &SequencerConfig) -> Self {
        #[cfg(feature = "logger")]
        if let Some(logger) = &config.logger {
            logger.init();
        }

        let rng = match config.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let text = TextTable::new(program.text().cloned(), config.encoding);

        Self {
            program,
            text,
            dispatcher: Dispatcher::new(),
            opcodes: None,
            rt: Runtime::default(),
            diag: Diagnostics::new(config.diagnostics_capacity),
            rng,
            tick_length: u64::from(config.tick_length),
            max_burst: config.max_burst.max(1),
            started: false,
            steps: 0,
            trace: config.record_trace.then(Vec::new),
        }
    }

    /// Enable the dialogue opcodes.
    pub fn with_dialogue(mut self, ext: DialogueExtension) -> Self {
        self.dispatcher = Dispatcher::with_dialogue(ext);
        self
    }

    pub fn with_host_opcodes(mut self, table: HostOpcodeTable<H>) -> Self {
        self.opcodes = Some(table);
        self
    }

    /// Replace the loop jitter source.
    pub fn with_rng(mut self, rng: SmallRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn function(&self, index: usize) -> Option<&FunctionSlot> {
        self.rt.functions.get(index)
    }

    pub fn functions(&self) -> &[FunctionSlot] {
        &self.rt.functions
    }

    pub fn animations(&self) -> &AnimationSlots<H::Animation> {
        &self.rt.anims
    }

    pub fn dialogue(&self) -> Option<&DialogueState> {
        self.rt.dialogue.as_ref()
    }

    /// Choice confirmed by the most recent dialogue box.
    pub fn choice(&self) -> Option<u16> {
        self.rt.choice
    }

    pub fn voice(&self, slot: usize) -> Option<&str> {
        self.rt.voices.get(slot)?.as_deref()
    }

    pub fn last_host_result(&self) -> i32 {
        self.rt.last_host_result
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    /// Executed records, oldest first. `None` unless `record_trace` is set.
    pub fn trace(&self) -> Option<&[TraceRecord]> {
        self.trace.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.rt.finished
    }

    pub fn tick_length(&self) -> u64 {
        self.tick_length
    }

    /// Number of steps taken so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn text(&self) -> &TextTable {
        &self.text
    }

    /// Advance the sequence to host time `now` (milliseconds).
    pub fn step(&mut self, host: &mut H, now: u64) -> StepResult {
        if self.rt.finished {
            return StepResult::Finished;
        }

        if !self.started {
            self.started = true;
            let Some(entry) = self.program.function_entry(0) else {
                self.report(now, Some(0), DiagnosticKind::Lifecycle, "function 0 is undefined".into());
                self.rt.finished = true;
                return StepResult::Finished;
            };
            self.rt.functions[0].start(entry, now);
            log::debug!("sequence started at {}ms, function 0 at 0x{:04X}", now, entry);
        }

        self.steps += 1;
        self.poll_dialogue(host, now);

        for f in 0..MAX_FUNCTIONS {
            if self.rt.finished {
                break;
            }
            self.run_function(host, f, now);
        }

        if !self.rt.finished && !self.rt.functions[0].is_running() {
            log::debug!("function 0 stopped at {}ms, sequence finished", now);
            self.rt.finished = true;
        }

        if self.rt.finished {
            StepResult::Finished
        } else {
            StepResult::Running
        }
    }

    fn report(&mut self, now: u64, function: Option<usize>, kind: DiagnosticKind, message: String) {
        self.diag.report(Diagnostic {
            time: now,
            function,
            offset: None,
            kind,
            message,
        });
    }

    fn poll_dialogue(&mut self, host: &mut H, now: u64) {
        if self.dispatcher.dialogue().is_none() {
            return;
        }
        let Some(state) = &self.rt.dialogue else {
            return;
        };
        let current = state.proc_function();
        let insn = Instruction {
            offset: state.offset(),
            length: 0,
            delay: 0,
            opcode: Opcode::ProcessDialogue as u8,
            params: &[],
        };

        let Self {
            program,
            text,
            dispatcher,
            opcodes,
            rt,
            diag,
            ..
        } = self;
        let mut x = Exec {
            host,
            rt,
            program,
            text,
            opcodes: opcodes.as_ref(),
            dialogue: dispatcher.dialogue(),
            diag,
            current,
            now,
        };
        dispatcher.dispatch(&mut x, &insn);
    }

    fn run_function(&mut self, host: &mut H, f: usize, now: u64) {
        let Self {
            program,
            text,
            dispatcher,
            opcodes,
            rt,
            diag,
            rng,
            tick_length,
            max_burst,
            trace: recorded,
            ..
        } = self;
        let tick = *tick_length;
        let mut count = 0usize;

        loop {
            if rt.is_parked(f) || !rt.functions[f].is_due(now) {
                break;
            }
            if count >= *max_burst {
                diag.report(Diagnostic {
                    time: now,
                    function: Some(f),
                    offset: rt.functions[f].ip,
                    kind: DiagnosticKind::Scheduling,
                    message: format!("runaway function, {} records in one step", count),
                });
                break;
            }

            let Some(ip) = rt.functions[f].ip else {
                break;
            };
            let Some(insn) = program.instruction_at(ip) else {
                diag.report(Diagnostic {
                    time: now,
                    function: Some(f),
                    offset: Some(ip),
                    kind: DiagnosticKind::Scheduling,
                    message: "function ran off the end of the instruction stream".into(),
                });
                rt.functions[f].stop();
                break;
            };
            count += 1;

            if let Some(records) = recorded.as_mut() {
                records.push(TraceRecord {
                    time: now,
                    function: f,
                    offset: ip,
                    opcode: insn.opcode,
                });
            }
            if trace::enabled(TraceKind::Vm) {
                match insn.decoded() {
                    Some(op) => log::trace!("[{}ms] func {} 0x{:04X} {} {:?}", now, f, ip, op, insn.params),
                    None => log::trace!("[{}ms] func {} 0x{:04X} op{} {:?}", now, f, ip, insn.opcode, insn.params),
                }
            }

            let result = {
                let mut x = Exec {
                    host: &mut *host,
                    rt: &mut *rt,
                    program: &*program,
                    text: &*text,
                    opcodes: opcodes.as_ref(),
                    dialogue: dispatcher.dialogue(),
                    diag: &mut *diag,
                    current: f,
                    now,
                };
                dispatcher.dispatch(&mut x, &insn)
            };

            let wait = u64::from(insn.delay) * tick;
            match result {
                CommandResult::Continue | CommandResult::Yield => {
                    let slot = &mut rt.functions[f];
                    if slot.ip == Some(insn.offset) {
                        slot.advance(insn.next_offset(), wait);
                    }
                    if result == CommandResult::Yield || !slot.is_running() {
                        break;
                    }
                }
                CommandResult::StopFunction => {
                    rt.functions[f].stop();
                    break;
                }
                CommandResult::StopProgram => {
                    log::debug!("func {} stopped the program at {}ms", f, now);
                    rt.stop_all();
                    if let Some(state) = rt.dialogue.take() {
                        host.close_dialogue(&state);
                    }
                    rt.finished = true;
                    break;
                }
                CommandResult::EnterDialogue => break,
                CommandResult::RepeatLoop { factor } => {
                    let slot = &mut rt.functions[f];
                    match slot.loop_ip {
                        Some(anchor) => {
                            let roll = u64::from(rng.gen_range(0..=JITTER_SCALE));
                            let jitter = roll * u64::from(factor) / u64::from(JITTER_SCALE);
                            slot.advance(anchor, wait + jitter * tick);
                        }
                        None => slot.advance(insn.next_offset(), wait),
                    }
                    break;
                }
                CommandResult::Jumped => {}
            }
        }
    }

    /// Push every running function's clock forward by `elapsed` ms, e.g.
    /// after the host was paused.
    pub fn resync(&mut self, elapsed: u64) {
        for f in self.rt.functions.iter_mut() {
            f.shift(elapsed);
        }
        log::debug!("resynced running functions by {}ms", elapsed);
    }

    /// Swap the string table, e.g. for another language. Running records
    /// resolve text through the new table from the next lookup on.
    pub fn set_text_source(&mut self, blob: Option<Arc<[u8]>>) {
        self.text = TextTable::new(blob, self.text.encoding());
    }

    /// Draw every animation frame queued since the last present.
    pub fn present(&mut self, host: &mut H) -> usize {
        self.rt.anims.present(host)
    }

    pub fn snapshot(&self) -> SequenceSnapshot {
        let mut snap = SequenceSnapshot::default();
        snap.update_from_sequencer(self);
        snap
    }

    /// Tear the sequence down and hand the program back.
    ///
    /// Animation slots should be closed by the script itself; any left open
    /// are reported and closed here.
    pub fn unload(mut self, host: &mut H) -> Program {
        let open = self.rt.anims.open_count();
        if open > 0 {
            let now = self.rt.functions.iter().map(|f| f.next_time).max().unwrap_or(0);
            self.report(
                now,
                None,
                DiagnosticKind::Lifecycle,
                format!("unloading with {} animation slot(s) still open", open),
            );
            self.rt.anims.close_all(host);
        }
        if let Some(state) = self.rt.dialogue.take() {
            host.close_dialogue(&state);
        }
        self.program
    }
}
