//! Command table.
//!
//! Every opcode maps to an optional handler. A missing handler, or an opcode
//! past the end of the table, is a diagnostic and a no-op; authored content
//! routinely references commands a given host build does not provide.

use crate::diag::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::format::{Instruction, Program, TextTable, MAX_FUNCTIONS};
use crate::host::{DialogueEvent, FunctionRequest, HostContext, HostOpcodeTable, SequenceHost};
use crate::trace::{self, TraceKind};

use super::anim::AnimFlags;
use super::dialogue::{DialogueExtension, DialogueState, MAX_CHOICES};
use super::opcode::{Opcode, COMMAND_COUNT, NO_TEXT};
use super::runtime::{Runtime, VOICE_SLOTS};

/// What the scheduler does with a function after one of its records ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    /// Advance and keep running while due.
    Continue,
    /// Advance, then end this function's burst for the current step.
    Yield,
    StopFunction,
    StopProgram,
    /// Park the function on a dialogue box; its pointer stays put.
    EnterDialogue,
    /// Jump back to the loop anchor, adding up to `factor` ticks of jitter.
    RepeatLoop { factor: u16 },
    /// The handler already repositioned this function's pointer.
    Jumped,
}

impl CommandResult {
    fn rank(self) -> u8 {
        match self {
            CommandResult::StopProgram => 4,
            CommandResult::StopFunction => 3,
            CommandResult::Jumped => 2,
            CommandResult::Yield => 1,
            _ => 0,
        }
    }

    fn max(self, other: Self) -> Self {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

pub(crate) type Command<H> = fn(&mut Exec<'_, H>, &Instruction<'_>) -> CommandResult;

/// Everything a handler may touch while one record executes.
pub(crate) struct Exec<'a, H: SequenceHost> {
    pub host: &'a mut H,
    pub rt: &'a mut Runtime<H::Animation>,
    pub program: &'a Program,
    pub text: &'a TextTable,
    pub opcodes: Option<&'a HostOpcodeTable<H>>,
    pub dialogue: Option<&'a DialogueExtension>,
    pub diag: &'a mut Diagnostics,
    pub current: usize,
    pub now: u64,
}

impl<'a, H: SequenceHost> Exec<'a, H> {
    pub fn report(&mut self, insn: &Instruction<'_>, kind: DiagnosticKind, message: String) {
        self.diag.report(Diagnostic {
            time: self.now,
            function: Some(self.current),
            offset: Some(insn.offset),
            kind,
            message,
        });
    }

    fn text(&mut self, insn: &Instruction<'_>, index: u16) -> Option<String> {
        let entry = self.text.entry(index).map(|s| s.into_owned());
        if entry.is_none() {
            self.report(
                insn,
                DiagnosticKind::Resource,
                format!("text entry {} does not exist", index),
            );
        }
        entry
    }

    fn cancel_dialogue(&mut self) {
        if let Some(state) = self.rt.dialogue.take() {
            self.host.close_dialogue(&state);
        }
    }

    /// `reset_clock` also moves `last_time` to now.
    fn start_function(&mut self, insn: &Instruction<'_>, index: usize, reset_clock: bool) -> CommandResult {
        if index >= MAX_FUNCTIONS {
            self.report(insn, DiagnosticKind::Resource, format!("function {} is out of range", index));
            return CommandResult::Continue;
        }
        let Some(entry) = self.program.function_entry(index) else {
            self.report(insn, DiagnosticKind::Resource, format!("function {} is undefined", index));
            return CommandResult::Continue;
        };
        if self.rt.is_parked(index) {
            self.cancel_dialogue();
        }

        let slot = &mut self.rt.functions[index];
        slot.ip = Some(entry);
        slot.loop_ip = None;
        slot.next_time = self.now;
        if reset_clock {
            slot.last_time = self.now;
        }

        if trace::enabled(TraceKind::Vm) {
            log::trace!("func {} starts function {} at 0x{:04X}", self.current, index, entry);
        }

        if index == self.current {
            CommandResult::Jumped
        } else {
            CommandResult::Continue
        }
    }

    fn stop_function(&mut self, insn: &Instruction<'_>, index: usize, reset_clock: bool) -> CommandResult {
        if index >= MAX_FUNCTIONS {
            self.report(insn, DiagnosticKind::Resource, format!("function {} is out of range", index));
            return CommandResult::Continue;
        }
        if self.rt.is_parked(index) {
            self.cancel_dialogue();
        }

        let slot = &mut self.rt.functions[index];
        slot.stop();
        if reset_clock {
            slot.last_time = self.now;
            slot.next_time = self.now;
        }

        if index == self.current {
            CommandResult::StopFunction
        } else {
            CommandResult::Continue
        }
    }
}

/// The opcode table, optionally extended with dialogue commands.
pub struct Dispatcher<H: SequenceHost> {
    table: [Option<Command<H>>; COMMAND_COUNT],
    dialogue: Option<DialogueExtension>,
}

impl<H: SequenceHost> Default for Dispatcher<H> {
    fn default() -> Self {
        Self::new()
    }
}

fn install<H: SequenceHost>(table: &mut [Option<Command<H>>; COMMAND_COUNT], op: Opcode, cmd: Command<H>) {
    table[op as usize] = Some(cmd);
}

impl<H: SequenceHost> Dispatcher<H> {
    /// The generic command set, without dialogue support.
    pub fn new() -> Self {
        let mut table: [Option<Command<H>>; COMMAND_COUNT] = [None; COMMAND_COUNT];
        install(&mut table, Opcode::InitFunc0, cmd_init_func0);
        install(&mut table, Opcode::StopCurFunc, cmd_stop_cur_func);
        install(&mut table, Opcode::InitAnim, cmd_init_anim);
        install(&mut table, Opcode::UninitAnim, cmd_uninit_anim);
        install(&mut table, Opcode::InitFunc, cmd_init_func);
        install(&mut table, Opcode::StopFunc, cmd_stop_func);
        install(&mut table, Opcode::AnimDisplayFrame, cmd_anim_display_frame);
        install(&mut table, Opcode::DisplayText, cmd_display_text);
        install(&mut table, Opcode::LoadVoice, cmd_load_voice);
        install(&mut table, Opcode::UnloadVoice, cmd_unload_voice);
        install(&mut table, Opcode::PlayVoice, cmd_play_voice);
        install(&mut table, Opcode::LoadSoundFile, cmd_load_sound_file);
        install(&mut table, Opcode::PlayMusicTrack, cmd_play_music_track);
        install(&mut table, Opcode::StopMusicTrack, cmd_stop_music_track);
        install(&mut table, Opcode::StopAllFuncs, cmd_stop_all_funcs);
        install(&mut table, Opcode::SetLoopIp, cmd_set_loop_ip);
        install(&mut table, Opcode::ContinueLoop, cmd_continue_loop);
        install(&mut table, Opcode::ResetLoopIp, cmd_reset_loop_ip);
        install(&mut table, Opcode::ResetAllRuntimes, cmd_reset_all_runtimes);
        install(&mut table, Opcode::ExecOpcode, cmd_exec_opcode);
        install(&mut table, Opcode::InitFuncNow, cmd_init_func_now);
        install(&mut table, Opcode::StopFuncNow, cmd_stop_func_now);
        install(&mut table, Opcode::EndBurst, cmd_end_burst);
        Self { table, dialogue: None }
    }

    /// The generic command set plus modal dialogue boxes.
    pub fn with_dialogue(ext: DialogueExtension) -> Self {
        let mut d = Self::new();
        install(&mut d.table, Opcode::DialogueBox, cmd_dialogue_box);
        install(&mut d.table, Opcode::BranchOnChoice, cmd_branch_on_choice);
        install(&mut d.table, Opcode::ClearChoice, cmd_clear_choice);
        install(&mut d.table, Opcode::ProcessDialogue, cmd_process_dialogue);
        d.dialogue = Some(ext);
        d
    }

    pub fn is_implemented(&self, opcode: u8) -> bool {
        matches!(self.table.get(opcode as usize), Some(Some(_)))
    }

    pub fn dialogue(&self) -> Option<&DialogueExtension> {
        self.dialogue.as_ref()
    }

    pub(crate) fn dispatch(&self, x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
        let index = insn.opcode as usize;
        if index >= COMMAND_COUNT {
            x.report(
                insn,
                DiagnosticKind::UnknownOpcode,
                format!("opcode {} is outside the command table ({} entries)", index, COMMAND_COUNT),
            );
            return CommandResult::Continue;
        }
        match self.table[index] {
            Some(cmd) => cmd(x, insn),
            None => {
                x.report(
                    insn,
                    DiagnosticKind::Unimplemented,
                    format!("opcode {} is not implemented by this dispatcher", index),
                );
                CommandResult::Continue
            }
        }
    }
}

fn cmd_init_func0<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    x.start_function(insn, 0, true)
}

fn cmd_stop_cur_func<H: SequenceHost>(_x: &mut Exec<'_, H>, _insn: &Instruction<'_>) -> CommandResult {
    CommandResult::StopFunction
}

fn cmd_init_anim<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    let index = insn.param(0) as usize;
    let Some(path) = x.text(insn, insn.param(1)) else {
        return CommandResult::Continue;
    };
    let pos_x = insn.param(2) as i16;
    let pos_y = insn.param(3) as i16;
    let raw = insn.param(5);
    let mut flags = AnimFlags::from_bits_truncate(raw & 0xFF);
    if insn.param(4) != 0 {
        flags |= AnimFlags::OFFSCREEN;
    }
    let blit_flags = raw >> 8;

    match x.rt.anims.init_slot(x.host, index, &path, pos_x, pos_y, flags, blit_flags) {
        Ok(()) => {
            if trace::enabled(TraceKind::Anim) {
                log::trace!("anim slot {} <- {} at ({}, {}) {:?}", index, path, pos_x, pos_y, flags);
            }
        }
        Err(e) => x.report(insn, DiagnosticKind::Resource, format!("init_anim {}: {}", path, e)),
    }
    CommandResult::Continue
}

fn cmd_uninit_anim<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    let index = insn.param(0) as usize;
    if let Err(e) = x.rt.anims.close_slot(x.host, index) {
        x.report(insn, DiagnosticKind::Resource, format!("uninit_anim: {}", e));
    }
    CommandResult::Continue
}

fn cmd_init_func<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    x.start_function(insn, insn.param(0) as usize, false)
}

fn cmd_stop_func<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    x.stop_function(insn, insn.param(0) as usize, false)
}

fn cmd_anim_display_frame<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    let index = insn.param(0) as usize;
    let frame = insn.param(1);
    match x.rt.anims.display_frame(index, frame) {
        Ok(()) => {
            if trace::enabled(TraceKind::Anim) {
                log::trace!("anim slot {} frame {}", index, frame);
            }
        }
        Err(e) => x.report(insn, DiagnosticKind::Resource, format!("anim_display_frame: {}", e)),
    }
    CommandResult::Continue
}

fn cmd_display_text<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    if let Some(text) = x.text(insn, insn.param(0)) {
        x.host.display_text(&text, insn.param(1));
    }
    CommandResult::Continue
}

fn cmd_load_voice<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    let slot = insn.param(0) as usize;
    if slot >= VOICE_SLOTS {
        x.report(insn, DiagnosticKind::Resource, format!("voice slot {} is out of range", slot));
        return CommandResult::Continue;
    }
    if let Some(name) = x.text(insn, insn.param(1)) {
        x.rt.voices[slot] = Some(name);
    }
    CommandResult::Continue
}

fn cmd_unload_voice<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    let slot = insn.param(0) as usize;
    match x.rt.voices.get_mut(slot) {
        Some(v) => *v = None,
        None => x.report(insn, DiagnosticKind::Resource, format!("voice slot {} is out of range", slot)),
    }
    CommandResult::Continue
}

#[inline]
fn volume(percent: u16) -> u8 {
    (percent.min(100) as u32 * 255 / 100) as u8
}

fn cmd_play_voice<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    let id = insn.param(0);
    let vol = volume(insn.param(1));
    match x.rt.voices.get(id as usize) {
        Some(Some(path)) => x.host.play_voice(path, vol),
        _ => x.host.play_sound(id, vol),
    }
    CommandResult::Continue
}

fn cmd_load_sound_file<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    if let Some(path) = x.text(insn, insn.param(0)) {
        x.host.load_sound_file(&path);
    }
    CommandResult::Continue
}

fn cmd_play_music_track<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    x.host.play_track(insn.param(0));
    CommandResult::Continue
}

fn cmd_stop_music_track<H: SequenceHost>(x: &mut Exec<'_, H>, _insn: &Instruction<'_>) -> CommandResult {
    x.host.stop_track();
    CommandResult::Continue
}

fn cmd_stop_all_funcs<H: SequenceHost>(_x: &mut Exec<'_, H>, _insn: &Instruction<'_>) -> CommandResult {
    CommandResult::StopProgram
}

fn cmd_set_loop_ip<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    x.rt.functions[x.current].loop_ip = Some(insn.next_offset());
    CommandResult::Continue
}

fn cmd_continue_loop<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    if x.rt.functions[x.current].loop_ip.is_none() {
        return CommandResult::Yield;
    }
    CommandResult::RepeatLoop { factor: insn.param(0) }
}

fn cmd_reset_loop_ip<H: SequenceHost>(x: &mut Exec<'_, H>, _insn: &Instruction<'_>) -> CommandResult {
    x.rt.functions[x.current].loop_ip = None;
    CommandResult::Continue
}

fn cmd_reset_all_runtimes<H: SequenceHost>(x: &mut Exec<'_, H>, _insn: &Instruction<'_>) -> CommandResult {
    let now = x.now;
    for f in x.rt.functions.iter_mut().filter(|f| f.is_running()) {
        f.next_time = now;
    }
    CommandResult::Continue
}

fn cmd_exec_opcode<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    let index = insn.param(0);
    let Some(table) = x.opcodes else {
        x.report(
            insn,
            DiagnosticKind::HostOpcode,
            format!("host opcode {} called without a host opcode table", index),
        );
        return CommandResult::Continue;
    };

    let params = insn.params.get(1..).unwrap_or(&[]);
    let mut ctx = HostContext::new(x.current, x.now, x.rt.choice, x.text);
    let Some(ret) = table.call(x.host, &mut ctx, index, params) else {
        x.report(
            insn,
            DiagnosticKind::HostOpcode,
            format!("host opcode {} is not implemented ({} entries)", index, table.len()),
        );
        return CommandResult::Continue;
    };

    if trace::enabled(TraceKind::Host) {
        log::trace!("func {} host opcode {} {:?} -> {}", x.current, index, params, ret);
    }
    x.rt.last_host_result = ret;

    let result = match ret {
        -1 => CommandResult::StopProgram,
        -2 => CommandResult::Yield,
        _ => CommandResult::Continue,
    };
    let mut rewrote_current = false;
    for req in ctx.into_requests() {
        let r = match req {
            FunctionRequest::Start(f) => x.start_function(insn, f, true),
            FunctionRequest::Stop(f) => x.stop_function(insn, f, true),
        };
        rewrote_current |= r != CommandResult::Continue;
    }
    if !rewrote_current {
        return result;
    }

    // requests apply in order, so the caller's slot already holds the last one
    let own = if x.rt.functions[x.current].is_running() {
        CommandResult::Jumped
    } else {
        CommandResult::StopFunction
    };
    result.max(own)
}

fn cmd_init_func_now<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    x.start_function(insn, insn.param(0) as usize, true)
}

fn cmd_stop_func_now<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    x.stop_function(insn, insn.param(0) as usize, true)
}

fn cmd_end_burst<H: SequenceHost>(_x: &mut Exec<'_, H>, _insn: &Instruction<'_>) -> CommandResult {
    CommandResult::Yield
}

fn cmd_dialogue_box<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    let Some(ext) = x.dialogue else {
        return CommandResult::Continue;
    };
    if let Some(pending) = &x.rt.dialogue {
        let owner = pending.proc_function();
        x.report(
            insn,
            DiagnosticKind::Dialogue,
            format!("a dialogue box is already pending for function {}", owner),
        );
        return CommandResult::Continue;
    }

    let mut labels = Vec::with_capacity(MAX_CHOICES);
    for p in 0..MAX_CHOICES {
        let index = insn.param(p);
        if index == NO_TEXT {
            continue;
        }
        if let Some(label) = x.text(insn, index) {
            labels.push(label);
        }
    }
    if labels.is_empty() {
        x.report(insn, DiagnosticKind::Dialogue, "dialogue box has no choices".into());
        return CommandResult::Continue;
    }

    let state = DialogueState::new(x.current, insn.offset, labels);
    if trace::enabled(TraceKind::Dialogue) {
        log::trace!("func {} opens dialogue {:?}", x.current, state.labels());
    }
    x.host.draw_dialogue(&state, ext.layout());
    x.rt.dialogue = Some(state);
    CommandResult::EnterDialogue
}

fn cmd_branch_on_choice<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    if x.rt.choice == Some(insn.param(0)) {
        x.start_function(insn, insn.param(1) as usize, true)
    } else {
        CommandResult::Continue
    }
}

fn cmd_clear_choice<H: SequenceHost>(x: &mut Exec<'_, H>, _insn: &Instruction<'_>) -> CommandResult {
    x.rt.choice = None;
    CommandResult::Continue
}

/// Poll hook. Runs once per step while a box is pending, independent of any
/// function's timing.
fn cmd_process_dialogue<H: SequenceHost>(x: &mut Exec<'_, H>, insn: &Instruction<'_>) -> CommandResult {
    let Some(ext) = x.dialogue else {
        return CommandResult::Continue;
    };
    let count = match &x.rt.dialogue {
        Some(state) => state.labels().len(),
        None => return CommandResult::Continue,
    };
    let Some(event) = x.host.poll_dialogue_input() else {
        return CommandResult::Continue;
    };

    match event {
        DialogueEvent::Highlight(i) | DialogueEvent::Select(i) if i >= count => {
            x.report(
                insn,
                DiagnosticKind::Dialogue,
                format!("choice {} is out of range ({} choices)", i, count),
            );
            CommandResult::Continue
        }
        DialogueEvent::Highlight(i) => {
            if let Some(state) = x.rt.dialogue.as_mut() {
                if state.highlight(i) {
                    x.host.draw_dialogue(state, ext.layout());
                }
            }
            CommandResult::Continue
        }
        DialogueEvent::Select(i) => confirm_choice(x, Some(i)),
        DialogueEvent::Confirm => confirm_choice(x, None),
    }
}

fn confirm_choice<H: SequenceHost>(x: &mut Exec<'_, H>, index: Option<usize>) -> CommandResult {
    let Some(mut state) = x.rt.dialogue.take() else {
        return CommandResult::Continue;
    };
    let choice = index.unwrap_or(state.highlighted());
    state.click(choice);
    x.host.close_dialogue(&state);
    x.rt.choice = Some(choice as u16);

    // resume after the box record, immediately
    let resume = x.program.instruction_at(state.offset()).map(|i| i.next_offset());
    let slot = &mut x.rt.functions[state.proc_function()];
    slot.ip = resume;
    slot.last_time = x.now;
    slot.next_time = x.now;

    if trace::enabled(TraceKind::Dialogue) {
        log::trace!("func {} resumes with choice {}", state.proc_function(), choice);
    }
    CommandResult::Continue
}
