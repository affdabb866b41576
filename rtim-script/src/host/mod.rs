//! The boundary between the interpreter and the game.
//!
//! The interpreter never renders or mixes audio itself. Everything visible or
//! audible goes through [`SequenceHost`], and game-specific commands go
//! through a [`HostOpcodeTable`].

mod registry;

use std::borrow::Cow;
use std::collections::VecDeque;

pub use registry::{HostOpcode, HostOpcodeTable};

use crate::error::OpenError;
use crate::format::TextTable;
use crate::vm::dialogue::{DialogueLayout, DialogueState};

/// Where a frame is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Screen,
    /// A buffer kept alive across ticks; the host composites it on present.
    Offscreen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FadeDirection {
    In,
    Out,
}

/// Input delivered to a pending dialogue box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueEvent {
    /// Pointer moved over choice `n`.
    Highlight(usize),
    /// Confirm the highlighted choice.
    Confirm,
    /// Click directly on choice `n`.
    Select(usize),
}

/// Collaborators the interpreter drives.
///
/// Only the animation calls are mandatory; a host without audio or text can
/// rely on the no-op defaults.
pub trait SequenceHost {
    type Animation;

    fn open_animation(&mut self, path: &str) -> Result<Self::Animation, OpenError>;

    fn display_frame(
        &mut self,
        anim: &mut Self::Animation,
        frame: u16,
        target: Surface,
        x: i16,
        y: i16,
        blit_flags: u16,
    );

    fn close_animation(&mut self, anim: Self::Animation);

    fn fade_palette(&mut self, _direction: FadeDirection) {}

    fn play_sound(&mut self, _id: u16, _volume: u8) {}

    fn play_voice(&mut self, _path: &str, _volume: u8) {}

    fn load_sound_file(&mut self, _path: &str) {}

    fn play_track(&mut self, _track: u16) {}

    fn stop_track(&mut self) {}

    fn display_text(&mut self, _text: &str, _flags: u16) {}

    /// Polled once per step while a dialogue box is pending.
    fn poll_dialogue_input(&mut self) -> Option<DialogueEvent> {
        None
    }

    fn draw_dialogue(&mut self, _state: &DialogueState, _layout: &DialogueLayout) {}

    /// Called with the final state, `clicked` set, once a choice is confirmed
    /// or the sequence is unloaded.
    fn close_dialogue(&mut self, _state: &DialogueState) {}
}

/// A scheduling change requested by a host opcode, applied after it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionRequest {
    Start(usize),
    Stop(usize),
}

/// What a host opcode may see of the running sequence.
pub struct HostContext<'a> {
    function: usize,
    now: u64,
    choice: Option<u16>,
    text: &'a TextTable,
    requests: VecDeque<FunctionRequest>,
}

impl<'a> HostContext<'a> {
    pub(crate) fn new(function: usize, now: u64, choice: Option<u16>, text: &'a TextTable) -> Self {
        Self {
            function,
            now,
            choice,
            text,
            requests: VecDeque::new(),
        }
    }

    /// Index of the function executing the opcode.
    pub fn function(&self) -> usize {
        self.function
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Choice confirmed in the most recent dialogue box, if any.
    pub fn choice(&self) -> Option<u16> {
        self.choice
    }

    pub fn text(&self, index: u16) -> Option<Cow<'_, str>> {
        self.text.entry(index)
    }

    pub fn start_function(&mut self, index: usize) {
        self.requests.push_back(FunctionRequest::Start(index));
    }

    pub fn stop_function(&mut self, index: usize) {
        self.requests.push_back(FunctionRequest::Stop(index));
    }

    pub(crate) fn into_requests(self) -> VecDeque<FunctionRequest> {
        self.requests
    }
}
