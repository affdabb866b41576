use crate::format::MAX_FUNCTIONS;

use super::anim::AnimationSlots;
use super::dialogue::DialogueState;
use super::function::FunctionSlot;

/// Voice file names remembered by `load_voice`.
pub const VOICE_SLOTS: usize = 6;

/// Mutable state of one running sequence, shared by the scheduler and the
/// command handlers.
#[derive(Debug)]
pub(crate) struct Runtime<A> {
    pub functions: [FunctionSlot; MAX_FUNCTIONS],
    pub anims: AnimationSlots<A>,
    pub voices: [Option<String>; VOICE_SLOTS],
    pub dialogue: Option<DialogueState>,
    /// Choice confirmed by the most recent dialogue box.
    pub choice: Option<u16>,
    pub last_host_result: i32,
    pub finished: bool,
}

impl<A> Default for Runtime<A> {
    fn default() -> Self {
        Self {
            functions: [FunctionSlot::default(); MAX_FUNCTIONS],
            anims: AnimationSlots::default(),
            voices: Default::default(),
            dialogue: None,
            choice: None,
            last_host_result: 0,
            finished: false,
        }
    }
}

impl<A> Runtime<A> {
    pub fn is_parked(&self, function: usize) -> bool {
        self.dialogue
            .as_ref()
            .is_some_and(|d| d.proc_function() == function)
    }

    pub fn stop_all(&mut self) {
        for f in self.functions.iter_mut() {
            f.stop();
        }
    }
}
