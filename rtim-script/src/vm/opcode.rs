use std::fmt;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Number of entries in the command table. Opcodes at or above this value
/// are decoded as unknown.
pub const COMMAND_COUNT: usize = 28;

/// Text parameter value meaning "no string".
pub const NO_TEXT: u16 = 0xFFFF;

#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    InitFunc0 = 0,
    StopCurFunc = 1,
    InitAnim = 2,
    UninitAnim = 3,
    InitFunc = 4,
    StopFunc = 5,
    AnimDisplayFrame = 6,
    DisplayText = 7,
    LoadVoice = 8,
    UnloadVoice = 9,
    PlayVoice = 10,
    // 11 has never been assigned
    LoadSoundFile = 12,
    PlayMusicTrack = 13,
    StopMusicTrack = 14,
    StopAllFuncs = 15,
    SetLoopIp = 16,
    ContinueLoop = 17,
    ResetLoopIp = 18,
    ResetAllRuntimes = 19,
    ExecOpcode = 20,
    InitFuncNow = 21,
    StopFuncNow = 22,
    EndBurst = 23,
    DialogueBox = 24,
    BranchOnChoice = 25,
    ClearChoice = 26,
    ProcessDialogue = 27,
}

impl Opcode {
    #[inline]
    pub fn decode(b: u8) -> Option<Self> {
        FromPrimitive::from_u8(b)
    }

    /// Minimum number of parameter words a record with this opcode carries.
    pub fn arity(self) -> usize {
        use Opcode::*;
        match self {
            InitFunc0 | StopCurFunc | StopMusicTrack | StopAllFuncs | SetLoopIp | ResetLoopIp
            | ResetAllRuntimes | EndBurst | ClearChoice | ProcessDialogue => 0,
            UninitAnim | InitFunc | StopFunc | UnloadVoice | LoadSoundFile | PlayMusicTrack
            | ContinueLoop | ExecOpcode | InitFuncNow | StopFuncNow => 1,
            AnimDisplayFrame | DisplayText | LoadVoice | PlayVoice | BranchOnChoice => 2,
            DialogueBox => 3,
            InitAnim => 6,
        }
    }

    /// Parameter positions that index the text table.
    pub fn text_params(self) -> &'static [usize] {
        use Opcode::*;
        match self {
            InitAnim => &[1],
            DisplayText => &[0],
            LoadVoice => &[1],
            LoadSoundFile => &[0],
            DialogueBox => &[0, 1, 2],
            _ => &[],
        }
    }

    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            InitFunc0 => "init_func0",
            StopCurFunc => "stop_cur_func",
            InitAnim => "init_anim",
            UninitAnim => "uninit_anim",
            InitFunc => "init_func",
            StopFunc => "stop_func",
            AnimDisplayFrame => "anim_display_frame",
            DisplayText => "display_text",
            LoadVoice => "load_voice",
            UnloadVoice => "unload_voice",
            PlayVoice => "play_voice",
            LoadSoundFile => "load_sound_file",
            PlayMusicTrack => "play_music_track",
            StopMusicTrack => "stop_music_track",
            StopAllFuncs => "stop_all_funcs",
            SetLoopIp => "set_loop_ip",
            ContinueLoop => "continue_loop",
            ResetLoopIp => "reset_loop_ip",
            ResetAllRuntimes => "reset_all_runtimes",
            ExecOpcode => "exec_opcode",
            InitFuncNow => "init_func_now",
            StopFuncNow => "stop_func_now",
            EndBurst => "end_burst",
            DialogueBox => "dialogue_box",
            BranchOnChoice => "branch_on_choice",
            ClearChoice => "clear_choice",
            ProcessDialogue => "process_dialogue",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
