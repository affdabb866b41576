use std::env;
use std::sync::OnceLock;

/// Trace categories, enabled via environment variables.
///
/// Supported:
/// - RTIM_TRACE="vm,host,anim,dialogue" (comma/space separated; "all" enables all)
/// - RTIM_TRACE_VM=1, RTIM_TRACE_HOST=1, RTIM_TRACE_ANIM=1, RTIM_TRACE_DIALOGUE=1
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceKind {
    /// Every executed record.
    Vm,
    /// Host opcode calls and their results.
    Host,
    Anim,
    Dialogue,
}

const M_VM: u32 = 1 << 0;
const M_HOST: u32 = 1 << 1;
const M_ANIM: u32 = 1 << 2;
const M_DIALOGUE: u32 = 1 << 3;

impl TraceKind {
    fn mask(self) -> u32 {
        match self {
            TraceKind::Vm => M_VM,
            TraceKind::Host => M_HOST,
            TraceKind::Anim => M_ANIM,
            TraceKind::Dialogue => M_DIALOGUE,
        }
    }
}

fn parse_bool_env(name: &str) -> bool {
    match env::var(name) {
        Ok(v) => {
            let s = v.trim().to_ascii_lowercase();
            !(s.is_empty() || s == "0" || s == "false" || s == "no" || s == "off")
        }
        Err(_) => false,
    }
}

fn parse_mask_from_trace_list(s: &str) -> u32 {
    let mut mask = 0u32;
    for raw in s.split(|c: char| c == ',' || c == ';' || c.is_whitespace()) {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => mask |= M_VM | M_HOST | M_ANIM | M_DIALOGUE,
            "vm" => mask |= M_VM,
            "host" | "opcode" => mask |= M_HOST,
            "anim" => mask |= M_ANIM,
            "dialogue" | "dlg" => mask |= M_DIALOGUE,
            _ => {}
        }
    }
    mask
}

fn build_mask() -> u32 {
    let mut mask = 0u32;
    if let Ok(list) = env::var("RTIM_TRACE") {
        mask |= parse_mask_from_trace_list(&list);
    }
    if parse_bool_env("RTIM_TRACE_VM") {
        mask |= M_VM;
    }
    if parse_bool_env("RTIM_TRACE_HOST") {
        mask |= M_HOST;
    }
    if parse_bool_env("RTIM_TRACE_ANIM") {
        mask |= M_ANIM;
    }
    if parse_bool_env("RTIM_TRACE_DIALOGUE") {
        mask |= M_DIALOGUE;
    }
    mask
}

static MASK: OnceLock<u32> = OnceLock::new();

#[inline]
pub fn enabled(kind: TraceKind) -> bool {
    MASK.get_or_init(build_mask) & kind.mask() != 0
}

/// One executed record, kept when `record_trace` is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub time: u64,
    pub function: usize,
    pub offset: usize,
    pub opcode: u8,
}
