use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Opcode outside the command table.
    UnknownOpcode,
    /// Opcode inside the table with no handler in this dispatcher.
    Unimplemented,
    /// Missing file, bad slot index, double open, and the like.
    Resource,
    /// Runaway burst or a function running off the end of the stream.
    Scheduling,
    Dialogue,
    HostOpcode,
    /// Caller misuse of the sequencer itself.
    Lifecycle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub time: u64,
    pub function: Option<usize>,
    pub offset: Option<usize>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}ms]", self.time)?;
        if let Some(func) = self.function {
            write!(f, " func {}", func)?;
        }
        if let Some(off) = self.offset {
            write!(f, " @0x{:04X}", off)?;
        }
        write!(f, " {:?}: {}", self.kind, self.message)
    }
}

/// Bounded ring of recovered runtime errors. Every entry is also logged.
#[derive(Debug)]
pub struct Diagnostics {
    cap: usize,
    ring: VecDeque<Diagnostic>,
    total: u64,
}

impl Diagnostics {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            cap,
            ring: VecDeque::with_capacity(cap),
            total: 0,
        }
    }

    pub fn report(&mut self, diag: Diagnostic) {
        match diag.kind {
            DiagnosticKind::Lifecycle => log::error!("{}", diag),
            _ => log::warn!("{}", diag),
        }

        if self.ring.len() >= self.cap {
            let _ = self.ring.pop_front();
        }
        self.ring.push_back(diag);
        self.total += 1;
    }

    /// Entries still held, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.ring.iter()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Everything ever reported, including entries the ring dropped.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.ring.iter().filter(|d| d.kind == kind).count()
    }

    pub fn last(&self) -> Option<&Diagnostic> {
        self.ring.back()
    }

    pub fn clear(&mut self) {
        self.ring.clear();
    }
}
