use crate::host::SequenceHost;
use crate::vm::Sequencer;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionEntry {
    pub id: usize,
    pub ip: Option<usize>,
    pub last_time: u64,
    pub next_time: u64,
    pub loop_ip: Option<usize>,
    /// Waiting on a dialogue box.
    pub parked: bool,
}

/// Point-in-time view of the scheduler for debug overlays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceSnapshot {
    pub step_seq: u64,
    pub entries: Vec<FunctionEntry>,
    pub open_anims: usize,
    pub dialogue_pending: bool,
    pub finished: bool,
}

impl SequenceSnapshot {
    /// (running, parked, stopped)
    pub fn summarize_counts(&self) -> (usize, usize, usize) {
        let mut run = 0usize;
        let mut parked = 0usize;
        let mut stopped = 0usize;
        for e in &self.entries {
            if e.ip.is_none() {
                stopped += 1;
            } else if e.parked {
                parked += 1;
            } else {
                run += 1;
            }
        }
        (run, parked, stopped)
    }

    pub fn update_from_sequencer<H: SequenceHost>(&mut self, seq: &Sequencer<H>) {
        let parked = seq.dialogue().map(|d| d.proc_function());

        self.entries.clear();
        self.entries.extend(seq.functions().iter().enumerate().map(|(id, f)| FunctionEntry {
            id,
            ip: f.ip(),
            last_time: f.last_time(),
            next_time: f.next_time(),
            loop_ip: f.loop_ip(),
            parked: parked == Some(id),
        }));
        self.open_anims = seq.animations().open_count();
        self.dialogue_pending = parked.is_some();
        self.finished = seq.is_finished();
        self.step_seq = seq.steps();
    }
}
