/// Scheduling state of one function.
///
/// `ip` is a word offset into the program's instruction stream; `None` means
/// the function is stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FunctionSlot {
    pub(crate) ip: Option<usize>,
    pub(crate) last_time: u64,
    pub(crate) next_time: u64,
    pub(crate) loop_ip: Option<usize>,
}

impl FunctionSlot {
    pub fn ip(&self) -> Option<usize> {
        self.ip
    }

    pub fn is_running(&self) -> bool {
        self.ip.is_some()
    }

    pub fn last_time(&self) -> u64 {
        self.last_time
    }

    /// Earliest host time the next record may run.
    pub fn next_time(&self) -> u64 {
        self.next_time
    }

    pub fn loop_ip(&self) -> Option<usize> {
        self.loop_ip
    }

    #[inline]
    pub(crate) fn is_due(&self, now: u64) -> bool {
        self.ip.is_some() && self.next_time <= now
    }

    pub(crate) fn start(&mut self, entry: usize, now: u64) {
        self.ip = Some(entry);
        self.loop_ip = None;
        self.last_time = now;
        self.next_time = now;
    }

    pub(crate) fn stop(&mut self) {
        self.ip = None;
        self.loop_ip = None;
    }

    pub(crate) fn advance(&mut self, to: usize, wait: u64) {
        self.ip = Some(to);
        self.last_time = self.next_time;
        self.next_time += wait;
    }

    pub(crate) fn shift(&mut self, elapsed: u64) {
        if self.ip.is_some() {
            self.last_time += elapsed;
            self.next_time += elapsed;
        }
    }
}
