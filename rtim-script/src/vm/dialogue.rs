//! Modal choice boxes.
//!
//! A `dialogue_box` record parks the function that ran it. While parked, the
//! scheduler polls the host for input every step. Confirming a choice records
//! it, closes the box and resumes the parked function after the box record.

pub const MAX_CHOICES: usize = 3;

/// Fixed placement of the choice box, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogueLayout {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub button_height: u16,
}

impl Default for DialogueLayout {
    fn default() -> Self {
        Self {
            x: 8,
            y: 144,
            width: 304,
            button_height: 9,
        }
    }
}

/// Capability injected into a [`Dispatcher`](super::dispatch::Dispatcher) to
/// enable the dialogue opcodes.
#[derive(Debug, Clone, Default)]
pub struct DialogueExtension {
    layout: DialogueLayout,
}

impl DialogueExtension {
    pub fn new(layout: DialogueLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &DialogueLayout {
        &self.layout
    }
}

/// A pending choice box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueState {
    proc_function: usize,
    offset: usize,
    labels: Vec<String>,
    highlighted: usize,
    clicked: Option<usize>,
}

impl DialogueState {
    pub(crate) fn new(proc_function: usize, offset: usize, labels: Vec<String>) -> Self {
        Self {
            proc_function,
            offset,
            labels,
            highlighted: 0,
            clicked: None,
        }
    }

    /// The parked function.
    pub fn proc_function(&self) -> usize {
        self.proc_function
    }

    /// Word offset of the `dialogue_box` record that opened the box.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    /// Set once a choice is confirmed, right before the box closes.
    pub fn clicked(&self) -> Option<usize> {
        self.clicked
    }

    /// Returns false when `index` is not a choice or already highlighted.
    pub(crate) fn highlight(&mut self, index: usize) -> bool {
        if index >= self.labels.len() || index == self.highlighted {
            return false;
        }
        self.highlighted = index;
        true
    }

    pub(crate) fn click(&mut self, index: usize) -> bool {
        if index >= self.labels.len() {
            return false;
        }
        self.highlighted = index;
        self.clicked = Some(index);
        true
    }
}
