#![allow(dead_code)]

#[path = "../../src/test_util.rs"]
pub mod test_util;

use std::collections::VecDeque;

use rtim_script::{
    DialogueEvent, DialogueLayout, DialogueState, FadeDirection, OpenError, Program, SequenceHost, Sequencer,
    SequencerConfig, Surface,
};

pub use test_util::{rec, ProgramImage};

/// Every collaborator call the interpreter made, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open(String),
    Frame {
        handle: u32,
        frame: u16,
        target: Surface,
        x: i16,
        y: i16,
        blit: u16,
    },
    Close(u32),
    Fade(FadeDirection),
    Sound(u16, u8),
    Voice(String, u8),
    LoadSound(String),
    Track(u16),
    StopTrack,
    Text(String, u16),
    DrawDialogue { labels: Vec<String>, highlighted: usize },
    CloseDialogue { clicked: Option<usize> },
    Host(Vec<u16>),
}

#[derive(Debug, Default)]
pub struct MockHost {
    pub events: Vec<Event>,
    pub input: VecDeque<DialogueEvent>,
    pub missing: Vec<String>,
    pub live: Vec<u32>,
    pub polls: usize,
    next_handle: u32,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Text(s, _) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn frames(&self) -> Vec<&Event> {
        self.events.iter().filter(|e| matches!(e, Event::Frame { .. })).collect()
    }
}

impl SequenceHost for MockHost {
    type Animation = u32;

    fn open_animation(&mut self, path: &str) -> Result<u32, OpenError> {
        if self.missing.iter().any(|m| m == path) {
            return Err(OpenError::NotFound(path.to_string()));
        }
        self.next_handle += 1;
        self.live.push(self.next_handle);
        self.events.push(Event::Open(path.to_string()));
        Ok(self.next_handle)
    }

    fn display_frame(&mut self, anim: &mut u32, frame: u16, target: Surface, x: i16, y: i16, blit_flags: u16) {
        self.events.push(Event::Frame {
            handle: *anim,
            frame,
            target,
            x,
            y,
            blit: blit_flags,
        });
    }

    fn close_animation(&mut self, anim: u32) {
        self.live.retain(|&h| h != anim);
        self.events.push(Event::Close(anim));
    }

    fn fade_palette(&mut self, direction: FadeDirection) {
        self.events.push(Event::Fade(direction));
    }

    fn play_sound(&mut self, id: u16, volume: u8) {
        self.events.push(Event::Sound(id, volume));
    }

    fn play_voice(&mut self, path: &str, volume: u8) {
        self.events.push(Event::Voice(path.to_string(), volume));
    }

    fn load_sound_file(&mut self, path: &str) {
        self.events.push(Event::LoadSound(path.to_string()));
    }

    fn play_track(&mut self, track: u16) {
        self.events.push(Event::Track(track));
    }

    fn stop_track(&mut self) {
        self.events.push(Event::StopTrack);
    }

    fn display_text(&mut self, text: &str, flags: u16) {
        self.events.push(Event::Text(text.to_string(), flags));
    }

    fn poll_dialogue_input(&mut self) -> Option<DialogueEvent> {
        self.polls += 1;
        self.input.pop_front()
    }

    fn draw_dialogue(&mut self, state: &DialogueState, _layout: &DialogueLayout) {
        self.events.push(Event::DrawDialogue {
            labels: state.labels().to_vec(),
            highlighted: state.highlighted(),
        });
    }

    fn close_dialogue(&mut self, state: &DialogueState) {
        self.events.push(Event::CloseDialogue {
            clicked: state.clicked(),
        });
    }
}

pub fn load(image: &ProgramImage) -> Program {
    Program::load(&image.build()).unwrap()
}

pub fn config(seed: u64) -> SequencerConfig {
    SequencerConfig {
        rng_seed: Some(seed),
        record_trace: true,
        ..Default::default()
    }
}

pub fn sequencer(image: &ProgramImage) -> Sequencer<MockHost> {
    Sequencer::new(load(image), &config(7))
}
