use bitflags::bitflags;

use crate::error::SlotError;
use crate::host::{FadeDirection, SequenceHost, Surface};

pub const ANIM_SLOTS: usize = 8;

bitflags! {
    /// Low byte of the `flags` parameter of `init_anim`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AnimFlags: u16 {
        /// Frames go to an offscreen buffer kept alive across ticks.
        const OFFSCREEN = 1 << 0;
        const FADE_ON_OPEN = 1 << 1;
        const FADE_ON_CLOSE = 1 << 2;
        /// Queue frame 0 as soon as the slot opens.
        const DRAW_ON_OPEN = 1 << 3;
    }
}

/// One logical animation channel. Owns at most one open animation.
#[derive(Debug)]
pub struct AnimationSlot<A> {
    anim: Option<A>,
    x: i16,
    y: i16,
    flags: AnimFlags,
    blit_flags: u16,
    pending_frame: Option<u16>,
    last_frame: Option<u16>,
    fade_in_pending: bool,
}

impl<A> Default for AnimationSlot<A> {
    fn default() -> Self {
        Self {
            anim: None,
            x: 0,
            y: 0,
            flags: AnimFlags::empty(),
            blit_flags: 0,
            pending_frame: None,
            last_frame: None,
            fade_in_pending: false,
        }
    }
}

impl<A> AnimationSlot<A> {
    pub fn is_open(&self) -> bool {
        self.anim.is_some()
    }

    pub fn handle(&self) -> Option<&A> {
        self.anim.as_ref()
    }

    pub fn position(&self) -> (i16, i16) {
        (self.x, self.y)
    }

    pub fn flags(&self) -> AnimFlags {
        self.flags
    }

    pub fn blit_flags(&self) -> u16 {
        self.blit_flags
    }

    /// Frame waiting for the next present.
    pub fn pending_frame(&self) -> Option<u16> {
        self.pending_frame
    }

    pub fn is_dirty(&self) -> bool {
        self.pending_frame.is_some()
    }

    /// Frame drawn by the most recent present.
    pub fn last_frame(&self) -> Option<u16> {
        self.last_frame
    }

    fn surface(&self) -> Surface {
        if self.flags.contains(AnimFlags::OFFSCREEN) {
            Surface::Offscreen
        } else {
            Surface::Screen
        }
    }
}

/// Fixed bank of animation slots addressed by index from bytecode.
#[derive(Debug)]
pub struct AnimationSlots<A> {
    slots: [AnimationSlot<A>; ANIM_SLOTS],
}

impl<A> Default for AnimationSlots<A> {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| AnimationSlot::default()),
        }
    }
}

impl<A> AnimationSlots<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Option<&AnimationSlot<A>> {
        self.slots.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnimationSlot<A>> {
        self.slots.iter()
    }

    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_open()).count()
    }

    pub fn is_dirty(&self) -> bool {
        self.slots.iter().any(|s| s.is_dirty())
    }

    /// Open `path` into slot `index`.
    ///
    /// Fails with [`SlotError::AlreadyOpen`] rather than replacing a live
    /// handle; the caller must close first.
    #[allow(clippy::too_many_arguments)]
    pub fn init_slot<H>(
        &mut self,
        host: &mut H,
        index: usize,
        path: &str,
        x: i16,
        y: i16,
        flags: AnimFlags,
        blit_flags: u16,
    ) -> Result<(), SlotError>
    where
        H: SequenceHost<Animation = A>,
    {
        let slot = self.slots.get_mut(index).ok_or(SlotError::OutOfRange(index))?;
        if slot.is_open() {
            return Err(SlotError::AlreadyOpen(index));
        }

        let anim = host.open_animation(path)?;
        if flags.contains(AnimFlags::FADE_ON_OPEN) {
            host.fade_palette(FadeDirection::Out);
        }

        *slot = AnimationSlot {
            anim: Some(anim),
            x,
            y,
            flags,
            blit_flags,
            pending_frame: flags.contains(AnimFlags::DRAW_ON_OPEN).then_some(0),
            last_frame: None,
            fade_in_pending: flags.contains(AnimFlags::FADE_ON_OPEN),
        };
        Ok(())
    }

    /// Release the handle in slot `index`. A slot that is not open is left
    /// untouched.
    pub fn close_slot<H>(&mut self, host: &mut H, index: usize) -> Result<(), SlotError>
    where
        H: SequenceHost<Animation = A>,
    {
        let slot = self.slots.get_mut(index).ok_or(SlotError::OutOfRange(index))?;
        let anim = slot.anim.take().ok_or(SlotError::NotOpen(index))?;
        if slot.flags.contains(AnimFlags::FADE_ON_CLOSE) {
            host.fade_palette(FadeDirection::Out);
        }
        host.close_animation(anim);
        *slot = AnimationSlot::default();
        Ok(())
    }

    pub fn display_frame(&mut self, index: usize, frame: u16) -> Result<(), SlotError> {
        let slot = self.slots.get_mut(index).ok_or(SlotError::OutOfRange(index))?;
        if !slot.is_open() {
            return Err(SlotError::NotOpen(index));
        }
        slot.pending_frame = Some(frame);
        Ok(())
    }

    /// Hand every dirty slot's pending frame to the host. Returns how many
    /// frames were drawn.
    pub fn present<H>(&mut self, host: &mut H) -> usize
    where
        H: SequenceHost<Animation = A>,
    {
        let mut drawn = 0;
        for slot in self.slots.iter_mut() {
            let surface = slot.surface();
            let (Some(anim), Some(frame)) = (slot.anim.as_mut(), slot.pending_frame.take()) else {
                continue;
            };
            host.display_frame(anim, frame, surface, slot.x, slot.y, slot.blit_flags);
            slot.last_frame = Some(frame);
            drawn += 1;

            if slot.fade_in_pending {
                slot.fade_in_pending = false;
                host.fade_palette(FadeDirection::In);
            }
        }
        drawn
    }

    pub fn close_all<H>(&mut self, host: &mut H) -> usize
    where
        H: SequenceHost<Animation = A>,
    {
        let mut closed = 0;
        for index in 0..ANIM_SLOTS {
            if self.close_slot(host, index).is_ok() {
                closed += 1;
            }
        }
        closed
    }
}
