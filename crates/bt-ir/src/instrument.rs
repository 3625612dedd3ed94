//! Instrument and envelope types.

use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::module::SampleId;

/// Number of mappable notes in an instrument's keyboard table.
pub const KEYBOARD_NOTES: usize = 120;

/// An instrument definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instrument {
    /// Instrument name
    pub name: ArrayString<26>,
    /// Keyboard table: note (0-119) -> sample id (0 = no sample)
    pub sample_map: [SampleId; KEYBOARD_NOTES],
    /// Volume envelope
    pub volume_envelope: Option<Envelope>,
    /// Panning envelope
    pub panning_envelope: Option<Envelope>,
    /// Pitch envelope
    pub pitch_envelope: Option<Envelope>,
    /// Fadeout speed (0 = no fade)
    pub fadeout: u16,
    /// What happens when a new note is played on a channel already playing this instrument
    pub new_note_action: NewNoteAction,
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            sample_map: [0; KEYBOARD_NOTES],
            volume_envelope: None,
            panning_envelope: None,
            pitch_envelope: None,
            fadeout: 0,
            new_note_action: NewNoteAction::Cut,
        }
    }
}

impl Instrument {
    /// Create a new instrument with default settings.
    pub fn new(name: &str) -> Self {
        let mut inst = Self::default();
        let _ = inst.name.try_push_str(name);
        inst
    }

    /// Set all notes to map to a single sample.
    pub fn set_single_sample(&mut self, sample_id: SampleId) {
        self.sample_map.fill(sample_id);
    }

    /// Get one envelope by kind.
    pub fn envelope(&self, kind: EnvelopeKind) -> &Option<Envelope> {
        match kind {
            EnvelopeKind::Volume => &self.volume_envelope,
            EnvelopeKind::Panning => &self.panning_envelope,
            EnvelopeKind::Pitch => &self.pitch_envelope,
        }
    }

    /// Get one envelope by kind, mutably.
    pub fn envelope_mut(&mut self, kind: EnvelopeKind) -> &mut Option<Envelope> {
        match kind {
            EnvelopeKind::Volume => &mut self.volume_envelope,
            EnvelopeKind::Panning => &mut self.panning_envelope,
            EnvelopeKind::Pitch => &mut self.pitch_envelope,
        }
    }
}

/// Which envelope curve of an instrument is meant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvelopeKind {
    Volume,
    Panning,
    Pitch,
}

/// Action when a new note triggers on a channel already playing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NewNoteAction {
    /// Cut the previous note immediately
    #[default]
    Cut,
    /// Continue the previous note (background)
    Continue,
    /// Send note-off to previous note
    Off,
    /// Fade out the previous note
    Fade,
}

/// An envelope curve (volume, panning, or pitch).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Envelope points
    pub points: Vec<EnvelopePoint>,
    /// Sustain loop start point index (None = no sustain)
    pub sustain_start: Option<u8>,
    /// Sustain loop end point index
    pub sustain_end: Option<u8>,
    /// Regular loop start point index (None = no loop)
    pub loop_start: Option<u8>,
    /// Regular loop end point index
    pub loop_end: Option<u8>,
    /// Is the envelope enabled?
    pub enabled: bool,
}

impl Envelope {
    /// Create a new empty envelope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a point to the envelope.
    pub fn add_point(&mut self, tick: u16, value: i8) {
        self.points.push(EnvelopePoint { tick, value });
    }
}

/// A point in an envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvelopePoint {
    /// Tick position (0-65535)
    pub tick: u16,
    /// Value (-64 to +64, or 0-64 for volume)
    pub value: i8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_selector_round_trip() {
        let mut inst = Instrument::new("piano");
        let mut env = Envelope::new();
        env.add_point(0, 64);
        env.enabled = true;
        *inst.envelope_mut(EnvelopeKind::Panning) = Some(env.clone());

        assert_eq!(inst.envelope(EnvelopeKind::Panning), &Some(env));
        assert_eq!(inst.envelope(EnvelopeKind::Volume), &None);
    }

    #[test]
    fn single_sample_fills_keyboard() {
        let mut inst = Instrument::new("kick");
        inst.set_single_sample(3);
        assert!(inst.sample_map.iter().all(|&s| s == 3));
    }
}
