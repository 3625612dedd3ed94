//! Module container and per-channel settings.
//!
//! A `Module` is the whole editable document: channel settings, pattern
//! slots, samples, and instruments. Pattern ids are 0-based slot indices
//! (a slot may be empty). Sample and instrument ids are 1-based; id 0
//! always means "none" — the convention every tracker format shares.

use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::instrument::Instrument;
use crate::pattern::Pattern;
use crate::sample::Sample;

/// Identifies a pattern slot (0-based).
pub type PatternId = usize;
/// Identifies a sample (1-based, 0 = none).
pub type SampleId = u16;
/// Identifies an instrument (1-based, 0 = none).
pub type InstrumentId = u16;

/// Per-channel settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelSettings {
    /// Initial panning (-64 to +64, 0 = center)
    pub initial_pan: i8,
    /// Initial volume (0-64)
    pub initial_vol: u8,
    /// Is the channel muted?
    pub muted: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            initial_pan: 0,
            initial_vol: 64,
            muted: false,
        }
    }
}

/// A complete editable module.
#[derive(Clone, Debug, Default)]
pub struct Module {
    /// Module title
    pub title: ArrayString<32>,
    /// Per-channel settings; the length is the channel count
    pub channels: Vec<ChannelSettings>,
    /// Pattern slots; `None` = no pattern at that id
    pub patterns: Vec<Option<Pattern>>,
    /// Samples; `samples[0]` is sample id 1
    pub samples: Vec<Sample>,
    /// Instrument slots; `instruments[0]` is instrument id 1
    pub instruments: Vec<Option<Instrument>>,
    /// Document has unsaved changes
    pub modified: bool,
}

impl Module {
    /// Create a new empty module.
    pub fn new(title: &str) -> Self {
        let mut module = Self::default();
        let _ = module.title.try_push_str(title);
        module
    }

    /// Create a module with a given number of channels.
    pub fn with_channels(title: &str, num_channels: u8) -> Self {
        let mut module = Self::new(title);
        module.channels = alloc::vec![ChannelSettings::default(); num_channels as usize];
        module
    }

    /// Number of channels.
    pub fn channel_count(&self) -> u8 {
        self.channels.len() as u8
    }

    /// Get the pattern at a slot, if present.
    pub fn pattern(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.get(id)?.as_ref()
    }

    /// Get the pattern at a slot mutably, if present.
    pub fn pattern_mut(&mut self, id: PatternId) -> Option<&mut Pattern> {
        self.patterns.get_mut(id)?.as_mut()
    }

    /// Create a pattern at a slot with the given row count and the
    /// module's channel width, growing the slot list as needed.
    /// Fails if the slot is already occupied.
    pub fn insert_pattern(&mut self, id: PatternId, rows: u16) -> bool {
        if id >= self.patterns.len() {
            self.patterns.resize(id + 1, None);
        }
        if self.patterns[id].is_some() {
            return false;
        }
        self.patterns[id] = Some(Pattern::new(rows, self.channel_count()));
        true
    }

    /// Append a pattern, returning its id.
    pub fn push_pattern(&mut self, rows: u16) -> PatternId {
        self.patterns
            .push(Some(Pattern::new(rows, self.channel_count())));
        self.patterns.len() - 1
    }

    /// Get a sample by id (1-based).
    pub fn sample(&self, id: SampleId) -> Option<&Sample> {
        self.samples.get(id.checked_sub(1)? as usize)
    }

    /// Get a sample by id (1-based), mutably.
    pub fn sample_mut(&mut self, id: SampleId) -> Option<&mut Sample> {
        self.samples.get_mut(id.checked_sub(1)? as usize)
    }

    /// Append a sample, returning its id.
    pub fn push_sample(&mut self, sample: Sample) -> SampleId {
        self.samples.push(sample);
        self.samples.len() as SampleId
    }

    /// Get an instrument by id (1-based).
    pub fn instrument(&self, id: InstrumentId) -> Option<&Instrument> {
        self.instruments.get(id.checked_sub(1)? as usize)?.as_ref()
    }

    /// Get an instrument by id (1-based), mutably.
    pub fn instrument_mut(&mut self, id: InstrumentId) -> Option<&mut Instrument> {
        self.instruments
            .get_mut(id.checked_sub(1)? as usize)?
            .as_mut()
    }

    /// Append an instrument, returning its id.
    pub fn push_instrument(&mut self, instrument: Instrument) -> InstrumentId {
        self.instruments.push(Some(instrument));
        self.instruments.len() as InstrumentId
    }

    /// Rebuild the channel layout through a source mapping.
    ///
    /// `sources[i]` names the old channel that becomes new channel `i`
    /// (`None` = new blank channel). Applies to the settings list and to
    /// every existing pattern, so pattern widths stay in sync with the
    /// channel count.
    pub fn rearrange_channels(&mut self, sources: &[Option<u8>]) {
        let old = core::mem::take(&mut self.channels);
        self.channels = sources
            .iter()
            .map(|source| {
                source
                    .and_then(|i| old.get(i as usize).copied())
                    .unwrap_or_default()
            })
            .collect();
        for slot in &mut self.patterns {
            if let Some(pattern) = slot {
                pattern.rebuild_channels(sources);
            }
        }
    }
}
