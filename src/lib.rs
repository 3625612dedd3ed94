//! Headless editing core for the backtrack tracker.
//!
//! Owns the module document and its three undo histories behind one API
//! that a GUI or CLI shell can share. Pattern, sample, and instrument
//! edits each go through their own history engine; the editor wires them
//! to a single change notification and keeps them consistent when the
//! document reorders its entities.

use std::rc::Rc;

use bt_history::{InstrumentHistory, PatternHistory, SampleHistory};

// Re-export common types so callers don't need bt-ir/bt-history directly.
pub use bt_history::{
    HistoryError, InstrumentTarget, PatternRegion, SampleChange, DEFAULT_UNDO_DEPTH,
};
pub use bt_ir::{
    Cell, ChannelSettings, Envelope, EnvelopeKind, Instrument, InstrumentId, Module, Note,
    Pattern, PatternId, Sample, SampleId,
};

/// Editor construction options.
#[derive(Clone, Copy, Debug)]
pub struct EditorConfig {
    /// Maximum undo steps per history stack
    pub undo_depth: usize,
    /// Byte budget shared by all sample undo/redo payloads (0 disables
    /// sample history)
    pub sample_byte_budget: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            undo_depth: DEFAULT_UNDO_DEPTH,
            sample_byte_budget: 64 << 20,
        }
    }
}

/// Headless editor: a module document plus its undo histories.
pub struct Editor {
    module: Module,
    patterns: PatternHistory,
    samples: SampleHistory,
    instruments: InstrumentHistory,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        Self::open(Module::with_channels("Untitled", 4), config)
    }

    /// Wrap an existing document, starting with empty histories.
    pub fn open(module: Module, config: EditorConfig) -> Self {
        Self {
            module,
            patterns: PatternHistory::with_depth(config.undo_depth),
            samples: SampleHistory::with_depth(config.sample_byte_budget, config.undo_depth),
            instruments: InstrumentHistory::with_depth(config.undo_depth),
        }
    }

    // --- Document access ---

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    // --- History access ---
    //
    // The usual edit sequence is: prepare an undo point on the relevant
    // history, then mutate the document through `module_mut`.

    pub fn patterns(&self) -> &PatternHistory {
        &self.patterns
    }

    pub fn patterns_mut(&mut self) -> &mut PatternHistory {
        &mut self.patterns
    }

    pub fn samples(&self) -> &SampleHistory {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut SampleHistory {
        &mut self.samples
    }

    pub fn instruments(&self) -> &InstrumentHistory {
        &self.instruments
    }

    pub fn instruments_mut(&mut self) -> &mut InstrumentHistory {
        &mut self.instruments
    }

    /// Install one hook fired after every history capture, undo, or redo,
    /// whichever engine it happened in. The shell hangs view refreshes
    /// off it.
    pub fn set_notify(&mut self, hook: impl Fn() + 'static) {
        let hook: Rc<dyn Fn()> = Rc::new(hook);
        let h = Rc::clone(&hook);
        self.patterns.set_notify(move || h());
        let h = Rc::clone(&hook);
        self.samples.set_notify(move || h());
        self.instruments.set_notify(move || hook());
    }

    /// Drop all undo/redo state, e.g. after replacing the document.
    pub fn clear_history(&mut self) {
        self.patterns.clear();
        self.samples.clear();
        self.instruments.clear();
    }

    // --- Pattern edits ---

    /// Capture a pattern undo point. See
    /// [`PatternHistory::prepare_undo`](bt_history::PatternHistory::prepare_undo).
    pub fn prepare_pattern_undo(
        &mut self,
        region: PatternRegion,
        description: &str,
        link_to_previous: bool,
        store_channel_info: bool,
    ) -> Result<(), HistoryError> {
        self.patterns.prepare_undo(
            &self.module,
            region,
            description,
            link_to_previous,
            store_channel_info,
        )
    }

    /// Undo the most recent pattern edit. Returns the last pattern
    /// restored so the shell can scroll to it.
    pub fn undo_pattern(&mut self) -> Option<PatternId> {
        self.patterns.undo(&mut self.module)
    }

    pub fn redo_pattern(&mut self) -> Option<PatternId> {
        self.patterns.redo(&mut self.module)
    }

    // --- Sample edits ---

    /// Capture a sample undo point. See
    /// [`SampleHistory::prepare_undo`](bt_history::SampleHistory::prepare_undo).
    pub fn prepare_sample_undo(
        &mut self,
        id: SampleId,
        change: SampleChange,
        description: &str,
        change_start: u32,
        change_end: u32,
    ) -> Result<(), HistoryError> {
        self.samples
            .prepare_undo(&self.module, id, change, description, change_start, change_end)
    }

    pub fn undo_sample(&mut self, id: SampleId) -> bool {
        self.samples.undo(&mut self.module, id)
    }

    pub fn redo_sample(&mut self, id: SampleId) -> bool {
        self.samples.redo(&mut self.module, id)
    }

    // --- Instrument edits ---

    /// Capture an instrument undo point. See
    /// [`InstrumentHistory::prepare_undo`](bt_history::InstrumentHistory::prepare_undo).
    pub fn prepare_instrument_undo(
        &mut self,
        id: InstrumentId,
        target: InstrumentTarget,
        description: &str,
    ) -> Result<(), HistoryError> {
        self.instruments
            .prepare_undo(&self.module, id, target, description)
    }

    pub fn undo_instrument(&mut self, id: InstrumentId) -> bool {
        self.instruments.undo(&mut self.module, id)
    }

    pub fn redo_instrument(&mut self, id: InstrumentId) -> bool {
        self.instruments.redo(&mut self.module, id)
    }

    // --- Document reordering ---
    //
    // Reordering is not undoable itself; it rewrites the ids stored in
    // the histories so existing steps keep pointing at the right entity.

    /// Reorder the sample list. `new_index[i]` is the new id of old id
    /// `i + 1`; a new id of 0 drops the sample. Live instrument keyboard
    /// tables and all history references follow the move.
    pub fn rearrange_samples(&mut self, new_index: &[SampleId]) {
        let old = std::mem::take(&mut self.module.samples);
        let new_count = new_index.iter().copied().max().unwrap_or(0) as usize;
        let mut samples = vec![Sample::default(); new_count];
        for (i, sample) in old.into_iter().enumerate() {
            if let Some(slot) = new_index.get(i).and_then(|id| id.checked_sub(1)) {
                samples[slot as usize] = sample;
            }
        }
        self.module.samples = samples;

        for slot in &mut self.module.instruments {
            if let Some(instrument) = slot {
                for entry in &mut instrument.sample_map {
                    if *entry != 0 {
                        *entry = remap(*entry, new_index);
                    }
                }
            }
        }

        self.samples.rearrange_samples(new_index);
        for id in 1..=self.module.instruments.len() as InstrumentId {
            self.instruments.rearrange_samples(id, new_index);
        }
        self.module.modified = true;
    }

    /// Reorder the instrument list. Same mapping convention as
    /// [`Editor::rearrange_samples`].
    pub fn rearrange_instruments(&mut self, new_index: &[InstrumentId]) {
        let old = std::mem::take(&mut self.module.instruments);
        let new_count = new_index.iter().copied().max().unwrap_or(0) as usize;
        let mut instruments = vec![None; new_count];
        for (i, slot) in old.into_iter().enumerate() {
            if let Some(n) = new_index.get(i).and_then(|id| id.checked_sub(1)) {
                instruments[n as usize] = slot;
            }
        }
        self.module.instruments = instruments;
        self.instruments.rearrange_instruments(new_index);
        self.module.modified = true;
    }

    /// Reorder pattern slots. `new_index` has one entry per existing
    /// slot; `new_index[old]` is the new slot index. Old slots without an
    /// entry are dropped.
    pub fn rearrange_patterns(&mut self, new_index: &[PatternId]) {
        let old = std::mem::take(&mut self.module.patterns);
        let new_count = new_index.iter().map(|&n| n + 1).max().unwrap_or(0);
        let mut patterns = vec![None; new_count];
        for (i, slot) in old.into_iter().enumerate() {
            if let Some(&n) = new_index.get(i) {
                patterns[n] = slot;
            }
        }
        self.module.patterns = patterns;
        self.patterns.rearrange(new_index);
        self.module.modified = true;
    }

    /// Rebuild the channel layout. `sources[i]` names the old channel
    /// that becomes new channel `i` (`None` = new blank channel).
    pub fn rearrange_channels(&mut self, sources: &[Option<u8>]) {
        self.module.rearrange_channels(sources);
        self.module.modified = true;
    }
}

/// Map a 1-based id through a reordering table (0 = dropped).
fn remap(id: u16, new_index: &[u16]) -> u16 {
    id.checked_sub(1)
        .and_then(|i| new_index.get(i as usize))
        .copied()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rearrange_samples_moves_data_and_references() {
        let mut editor = Editor::new();
        let kick = editor.module_mut().push_sample(Sample::new("kick"));
        let hat = editor.module_mut().push_sample(Sample::new("hat"));
        let mut inst = Instrument::new("drums");
        inst.set_single_sample(kick);
        editor.module_mut().push_instrument(inst);
        editor
            .prepare_sample_undo(hat, SampleChange::None, "Rename", 0, 0)
            .unwrap();

        // Swap the two samples.
        editor.rearrange_samples(&[2, 1]);

        let module = editor.module();
        assert_eq!(module.sample(1).unwrap().header.name.as_str(), "hat");
        assert_eq!(module.sample(2).unwrap().header.name.as_str(), "kick");
        assert!(module
            .instrument(1)
            .unwrap()
            .sample_map
            .iter()
            .all(|&s| s == 2));
        assert!(editor.samples().can_undo(1));
        assert!(!editor.samples().can_undo(2));
    }

    #[test]
    fn rearrange_instruments_moves_slots() {
        let mut editor = Editor::new();
        editor.module_mut().push_instrument(Instrument::new("a"));
        editor.module_mut().push_instrument(Instrument::new("b"));
        editor
            .prepare_instrument_undo(1, InstrumentTarget::Whole, "edit a")
            .unwrap();

        // Drop instrument 2, keep instrument 1 at a new slot.
        editor.rearrange_instruments(&[2, 0]);

        let module = editor.module();
        assert_eq!(module.instruments.len(), 2);
        assert!(module.instrument(1).is_none());
        assert_eq!(module.instrument(2).unwrap().name.as_str(), "a");
        assert!(editor.instruments().can_undo(2));
        assert!(!editor.instruments().can_undo(1));
    }

    #[test]
    fn rearrange_patterns_follows_history() {
        let mut editor = Editor::new();
        let p0 = editor.module_mut().push_pattern(16);
        let p1 = editor.module_mut().push_pattern(32);
        editor
            .prepare_pattern_undo(PatternRegion::whole(p1), "Note Entry", false, false)
            .unwrap();

        editor.rearrange_patterns(&[1, 0]);

        let module = editor.module();
        assert_eq!(module.pattern(0).unwrap().rows, 32);
        assert_eq!(module.pattern(1).unwrap().rows, 16);
        // The stored step now points at the pattern's new slot.
        let restored = editor.undo_pattern();
        assert_eq!(restored, Some(p0));
    }

    #[test]
    fn notify_fans_out_to_all_engines() {
        use std::cell::Cell as StdCell;

        let mut editor = Editor::new();
        let pattern = editor.module_mut().push_pattern(8);
        editor.module_mut().push_sample(Sample::with_frames(
            "kick",
            16,
            Default::default(),
        ));
        editor.module_mut().push_instrument(Instrument::new("a"));

        let count = Rc::new(StdCell::new(0));
        let hook = Rc::clone(&count);
        editor.set_notify(move || hook.set(hook.get() + 1));

        editor
            .prepare_pattern_undo(PatternRegion::whole(pattern), "Note Entry", false, false)
            .unwrap();
        editor
            .prepare_sample_undo(1, SampleChange::Invert, "Invert", 0, 16)
            .unwrap();
        editor
            .prepare_instrument_undo(1, InstrumentTarget::Whole, "Edit")
            .unwrap();
        assert_eq!(count.get(), 3);

        editor.module_mut().sample_mut(1).unwrap().invert(0, 16);
        assert!(editor.undo_sample(1));
        assert_eq!(count.get(), 4);
    }

    #[test]
    fn clear_history_empties_every_engine() {
        let mut editor = Editor::new();
        let pattern = editor.module_mut().push_pattern(8);
        editor.module_mut().push_sample(Sample::with_frames(
            "kick",
            16,
            Default::default(),
        ));
        editor
            .prepare_pattern_undo(PatternRegion::whole(pattern), "Note Entry", false, false)
            .unwrap();
        editor
            .prepare_sample_undo(1, SampleChange::Invert, "Invert", 0, 16)
            .unwrap();

        editor.clear_history();
        assert!(!editor.patterns().can_undo());
        assert!(!editor.samples().can_undo(1));
    }
}
