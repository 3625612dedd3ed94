//! Instrument history: envelope or whole-record snapshots.
//!
//! Instrument edits are small, so steps store full clones instead of
//! deltas: either one envelope slot or the entire instrument record. No
//! byte budget applies, only the per-instrument depth cap.

use std::collections::BTreeMap;

use bt_ir::{Envelope, EnvelopeKind, Instrument, InstrumentId, Module, SampleId};

use crate::{evict_for_push, fire, HistoryError, NotifyHook, DEFAULT_UNDO_DEPTH};

/// How much of an instrument a step snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstrumentTarget {
    /// One envelope slot (which may be empty)
    Envelope(EnvelopeKind),
    /// The whole instrument record
    Whole,
}

#[derive(Clone, Debug)]
enum Snapshot {
    Envelope(EnvelopeKind, Option<Envelope>),
    Whole(Box<Instrument>),
}

#[derive(Clone, Debug)]
struct InstrumentStep {
    snapshot: Snapshot,
    description: String,
}

type Stacks = BTreeMap<InstrumentId, Vec<InstrumentStep>>;

#[derive(Clone, Copy)]
enum Direction {
    Undo,
    Redo,
}

/// Undo/redo history for instrument definitions.
pub struct InstrumentHistory {
    undo_steps: Stacks,
    redo_steps: Stacks,
    depth: usize,
    notify: NotifyHook,
}

impl Default for InstrumentHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl InstrumentHistory {
    pub fn new() -> Self {
        Self::with_depth(DEFAULT_UNDO_DEPTH)
    }

    /// Create a history with a per-instrument step cap.
    pub fn with_depth(depth: usize) -> Self {
        Self {
            undo_steps: Stacks::new(),
            redo_steps: Stacks::new(),
            depth: depth.max(1),
            notify: None,
        }
    }

    /// Install the change notification hook.
    pub fn set_notify(&mut self, hook: impl FnMut() + 'static) {
        self.notify = Some(Box::new(hook));
    }

    /// Capture an undo point for an instrument. On success the
    /// instrument's redo history is cleared.
    pub fn prepare_undo(
        &mut self,
        module: &Module,
        id: InstrumentId,
        target: InstrumentTarget,
        description: &str,
    ) -> Result<(), HistoryError> {
        self.prepare_step(module, id, target, description, Direction::Undo)?;
        self.redo_steps.remove(&id);
        fire(&mut self.notify);
        Ok(())
    }

    /// Revert the most recent undo step for an instrument.
    pub fn undo(&mut self, module: &mut Module, id: InstrumentId) -> bool {
        self.restore(module, id, Direction::Undo)
    }

    /// Re-apply the most recent redo step for an instrument.
    pub fn redo(&mut self, module: &mut Module, id: InstrumentId) -> bool {
        self.restore(module, id, Direction::Redo)
    }

    fn prepare_step(
        &mut self,
        module: &Module,
        id: InstrumentId,
        target: InstrumentTarget,
        description: &str,
        dir: Direction,
    ) -> Result<(), HistoryError> {
        let instrument = module.instrument(id).ok_or(HistoryError::InvalidEntity)?;
        let snapshot = match target {
            InstrumentTarget::Envelope(kind) => {
                Snapshot::Envelope(kind, instrument.envelope(kind).clone())
            }
            InstrumentTarget::Whole => Snapshot::Whole(Box::new(instrument.clone())),
        };
        let depth = self.depth;
        let steps = self.stacks_mut(dir).entry(id).or_default();
        evict_for_push(steps, depth);
        steps.push(InstrumentStep {
            snapshot,
            description: description.to_string(),
        });
        Ok(())
    }

    fn restore(&mut self, module: &mut Module, id: InstrumentId, dir: Direction) -> bool {
        if module.instrument(id).is_none() {
            return false;
        }
        let Some(step) = self.stacks_mut(dir).get_mut(&id).and_then(Vec::pop) else {
            return false;
        };

        // Mirror the current state into the opposite stack under the same
        // selector. The instrument exists, so this cannot fail.
        let target = match &step.snapshot {
            Snapshot::Envelope(kind, _) => InstrumentTarget::Envelope(*kind),
            Snapshot::Whole(_) => InstrumentTarget::Whole,
        };
        let opposite = match dir {
            Direction::Undo => Direction::Redo,
            Direction::Redo => Direction::Undo,
        };
        let _ = self.prepare_step(module, id, target, &step.description, opposite);

        let Some(instrument) = module.instrument_mut(id) else {
            return false;
        };
        match step.snapshot {
            Snapshot::Envelope(kind, envelope) => *instrument.envelope_mut(kind) = envelope,
            Snapshot::Whole(saved) => *instrument = *saved,
        }
        module.modified = true;
        fire(&mut self.notify);
        true
    }

    /// Discard the most recent undo step for an instrument without
    /// restoring it.
    pub fn remove_last_step(&mut self, id: InstrumentId) {
        if let Some(steps) = self.undo_steps.get_mut(&id) {
            steps.pop();
        }
    }

    /// Remove all undo and redo steps for all instruments.
    pub fn clear(&mut self) {
        self.undo_steps.clear();
        self.redo_steps.clear();
    }

    /// Remove all undo and redo steps of one instrument.
    pub fn clear_instrument(&mut self, id: InstrumentId) {
        self.undo_steps.remove(&id);
        self.redo_steps.remove(&id);
    }

    /// Remap per-instrument stacks after the document reordered
    /// instruments. `new_index[i]` is the new id of old id `i + 1`; a new
    /// id of 0 or an old id beyond the mapping clears that instrument's
    /// history.
    pub fn rearrange_instruments(&mut self, new_index: &[InstrumentId]) {
        rearrange(&mut self.undo_steps, new_index);
        rearrange(&mut self.redo_steps, new_index);
    }

    /// Rewrite sample references inside one instrument's whole-record
    /// snapshots after the document reordered samples. `new_index[i]` is
    /// the new id of old sample id `i + 1`; unmapped references become 0.
    pub fn rearrange_samples(&mut self, id: InstrumentId, new_index: &[SampleId]) {
        for stacks in [&mut self.undo_steps, &mut self.redo_steps] {
            let Some(steps) = stacks.get_mut(&id) else {
                continue;
            };
            for step in steps {
                if let Snapshot::Whole(instrument) = &mut step.snapshot {
                    for entry in &mut instrument.sample_map {
                        if *entry != 0 {
                            *entry = entry
                                .checked_sub(1)
                                .and_then(|i| new_index.get(i as usize))
                                .copied()
                                .unwrap_or(0);
                        }
                    }
                }
            }
        }
    }

    pub fn can_undo(&self, id: InstrumentId) -> bool {
        self.undo_steps.get(&id).is_some_and(|s| !s.is_empty())
    }

    pub fn can_redo(&self, id: InstrumentId) -> bool {
        self.redo_steps.get(&id).is_some_and(|s| !s.is_empty())
    }

    /// Label of the next undo step for an instrument ("" if none).
    pub fn undo_name(&self, id: InstrumentId) -> String {
        step_name(&self.undo_steps, id)
    }

    /// Label of the next redo step for an instrument ("" if none).
    pub fn redo_name(&self, id: InstrumentId) -> String {
        step_name(&self.redo_steps, id)
    }

    fn stacks_mut(&mut self, dir: Direction) -> &mut Stacks {
        match dir {
            Direction::Undo => &mut self.undo_steps,
            Direction::Redo => &mut self.redo_steps,
        }
    }
}

fn rearrange(stacks: &mut Stacks, new_index: &[InstrumentId]) {
    let old = std::mem::take(stacks);
    for (id, steps) in old {
        let new_id = id
            .checked_sub(1)
            .and_then(|i| new_index.get(i as usize))
            .copied()
            .unwrap_or(0);
        if new_id != 0 && !steps.is_empty() {
            stacks.insert(new_id, steps);
        }
    }
}

fn step_name(stacks: &Stacks, id: InstrumentId) -> String {
    stacks
        .get(&id)
        .and_then(|steps| steps.last())
        .map(|step| step.description.clone())
        .unwrap_or_default()
}
