//! Sample history: byte-range snapshots of sample audio data.
//!
//! Every step saves a full copy of the pre-mutation sample header and, for
//! change kinds that destroy data, exactly the affected byte range. The
//! other kinds are self-inverse or reconstructible from the header alone
//! and carry no payload. One byte budget is shared by the undo and redo
//! stacks across *all* samples; going over it evicts the oldest steps in a
//! round-robin sweep over the sample slots.

use std::collections::BTreeMap;

use bt_ir::{Module, SampleHeader, SampleId};

use crate::{evict_for_push, fire, HistoryError, NotifyHook, DEFAULT_UNDO_DEPTH};

/// What kind of mutation a sample undo step protects.
///
/// The kind selects both the restore algorithm and the payload shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleChange {
    /// Header-only change, no data payload
    None,
    /// Phase inversion of a range (self-inverse)
    Invert,
    /// Reversal of a range's frame order (self-inverse)
    Reverse,
    /// Signedness toggle of a range (self-inverse)
    Unsign,
    /// Data was inserted at the range; undo removes it again
    Insert,
    /// Data in the range was overwritten; payload holds the old bytes
    Update,
    /// The range was deleted; payload holds the removed bytes
    Delete,
    /// The whole buffer was replaced; payload holds the old buffer
    Replace,
}

impl SampleChange {
    /// The kind a step takes when an undo point turns into a redo point
    /// (and vice versa): delete and insert swap, everything else is its
    /// own mirror.
    pub fn mirrored(self) -> Self {
        match self {
            SampleChange::Delete => SampleChange::Insert,
            SampleChange::Insert => SampleChange::Delete,
            other => other,
        }
    }

    fn needs_payload(self) -> bool {
        matches!(
            self,
            SampleChange::Update | SampleChange::Delete | SampleChange::Replace
        )
    }
}

/// One undo/redo step for a sample.
#[derive(Clone, Debug)]
struct SampleStep {
    /// Full header copy from before the mutation
    header: SampleHeader,
    change: SampleChange,
    /// Change range in frames, `[start, end)`
    start: u32,
    end: u32,
    /// Saved bytes of the affected range, present only for kinds that
    /// need them
    payload: Option<Vec<u8>>,
    /// Human-readable action label
    description: String,
}

impl SampleStep {
    fn payload_bytes(&self) -> usize {
        self.payload.as_ref().map_or(0, Vec::len)
    }
}

type Stacks = BTreeMap<SampleId, Vec<SampleStep>>;

#[derive(Clone, Copy)]
enum Direction {
    Undo,
    Redo,
}

impl Direction {
    fn opposite(self) -> Self {
        match self {
            Direction::Undo => Direction::Redo,
            Direction::Redo => Direction::Undo,
        }
    }
}

/// Undo/redo history for sample audio data.
pub struct SampleHistory {
    undo_steps: Stacks,
    redo_steps: Stacks,
    depth: usize,
    byte_budget: usize,
    notify: NotifyHook,
}

impl SampleHistory {
    /// Create a history sharing `byte_budget` bytes of payload across all
    /// samples and both directions. A budget of zero disables capture.
    pub fn new(byte_budget: usize) -> Self {
        Self::with_depth(byte_budget, DEFAULT_UNDO_DEPTH)
    }

    /// As [`SampleHistory::new`] with a per-sample step cap.
    pub fn with_depth(byte_budget: usize, depth: usize) -> Self {
        Self {
            undo_steps: Stacks::new(),
            redo_steps: Stacks::new(),
            depth: depth.max(1),
            byte_budget,
            notify: None,
        }
    }

    /// Install the change notification hook.
    pub fn set_notify(&mut self, hook: impl FnMut() + 'static) {
        self.notify = Some(Box::new(hook));
    }

    /// Total payload bytes currently held across all samples and both
    /// directions. Never exceeds the configured budget.
    pub fn used_bytes(&self) -> usize {
        used(&self.undo_steps) + used(&self.redo_steps)
    }

    /// Capture an undo point for a sample.
    ///
    /// The caller states what kind of mutation is about to happen and the
    /// affected frame range; `Replace` forces the range to the whole
    /// sample and `None` to empty. On success the sample's redo history
    /// is cleared.
    pub fn prepare_undo(
        &mut self,
        module: &Module,
        id: SampleId,
        change: SampleChange,
        description: &str,
        change_start: u32,
        change_end: u32,
    ) -> Result<(), HistoryError> {
        self.prepare_step(
            module,
            id,
            change,
            description,
            change_start,
            change_end,
            Direction::Undo,
        )?;
        self.redo_steps.remove(&id);
        fire(&mut self.notify);
        Ok(())
    }

    /// Revert the most recent undo step for a sample.
    pub fn undo(&mut self, module: &mut Module, id: SampleId) -> bool {
        self.restore(module, id, Direction::Undo)
    }

    /// Re-apply the most recent redo step for a sample.
    pub fn redo(&mut self, module: &mut Module, id: SampleId) -> bool {
        self.restore(module, id, Direction::Redo)
    }

    /// Validate, evict, snapshot, push. Shared by public capture and the
    /// mirror capture inside undo/redo.
    fn prepare_step(
        &mut self,
        module: &Module,
        id: SampleId,
        change: SampleChange,
        description: &str,
        change_start: u32,
        change_end: u32,
        dir: Direction,
    ) -> Result<(), HistoryError> {
        let sample = module.sample(id).ok_or(HistoryError::InvalidEntity)?;
        if self.byte_budget == 0 {
            return Err(HistoryError::Disabled);
        }

        let (start, end) = match change {
            SampleChange::Replace => (0, sample.header.length),
            SampleChange::None => (0, 0),
            _ => (change_start, change_end),
        };
        if start > sample.header.length || start > end {
            return Err(HistoryError::InvalidRange);
        }
        let needs_payload = change.needs_payload() && sample.has_data();
        if needs_payload && end > sample.header.length {
            return Err(HistoryError::InvalidRange);
        }

        let depth = self.depth;
        let steps = self.stacks_mut(dir).entry(id).or_default();
        evict_for_push(steps, depth);

        // Make room for the incoming payload before copying it, so the
        // stored total never exceeds the budget.
        let payload_len = if needs_payload {
            (end - start) as usize * sample.header.format.bytes_per_frame()
        } else {
            0
        };
        self.restrict_budget(payload_len)?;

        let payload = if needs_payload {
            let mut buf = Vec::new();
            buf.try_reserve_exact(payload_len)
                .map_err(|_| HistoryError::OutOfMemory)?;
            buf.extend_from_slice(&sample.data[sample.byte_range(start, end)]);
            Some(buf)
        } else {
            None
        };

        let step = SampleStep {
            header: sample.header.clone(),
            change,
            start,
            end,
            payload,
            description: description.to_string(),
        };
        self.stacks_mut(dir)
            .entry(id)
            .or_default()
            .push(step);
        Ok(())
    }

    /// Restore the top step of one stack, mirroring the current state into
    /// the other.
    fn restore(&mut self, module: &mut Module, id: SampleId, dir: Direction) -> bool {
        // Pre-validate against the top step so a failed restore leaves
        // both stacks and the document untouched.
        let Some(sample) = module.sample(id) else {
            return false;
        };
        let Some(top) = self.stacks(dir).get(&id).and_then(|steps| steps.last()) else {
            return false;
        };

        let bpf = top.header.format.bytes_per_frame();
        if top.change == SampleChange::Update && sample.header.length < top.end {
            return false;
        }

        // Undoing a delete rebuilds the pre-delete buffer: unchanged
        // prefix, saved payload, unchanged suffix. Built up front because
        // the allocation can fail.
        let rebuilt = if top.change == SampleChange::Delete {
            let Some(payload) = &top.payload else {
                return false;
            };
            let old_len_b = top.header.length as usize * bpf;
            let start_b = (top.start as usize * bpf).min(old_len_b);
            let end_b = (top.end as usize * bpf).min(old_len_b);
            let mut data = Vec::new();
            if data.try_reserve_exact(old_len_b).is_err() {
                return false;
            }
            data.resize(old_len_b, 0);
            let cur = &sample.data;
            let prefix = start_b.min(cur.len());
            data[..prefix].copy_from_slice(&cur[..prefix]);
            let pay = payload.len().min(end_b - start_b);
            data[start_b..start_b + pay].copy_from_slice(&payload[..pay]);
            let suffix = (old_len_b - end_b).min(cur.len().saturating_sub(start_b));
            data[end_b..end_b + suffix].copy_from_slice(&cur[start_b..start_b + suffix]);
            Some(data)
        } else {
            None
        };

        let Some(mut step) = self.stacks_mut(dir).get_mut(&id).and_then(Vec::pop) else {
            return false;
        };

        // Mirror-capture the current state under the opposite kind so the
        // restore is reversible. If this fails (budget, allocation) the
        // restore still happens; it just can't be reversed back.
        let _ = self.prepare_step(
            module,
            id,
            step.change.mirrored(),
            &step.description,
            step.start,
            step.end,
            dir.opposite(),
        );

        let Some(sample) = module.sample_mut(id) else {
            return false;
        };
        let was_external = sample.header.external;
        match step.change {
            SampleChange::None => {}
            SampleChange::Invert => sample.invert(step.start, step.end),
            SampleChange::Reverse => sample.reverse(step.start, step.end),
            SampleChange::Unsign => sample.unsign(step.start, step.end),
            SampleChange::Insert => {
                // Remove the inserted range and drop back to the captured
                // length.
                let range = sample.byte_range(step.start, step.end);
                sample.data.drain(range);
                sample.data.resize(step.header.length as usize * bpf, 0);
            }
            SampleChange::Update => {
                if let Some(payload) = step.payload.take() {
                    let start_b = step.start as usize * bpf;
                    let end_b = (start_b + payload.len()).min(sample.data.len());
                    if start_b < end_b {
                        sample.data[start_b..end_b].copy_from_slice(&payload[..end_b - start_b]);
                    }
                }
            }
            SampleChange::Delete => {
                if let Some(data) = rebuilt {
                    sample.data = data;
                }
            }
            SampleChange::Replace => {
                // Ownership of the saved buffer transfers to the sample.
                sample.data = step.payload.take().unwrap_or_default();
            }
        }

        // Restore the saved header. The external flag is one-directional:
        // once disabled it is never re-enabled by a restore.
        let was_none = step.change == SampleChange::None;
        sample.header = step.header;
        if !was_external {
            sample.header.external = false;
        }
        if !was_none {
            sample.header.modified = true;
        }
        module.modified = true;
        fire(&mut self.notify);
        true
    }

    /// Evict oldest steps until stored payload plus `incoming` fits the
    /// budget. Fails only if `incoming` alone cannot fit.
    fn restrict_budget(&mut self, incoming: usize) -> Result<(), HistoryError> {
        let budget = self.byte_budget;
        if incoming > budget {
            return Err(HistoryError::OutOfMemory);
        }
        let mut capacity = self.used_bytes() + incoming;
        if capacity <= budget {
            return Ok(());
        }
        log::debug!(
            "sample history over budget ({} of {} bytes), evicting",
            capacity,
            budget
        );
        while capacity > budget {
            sweep(&mut self.undo_steps, &mut capacity, budget);
            sweep(&mut self.redo_steps, &mut capacity, budget);
        }
        Ok(())
    }

    /// Discard the most recent undo step for a sample without restoring
    /// it.
    pub fn remove_last_step(&mut self, id: SampleId) {
        if let Some(steps) = self.undo_steps.get_mut(&id) {
            steps.pop();
        }
    }

    /// Remove all undo and redo steps for all samples.
    pub fn clear(&mut self) {
        self.undo_steps.clear();
        self.redo_steps.clear();
    }

    /// Remove all undo and redo steps of one sample.
    pub fn clear_sample(&mut self, id: SampleId) {
        self.undo_steps.remove(&id);
        self.redo_steps.remove(&id);
    }

    /// Remap per-sample stacks after the document reordered samples.
    /// `new_index[i]` is the new id of old id `i + 1`; a new id of 0 or an
    /// old id beyond the mapping clears that sample's history.
    pub fn rearrange_samples(&mut self, new_index: &[SampleId]) {
        rearrange(&mut self.undo_steps, new_index);
        rearrange(&mut self.redo_steps, new_index);
    }

    pub fn can_undo(&self, id: SampleId) -> bool {
        self.undo_steps.get(&id).is_some_and(|s| !s.is_empty())
    }

    pub fn can_redo(&self, id: SampleId) -> bool {
        self.redo_steps.get(&id).is_some_and(|s| !s.is_empty())
    }

    /// Label of the next undo step for a sample ("" if none).
    pub fn undo_name(&self, id: SampleId) -> String {
        step_name(&self.undo_steps, id)
    }

    /// Label of the next redo step for a sample ("" if none).
    pub fn redo_name(&self, id: SampleId) -> String {
        step_name(&self.redo_steps, id)
    }

    fn stacks(&self, dir: Direction) -> &Stacks {
        match dir {
            Direction::Undo => &self.undo_steps,
            Direction::Redo => &self.redo_steps,
        }
    }

    fn stacks_mut(&mut self, dir: Direction) -> &mut Stacks {
        match dir {
            Direction::Undo => &mut self.undo_steps,
            Direction::Redo => &mut self.redo_steps,
        }
    }
}

fn used(stacks: &Stacks) -> usize {
    stacks
        .values()
        .flatten()
        .map(SampleStep::payload_bytes)
        .sum()
}

/// One eviction pass: visit sample slots in index order and, per slot,
/// delete steps from the oldest end through the first payload-bearing one,
/// then move on. Spreads the pressure over all samples instead of
/// draining one sample's history completely.
fn sweep(stacks: &mut Stacks, capacity: &mut usize, budget: usize) {
    for steps in stacks.values_mut() {
        if *capacity <= budget {
            return;
        }
        if let Some(i) = steps.iter().position(|s| s.payload.is_some()) {
            *capacity -= steps[i].payload_bytes();
            steps.drain(..=i);
        }
    }
}

fn rearrange(stacks: &mut Stacks, new_index: &[SampleId]) {
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

fn step_name(stacks: &Stacks, id: SampleId) -> String {
    stacks
        .get(&id)
        .and_then(|steps| steps.last())
        .map(|step| step.description.clone())
        .unwrap_or_default()
}
