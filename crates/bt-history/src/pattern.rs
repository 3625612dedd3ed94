//! Pattern history: rectangular snapshots of the note event grid.
//!
//! A capture saves the cells of one rectangle of one pattern (plus,
//! optionally, the per-channel settings for mutations that may change the
//! channel layout). Steps flagged `link_to_previous` are processed
//! together with their predecessors, so multi-pattern edits undo and redo
//! as one atomic group.

use bt_ir::{Cell, ChannelSettings, Module, PatternId};

use crate::{evict_for_push, fire, HistoryError, NotifyHook, DEFAULT_UNDO_DEPTH};

/// The rectangle of a pattern affected by a mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatternRegion {
    /// Pattern slot
    pub pattern: PatternId,
    /// First channel (0-based)
    pub first_channel: u8,
    /// First row (0-based)
    pub first_row: u16,
    /// Width in channels
    pub num_channels: u8,
    /// Height in rows
    pub num_rows: u16,
}

impl PatternRegion {
    /// A region covering one whole pattern (spans clamp at capture time).
    pub fn whole(pattern: PatternId) -> Self {
        Self {
            pattern,
            first_channel: 0,
            first_row: 0,
            num_channels: u8::MAX,
            num_rows: u16::MAX,
        }
    }
}

/// One undo/redo step: a captured rectangle and enough context to put the
/// pattern back into its captured shape.
#[derive(Clone, Debug)]
struct PatternStep {
    /// The captured rectangle, clamped to the bounds at capture time
    region: PatternRegion,
    /// Whole-pattern row count at capture time
    pattern_rows: u16,
    /// Saved cells, row-major, `num_rows * num_channels` entries
    cells: Vec<Cell>,
    /// Channel settings snapshot, present when the mutation could change
    /// the channel layout
    channel_settings: Option<Vec<ChannelSettings>>,
    /// Process together with the previous step
    link_to_previous: bool,
    /// Human-readable action label
    description: String,
}

enum Direction {
    Undo,
    Redo,
}

/// Undo/redo history for the pattern grid.
pub struct PatternHistory {
    undo_steps: Vec<PatternStep>,
    redo_steps: Vec<PatternStep>,
    depth: usize,
    notify: NotifyHook,
}

impl PatternHistory {
    /// Create a history with the default depth cap.
    pub fn new() -> Self {
        Self::with_depth(DEFAULT_UNDO_DEPTH)
    }

    /// Create a history keeping at most `depth` steps per direction.
    pub fn with_depth(depth: usize) -> Self {
        Self {
            undo_steps: Vec::new(),
            redo_steps: Vec::new(),
            depth: depth.max(1),
            notify: None,
        }
    }

    /// Install the change notification hook.
    pub fn set_notify(&mut self, hook: impl FnMut() + 'static) {
        self.notify = Some(Box::new(hook));
    }

    /// Capture an undo point for a rectangle of a pattern.
    ///
    /// The spans are clamped to the pattern's extent; a `first_row` or
    /// `first_channel` outside the pattern, a zero span, or a missing
    /// pattern is rejected. On success the redo history is cleared.
    ///
    /// Set `store_channel_info` when the mutation may also change channel
    /// count or settings; set `link_to_previous` for commands that modify
    /// several patterns as one action.
    pub fn prepare_undo(
        &mut self,
        module: &Module,
        region: PatternRegion,
        description: &str,
        link_to_previous: bool,
        store_channel_info: bool,
    ) -> Result<(), HistoryError> {
        let step = capture(module, region, description, link_to_previous, store_channel_info)?;
        evict_for_push(&mut self.undo_steps, self.depth);
        self.undo_steps.push(step);
        self.redo_steps.clear();
        fire(&mut self.notify);
        Ok(())
    }

    /// Revert the most recent undo step (and any steps linked to it).
    /// Returns the last pattern restored, or `None` if there was nothing
    /// to undo.
    pub fn undo(&mut self, module: &mut Module) -> Option<PatternId> {
        self.restore(module, Direction::Undo)
    }

    /// Re-apply the most recent redo step (and any steps linked to it).
    pub fn redo(&mut self, module: &mut Module) -> Option<PatternId> {
        self.restore(module, Direction::Redo)
    }

    /// Restore steps from one stack, mirroring each into the other.
    ///
    /// Channel-count reconciliation is best effort: when the snapshot's
    /// channel count differs from the document's, channels are matched up
    /// by index (identity prefix) and the remainder padded or dropped. A
    /// channel rearrangement performed after the capture cannot be told
    /// apart from an append/remove.
    fn restore(&mut self, module: &mut Module, dir: Direction) -> Option<PatternId> {
        let mut restored = None;
        let mut continuation = false;
        loop {
            let step = {
                let from = match dir {
                    Direction::Undo => &mut self.undo_steps,
                    Direction::Redo => &mut self.redo_steps,
                };
                match from.pop() {
                    Some(step) => step,
                    None => break,
                }
            };

            // Mirror-capture the current state of the same rectangle into
            // the opposite stack, so this restore is itself reversible.
            // Continuation steps keep the link flag so the group stays
            // atomic in the opposite direction.
            if let Ok(mirror) = capture(
                module,
                step.region,
                &step.description,
                continuation,
                step.channel_settings.is_some(),
            ) {
                let to = match dir {
                    Direction::Undo => &mut self.redo_steps,
                    Direction::Redo => &mut self.undo_steps,
                };
                evict_for_push(to, self.depth);
                to.push(mirror);
            }

            // Bring the channel layout back to the snapshot's before
            // touching cells.
            if let Some(settings) = &step.channel_settings {
                if settings.len() != module.channel_count() as usize {
                    let overlap = settings.len().min(module.channel_count() as usize);
                    let sources: Vec<Option<u8>> = (0..settings.len())
                        .map(|i| (i < overlap).then_some(i as u8))
                        .collect();
                    module.rearrange_channels(&sources);
                }
                module.channels.clone_from(settings);
            }

            restored = Some(step.region.pattern);
            let mut link = false;
            let region = step.region;
            if region.first_channel as usize + region.num_channels as usize
                <= module.channel_count() as usize
            {
                if module.pattern(region.pattern).is_none() {
                    if !module.insert_pattern(region.pattern, step.pattern_rows) {
                        return None;
                    }
                } else if let Some(pattern) = module.pattern_mut(region.pattern) {
                    if pattern.rows != step.pattern_rows {
                        pattern.resize(step.pattern_rows);
                    }
                }
                if let Some(pattern) = module.pattern_mut(region.pattern) {
                    let copy_rows = region
                        .num_rows
                        .min(pattern.rows.saturating_sub(region.first_row));
                    for r in 0..copy_rows {
                        for c in 0..region.num_channels {
                            *pattern.cell_mut(region.first_row + r, region.first_channel + c) =
                                step.cells
                                    [r as usize * region.num_channels as usize + c as usize];
                        }
                    }
                    link = step.link_to_previous;
                }
            }

            if !link {
                break;
            }
            log::trace!("pattern step linked to previous, continuing group");
            continuation = true;
        }

        if restored.is_some() {
            fire(&mut self.notify);
        }
        restored
    }

    /// Discard the most recent undo step without restoring it. Used when a
    /// planned mutation is aborted after its undo point was captured.
    pub fn remove_last_step(&mut self) {
        self.undo_steps.pop();
    }

    /// Remove all undo and redo steps.
    pub fn clear(&mut self) {
        self.undo_steps.clear();
        self.redo_steps.clear();
    }

    /// Remap stored pattern ids after the document reordered patterns.
    /// `new_index[old]` is the new id; ids beyond the mapping are left
    /// untouched.
    pub fn rearrange(&mut self, new_index: &[PatternId]) {
        for step in self.undo_steps.iter_mut().chain(&mut self.redo_steps) {
            if let Some(&new) = new_index.get(step.region.pattern) {
                step.region.pattern = new;
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_steps.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_steps.is_empty()
    }

    /// Menu label for the next undo step ("" if none).
    pub fn undo_name(&self) -> String {
        step_name(self.undo_steps.last())
    }

    /// Menu label for the next redo step ("" if none).
    pub fn redo_name(&self) -> String {
        step_name(self.redo_steps.last())
    }
}

impl Default for PatternHistory {
    fn default() -> Self {
        Self::new()
    }
}

fn step_name(step: Option<&PatternStep>) -> String {
    let Some(step) = step else {
        return String::new();
    };
    if step.link_to_previous {
        format!("{} (Multiple Patterns)", step.description)
    } else {
        format!(
            "{} (Pat {} Row {} Chn {})",
            step.description,
            step.region.pattern,
            step.region.first_row,
            step.region.first_channel + 1
        )
    }
}

/// Validate and clamp the region, then copy its cells out of the pattern.
fn capture(
    module: &Module,
    mut region: PatternRegion,
    description: &str,
    link_to_previous: bool,
    store_channel_info: bool,
) -> Result<PatternStep, HistoryError> {
    let pattern = module.pattern(region.pattern).ok_or(HistoryError::InvalidEntity)?;
    let rows = pattern.rows;
    let channels = module.channel_count();
    if region.num_rows == 0 || region.num_channels == 0 {
        return Err(HistoryError::InvalidRange);
    }
    if region.first_row >= rows || region.first_channel >= channels {
        return Err(HistoryError::InvalidRange);
    }
    region.num_rows = region.num_rows.min(rows - region.first_row);
    region.num_channels = region.num_channels.min(channels - region.first_channel);

    let len = region.num_rows as usize * region.num_channels as usize;
    let mut cells = Vec::new();
    cells
        .try_reserve_exact(len)
        .map_err(|_| HistoryError::OutOfMemory)?;
    for r in 0..region.num_rows {
        for c in 0..region.num_channels {
            cells.push(*pattern.cell(region.first_row + r, region.first_channel + c));
        }
    }

    let channel_settings = store_channel_info.then(|| module.channels.clone());
    Ok(PatternStep {
        region,
        pattern_rows: rows,
        cells,
        channel_settings,
        link_to_previous,
        description: description.to_string(),
    })
}
