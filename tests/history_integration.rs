//! Integration test: full edit sessions through the editor — capture,
//! mutate, undo, redo — across all three history engines.

use backtrack::{
    Editor, EditorConfig, Instrument, InstrumentTarget, Note, PatternRegion, Sample,
    SampleChange,
};

fn editor_with_sample(frames: u32) -> Editor {
    let mut editor = Editor::new();
    let mut sample = Sample::with_frames("kick", frames, Default::default());
    for (i, b) in sample.data.iter_mut().enumerate() {
        *b = i as u8;
    }
    editor.module_mut().push_sample(sample);
    editor
}

// --- Sample sessions ---

#[test]
fn delete_range_session_round_trips() {
    // Delete frames [100, 150) of a 1000-frame 8-bit mono sample, then
    // walk the whole history both ways.
    let mut editor = editor_with_sample(1000);
    let original = editor.module().sample(1).unwrap().data.clone();

    editor
        .prepare_sample_undo(1, SampleChange::Delete, "Delete Selection", 100, 150)
        .unwrap();
    {
        let sample = editor.module_mut().sample_mut(1).unwrap();
        sample.data.drain(100..150);
        sample.header.length = 950;
    }
    assert_eq!(editor.samples().undo_name(1), "Delete Selection");

    assert!(editor.undo_sample(1));
    let sample = editor.module().sample(1).unwrap();
    assert_eq!(sample.header.length, 1000);
    assert_eq!(sample.data, original);
    assert_eq!(editor.samples().redo_name(1), "Delete Selection");

    assert!(editor.redo_sample(1));
    let sample = editor.module().sample(1).unwrap();
    assert_eq!(sample.header.length, 950);
    assert_eq!(&sample.data[..100], &original[..100]);
    assert_eq!(&sample.data[100..], &original[150..]);
}

#[test]
fn sample_budget_is_enforced_through_the_editor() {
    let mut editor = Editor::with_config(EditorConfig {
        sample_byte_budget: 64,
        ..Default::default()
    });
    editor
        .module_mut()
        .push_sample(Sample::with_frames("kick", 256, Default::default()));

    for _ in 0..10 {
        editor
            .prepare_sample_undo(1, SampleChange::Update, "Amplify", 0, 32)
            .unwrap();
        assert!(editor.samples().used_bytes() <= 64);
    }
}

// --- Pattern sessions ---

#[test]
fn pattern_rectangle_survives_shrink_and_regrow() {
    // Snapshot a 4 channel x 8 row rectangle at (row 2, channel 1), then
    // shrink the pattern before undoing. The restore regrows the pattern
    // to its captured row count and copies the rectangle back.
    let mut editor = Editor::new();
    // Widen the default 4-channel module so the rectangle fits.
    let sources: Vec<Option<u8>> = (0..8).map(|i| (i < 4).then_some(i)).collect();
    editor.rearrange_channels(&sources);
    let id = editor.module_mut().push_pattern(16);
    for row in 2..10 {
        for channel in 1..5 {
            editor.module_mut().pattern_mut(id).unwrap().cell_mut(row, channel).note =
                Note::On(48 + channel);
        }
    }

    editor
        .prepare_pattern_undo(
            PatternRegion {
                pattern: id,
                first_channel: 1,
                first_row: 2,
                num_channels: 4,
                num_rows: 8,
            },
            "Clear Selection",
            false,
            false,
        )
        .unwrap();
    {
        let pattern = editor.module_mut().pattern_mut(id).unwrap();
        for row in 2..10 {
            for channel in 1..5 {
                *pattern.cell_mut(row, channel) = Default::default();
            }
        }
        pattern.resize(6);
    }

    assert_eq!(editor.undo_pattern(), Some(id));
    let pattern = editor.module().pattern(id).unwrap();
    assert_eq!(pattern.rows, 16);
    for row in 2..10 {
        for channel in 1..5u8 {
            assert_eq!(pattern.cell(row, channel).note, Note::On(48 + channel));
        }
    }
}

#[test]
fn linked_pattern_edits_undo_as_one_action() {
    let mut editor = Editor::new();
    let p0 = editor.module_mut().push_pattern(8);
    let p1 = editor.module_mut().push_pattern(8);

    editor
        .prepare_pattern_undo(PatternRegion::whole(p0), "Find & Replace", false, false)
        .unwrap();
    editor.module_mut().pattern_mut(p0).unwrap().cell_mut(0, 0).note = Note::On(60);
    editor
        .prepare_pattern_undo(PatternRegion::whole(p1), "Find & Replace", true, false)
        .unwrap();
    editor.module_mut().pattern_mut(p1).unwrap().cell_mut(0, 0).note = Note::On(62);

    assert_eq!(editor.patterns().undo_name(), "Find & Replace (Multiple Patterns)");
    assert!(editor.undo_pattern().is_some());
    assert_eq!(
        editor.module().pattern(p0).unwrap().cell(0, 0).note,
        Note::None
    );
    assert_eq!(
        editor.module().pattern(p1).unwrap().cell(0, 0).note,
        Note::None
    );
    assert!(!editor.patterns().can_undo());

    assert!(editor.redo_pattern().is_some());
    assert_eq!(
        editor.module().pattern(p0).unwrap().cell(0, 0).note,
        Note::On(60)
    );
    assert_eq!(
        editor.module().pattern(p1).unwrap().cell(0, 0).note,
        Note::On(62)
    );
}

// --- Mixed sessions ---

#[test]
fn independent_histories_do_not_interfere() {
    let mut editor = editor_with_sample(64);
    let pattern = editor.module_mut().push_pattern(8);
    editor.module_mut().push_instrument(Instrument::new("piano"));

    editor
        .prepare_pattern_undo(PatternRegion::whole(pattern), "Note Entry", false, false)
        .unwrap();
    editor.module_mut().pattern_mut(pattern).unwrap().cell_mut(3, 0).note = Note::On(60);

    editor
        .prepare_sample_undo(1, SampleChange::Invert, "Invert", 0, 64)
        .unwrap();
    editor.module_mut().sample_mut(1).unwrap().invert(0, 64);

    editor
        .prepare_instrument_undo(1, InstrumentTarget::Whole, "Set Fadeout")
        .unwrap();
    editor.module_mut().instrument_mut(1).unwrap().fadeout = 128;

    // Undoing the sample edit leaves the other documents' edits alone.
    assert!(editor.undo_sample(1));
    assert_eq!(
        editor.module().pattern(pattern).unwrap().cell(3, 0).note,
        Note::On(60)
    );
    assert_eq!(editor.module().instrument(1).unwrap().fadeout, 128);
    assert!(editor.patterns().can_undo());
    assert!(editor.instruments().can_undo(1));

    assert!(editor.undo_instrument(1));
    assert_eq!(editor.module().instrument(1).unwrap().fadeout, 0);
    assert!(editor.undo_pattern().is_some());
    assert_eq!(
        editor.module().pattern(pattern).unwrap().cell(3, 0).note,
        Note::None
    );
}

#[test]
fn new_edit_after_undo_discards_redo() {
    let mut editor = editor_with_sample(32);

    editor
        .prepare_sample_undo(1, SampleChange::Update, "First", 0, 8)
        .unwrap();
    editor.module_mut().sample_mut(1).unwrap().data[0] = 0xAA;
    assert!(editor.undo_sample(1));
    assert!(editor.samples().can_redo(1));

    editor
        .prepare_sample_undo(1, SampleChange::Update, "Second", 0, 8)
        .unwrap();
    assert!(!editor.samples().can_redo(1));
    assert_eq!(editor.samples().undo_name(1), "Second");
}
