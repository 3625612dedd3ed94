//! Document model for the backtrack editing core.
//!
//! This crate defines the in-memory representation of an editable module:
//! patterns of note events, sampled audio, instruments with envelope
//! curves, and per-channel settings. The history engines in `bt-history`
//! snapshot and restore this state through the accessors defined here.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod instrument;
mod module;
mod pattern;
mod sample;

pub use instrument::{Envelope, EnvelopeKind, EnvelopePoint, Instrument, NewNoteAction};
pub use module::{ChannelSettings, InstrumentId, Module, PatternId, SampleId};
pub use pattern::{Cell, Note, Pattern};
pub use sample::{LoopType, Sample, SampleDepth, SampleFormat, SampleHeader};
