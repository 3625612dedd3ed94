//! Sample data types.
//!
//! Sample audio is stored as raw interleaved little-endian bytes next to a
//! plain copyable header. Editing operations address the data in frames;
//! `SampleFormat::bytes_per_frame` converts to byte offsets. The invariant
//! `data.len() == header.length * bytes_per_frame` holds between edits.

use alloc::vec::Vec;
use arrayvec::ArrayString;

/// Bit depth of a single sample value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SampleDepth {
    /// Signed 8-bit
    #[default]
    I8,
    /// Signed 16-bit little-endian
    I16,
}

/// Storage format of a sample's audio data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SampleFormat {
    /// Bit depth per value
    pub depth: SampleDepth,
    /// Interleaved stereo if true, mono otherwise
    pub stereo: bool,
}

impl SampleFormat {
    /// Bytes per sample value.
    pub fn bytes_per_value(self) -> usize {
        match self.depth {
            SampleDepth::I8 => 1,
            SampleDepth::I16 => 2,
        }
    }

    /// Bytes per frame (all channels of one sampling instant).
    pub fn bytes_per_frame(self) -> usize {
        self.bytes_per_value() * if self.stereo { 2 } else { 1 }
    }
}

/// Sample loop type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopType {
    /// No loop
    #[default]
    None,
    /// Forward loop
    Forward,
    /// Ping-pong (bidirectional) loop
    PingPong,
    /// Sustain loop (release on note-off)
    Sustain,
}

/// A sample header: everything about a sample except its audio data.
///
/// Kept separate from [`Sample`] because history snapshots store a full
/// pre-mutation copy of the header alongside a partial copy of the data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleHeader {
    /// Sample name
    pub name: ArrayString<26>,
    /// Length in frames
    pub length: u32,
    /// Storage format
    pub format: SampleFormat,
    /// Loop start position (in frames)
    pub loop_start: u32,
    /// Loop end position (in frames)
    pub loop_end: u32,
    /// Loop type
    pub loop_type: LoopType,
    /// Default volume (0-64)
    pub default_volume: u8,
    /// Default panning (-64 to +64, 0 = center)
    pub default_pan: i8,
    /// Frequency of C-4 in Hz (typically 8363)
    pub c4_speed: u32,
    /// Sample has been edited since loading
    pub modified: bool,
    /// Sample data is kept externally (referenced on disk, not embedded)
    pub external: bool,
}

impl Default for SampleHeader {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            length: 0,
            format: SampleFormat::default(),
            loop_start: 0,
            loop_end: 0,
            loop_type: LoopType::None,
            default_volume: 64,
            default_pan: 0,
            c4_speed: 8363,
            modified: false,
            external: false,
        }
    }
}

/// A sample: header plus raw audio bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sample {
    /// Sample header
    pub header: SampleHeader,
    /// Raw interleaved audio data
    pub data: Vec<u8>,
}

impl Sample {
    /// Create a new empty sample.
    pub fn new(name: &str) -> Self {
        let mut sample = Self::default();
        let _ = sample.header.name.try_push_str(name);
        sample
    }

    /// Create a sample with `frames` zeroed frames of the given format.
    pub fn with_frames(name: &str, frames: u32, format: SampleFormat) -> Self {
        let mut sample = Self::new(name);
        sample.header.length = frames;
        sample.header.format = format;
        sample.data = alloc::vec![0; frames as usize * format.bytes_per_frame()];
        sample
    }

    /// Returns true if the sample has audio data.
    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    /// Bytes per frame of the current format.
    pub fn bytes_per_frame(&self) -> usize {
        self.header.format.bytes_per_frame()
    }

    /// Byte range covering frames `[start, end)`, clamped to the data.
    pub fn byte_range(&self, start: u32, end: u32) -> core::ops::Range<usize> {
        let bpf = self.bytes_per_frame();
        let lo = (start as usize * bpf).min(self.data.len());
        let hi = (end as usize * bpf).min(self.data.len());
        lo..hi.max(lo)
    }

    /// Invert the phase of frames `[start, end)` (wrapping negation of each
    /// sample value). Self-inverse.
    pub fn invert(&mut self, start: u32, end: u32) {
        let range = self.byte_range(start, end);
        match self.header.format.depth {
            SampleDepth::I8 => {
                for b in &mut self.data[range] {
                    *b = (*b as i8).wrapping_neg() as u8;
                }
            }
            SampleDepth::I16 => {
                for pair in self.data[range].chunks_exact_mut(2) {
                    let v = i16::from_le_bytes([pair[0], pair[1]]).wrapping_neg();
                    pair.copy_from_slice(&v.to_le_bytes());
                }
            }
        }
    }

    /// Reverse the frame order of frames `[start, end)`. Self-inverse.
    pub fn reverse(&mut self, start: u32, end: u32) {
        let bpf = self.bytes_per_frame();
        let range = self.byte_range(start, end);
        let slice = &mut self.data[range];
        let frames = slice.len() / bpf;
        for i in 0..frames / 2 {
            let j = frames - 1 - i;
            for k in 0..bpf {
                slice.swap(i * bpf + k, j * bpf + k);
            }
        }
    }

    /// Toggle the signedness of frames `[start, end)` by flipping the sign
    /// bit of each sample value. Self-inverse.
    pub fn unsign(&mut self, start: u32, end: u32) {
        let range = self.byte_range(start, end);
        match self.header.format.depth {
            SampleDepth::I8 => {
                for b in &mut self.data[range] {
                    *b ^= 0x80;
                }
            }
            SampleDepth::I16 => {
                // Sign bit lives in the high byte of each LE pair.
                for pair in self.data[range].chunks_exact_mut(2) {
                    pair[1] ^= 0x80;
                }
            }
        }
    }
}
