//! Pattern and cell types for the note event grid.

use alloc::vec::Vec;

/// A note value in a pattern cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Note {
    /// No note
    #[default]
    None,
    /// Note on with MIDI note number (0-119, where 60 = C-4)
    On(u8),
    /// Note off / key release
    Off,
    /// Note fade
    Fade,
}

/// A single cell in a pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    /// Note value
    pub note: Note,
    /// Instrument number (0 = none)
    pub instrument: u8,
    /// Volume column value (0 = no command)
    pub volume: u8,
    /// Effect command byte (0 = none)
    pub effect: u8,
    /// Effect parameter byte
    pub param: u8,
}

impl Cell {
    /// Create an empty cell.
    pub const fn empty() -> Self {
        Self {
            note: Note::None,
            instrument: 0,
            volume: 0,
            effect: 0,
            param: 0,
        }
    }

    /// Returns true if the cell is completely empty.
    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }
}

/// A pattern containing rows of cells across channels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    /// Number of rows (typically 64, can be 1-1024)
    pub rows: u16,
    /// Number of channels
    pub channels: u8,
    /// Pattern data, stored row-major: data[row * channels + channel]
    pub data: Vec<Cell>,
}

impl Pattern {
    /// Create a new pattern with empty cells.
    pub fn new(rows: u16, channels: u8) -> Self {
        Self {
            rows,
            channels,
            data: alloc::vec![Cell::empty(); rows as usize * channels as usize],
        }
    }

    /// Get a reference to a cell.
    pub fn cell(&self, row: u16, channel: u8) -> &Cell {
        debug_assert!(row < self.rows);
        debug_assert!(channel < self.channels);
        &self.data[row as usize * self.channels as usize + channel as usize]
    }

    /// Get a mutable reference to a cell.
    pub fn cell_mut(&mut self, row: u16, channel: u8) -> &mut Cell {
        debug_assert!(row < self.rows);
        debug_assert!(channel < self.channels);
        &mut self.data[row as usize * self.channels as usize + channel as usize]
    }

    /// Iterate over all cells in a row.
    pub fn row(&self, row: u16) -> &[Cell] {
        let start = row as usize * self.channels as usize;
        &self.data[start..start + self.channels as usize]
    }

    /// Change the row count, keeping existing cells. New rows are empty.
    pub fn resize(&mut self, rows: u16) {
        self.data
            .resize(rows as usize * self.channels as usize, Cell::empty());
        self.rows = rows;
    }

    /// Rebuild the channel layout through a source mapping.
    ///
    /// The new pattern has `sources.len()` channels; `sources[i]` names the
    /// old channel whose column becomes new channel `i`, or `None` for a
    /// blank column. Row count is unchanged.
    pub fn rebuild_channels(&mut self, sources: &[Option<u8>]) {
        let new_channels = sources.len() as u8;
        let mut data = alloc::vec![Cell::empty(); self.rows as usize * sources.len()];
        for row in 0..self.rows {
            for (i, source) in sources.iter().enumerate() {
                if let Some(old) = source {
                    if *old < self.channels {
                        data[row as usize * sources.len() + i] = *self.cell(row, *old);
                    }
                }
            }
        }
        self.channels = new_channels;
        self.data = data;
    }
}
