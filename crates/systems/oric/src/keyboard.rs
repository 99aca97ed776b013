//! 8x8 key matrix.
//!
//! VIA port B bits 0-2 pick a row, the PSG's port A selects the columns to
//! sense (a 0 bit selects the column) and the result comes back on PB3.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    rows: [u8; 8],
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key(&mut self, row: usize, column: usize, pressed: bool) {
        let bit = 1 << (column & 7);
        if pressed {
            self.rows[row & 7] |= bit;
        } else {
            self.rows[row & 7] &= !bit;
        }
    }

    pub fn release_all(&mut self) {
        self.rows = [0; 8];
    }

    /// Pressed keys of `row`, one bit per column.
    pub fn row(&self, row: usize) -> u8 {
        self.rows[row & 7]
    }

    /// True when a key is down in `row` on a column whose mask bit is 0.
    pub fn sense(&self, row: usize, column_mask: u8) -> bool {
        self.rows[row & 7] & !column_mask != 0
    }
}
