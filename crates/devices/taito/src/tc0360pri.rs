//! TC0360PRI priority mixer: sixteen byte registers.
//!
//! The mixing itself happens in the board's compositor. Registers 4-9 hold
//! two 4-bit priorities each (tile layers and sprite color groups), read
//! through [`Tc0360pri::nibble`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tc0360pri {
    regs: [u8; 16],
}

impl Tc0360pri {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, offset: u32) -> u8 {
        self.regs[offset as usize & 0x0F]
    }

    pub fn write(&mut self, offset: u32, data: u8) {
        self.regs[offset as usize & 0x0F] = data;
    }

    pub fn reg(&self, index: usize) -> u8 {
        self.regs[index & 0x0F]
    }

    /// Priority `index` of 32: the low nibble of register `index / 2` for
    /// even indices, the high nibble for odd ones.
    pub fn nibble(&self, index: usize) -> u8 {
        let reg = self.reg(index / 2);
        if index % 2 == 0 {
            reg & 0x0F
        } else {
            reg >> 4
        }
    }
}
