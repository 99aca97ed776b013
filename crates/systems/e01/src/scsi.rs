//! Hard disk port: a bare SCSI bus driven by the CPU.
//!
//! There is no controller chip. The CPU moves bytes through a data latch and
//! the board generates the handshake: every data access pulls ACK low, and
//! the target releasing REQ lets ACK go high again. The HDC interrupt is REQ
//! asserted.
//!
//! All levels here are electrical: the SCSI control lines are active low, so
//! `true` means released.

use emu_core::lines::Disconnected;
use serde::{Deserialize, Serialize};

/// Status register at 0xFC31. Each bit is set while its line is asserted.
pub const STATUS_MSG: u8 = 0x01;
pub const STATUS_BSY: u8 = 0x02;
pub const STATUS_REQ: u8 = 0x20;
pub const STATUS_IO: u8 = 0x40;
pub const STATUS_CD: u8 = 0x80;

/// The target side of the bus.
pub trait ScsiBus {
    /// Byte the target is driving on the data lines.
    fn data(&mut self) -> u8;
    fn set_data(&mut self, data: u8);

    fn set_ack(&mut self, level: bool);
    fn set_sel(&mut self, level: bool);

    fn msg(&self) -> bool;
    fn bsy(&self) -> bool;
    fn req(&self) -> bool;
    fn io(&self) -> bool;
    fn cd(&self) -> bool;
}

/// Terminated bus with no target: every line floats high.
impl ScsiBus for Disconnected {
    fn data(&mut self) -> u8 {
        0xFF
    }

    fn set_data(&mut self, _data: u8) {}
    fn set_ack(&mut self, _level: bool) {}
    fn set_sel(&mut self, _level: bool) {}

    fn msg(&self) -> bool {
        true
    }

    fn bsy(&self) -> bool {
        true
    }

    fn req(&self) -> bool {
        true
    }

    fn io(&self) -> bool {
        true
    }

    fn cd(&self) -> bool {
        true
    }
}

/// Target lines as last seen by the board, for edge detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScsiLines {
    pub bsy: bool,
    pub req: bool,
}

impl Default for ScsiLines {
    fn default() -> Self {
        Self {
            bsy: true,
            req: true,
        }
    }
}

/// Edges found by [`ScsiLines::sync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScsiEdges {
    /// New REQ level, if it changed.
    pub req: Option<bool>,
    pub bsy_fell: bool,
}

impl ScsiLines {
    /// Compare against the target's current lines and record them.
    pub fn sync(&mut self, bus: &dyn ScsiBus) -> ScsiEdges {
        let mut edges = ScsiEdges::default();
        let (bsy, req) = (bus.bsy(), bus.req());
        if bsy != self.bsy {
            self.bsy = bsy;
            edges.bsy_fell = !bsy;
        }
        if req != self.req {
            self.req = req;
            edges.req = Some(req);
        }
        edges
    }
}

/// Status register value for the target's current lines.
pub fn status(bus: &dyn ScsiBus) -> u8 {
    let mut data = 0;
    if !bus.msg() {
        data |= STATUS_MSG;
    }
    if !bus.bsy() {
        data |= STATUS_BSY;
    }
    if !bus.req() {
        data |= STATUS_REQ;
    }
    if !bus.io() {
        data |= STATUS_IO;
    }
    if !bus.cd() {
        data |= STATUS_CD;
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Lines {
        bsy: bool,
        req: bool,
        io: bool,
    }

    impl ScsiBus for Lines {
        fn data(&mut self) -> u8 {
            0
        }
        fn set_data(&mut self, _data: u8) {}
        fn set_ack(&mut self, _level: bool) {}
        fn set_sel(&mut self, _level: bool) {}
        fn msg(&self) -> bool {
            true
        }
        fn bsy(&self) -> bool {
            self.bsy
        }
        fn req(&self) -> bool {
            self.req
        }
        fn io(&self) -> bool {
            self.io
        }
        fn cd(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_status_bits_are_inverted_lines() {
        assert_eq!(status(&Disconnected), 0x00);
        let lines = Lines {
            bsy: false,
            req: false,
            io: false,
        };
        assert_eq!(status(&lines), STATUS_BSY | STATUS_REQ | STATUS_IO);
    }

    #[test]
    fn test_sync_reports_edges_once() {
        let mut seen = ScsiLines::default();
        let mut lines = Lines {
            bsy: false,
            req: true,
            io: true,
        };
        let edges = seen.sync(&lines);
        assert!(edges.bsy_fell);
        assert_eq!(edges.req, None);
        assert_eq!(seen.sync(&lines), ScsiEdges::default());

        lines.req = false;
        assert_eq!(seen.sync(&lines).req, Some(false));
    }
}
