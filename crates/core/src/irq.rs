//! Interrupt aggregation.
//!
//! Every chip that can interrupt the CPU owns a source in the machine's
//! [`InterruptAggregator`]. The aggregator ORs the levels of all enabled
//! sources routed to a CPU line and forwards changes of the combined level to
//! an [`InterruptLineSink`], synchronously, before the call that caused them
//! returns.
//!
//! Sources come in two kinds:
//!
//! - [`SourceKind::Level`]: follows the device output until told otherwise.
//! - [`SourceKind::Hold`]: once asserted stays asserted until the CPU
//!   acknowledges the line, then clears itself.
//!
//! Enable masks are applied when the lines are computed. A disabled source
//! keeps tracking its input, so re-enabling it takes effect immediately.

use serde::{Deserialize, Serialize};

use crate::logging::{log, LogCategory, LogLevel};

/// CPU interrupt inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CpuLine {
    Irq0,
    Nmi,
}

impl CpuLine {
    const COUNT: usize = 2;

    fn index(self) -> usize {
        match self {
            CpuLine::Irq0 => 0,
            CpuLine::Nmi => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    Level,
    Hold,
}

/// Handle to a source registered with an aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(usize);

/// Receives combined line changes, typically the CPU core.
pub trait InterruptLineSink {
    fn set_line(&mut self, line: CpuLine, asserted: bool);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Source {
    name: String,
    line: CpuLine,
    kind: SourceKind,
    level: bool,
    enabled: bool,
}

/// ORs interrupt sources onto CPU lines.
#[derive(Default, Serialize, Deserialize)]
pub struct InterruptAggregator {
    sources: Vec<Source>,
    lines: [bool; CpuLine::COUNT],
    #[serde(skip)]
    sink: Option<Box<dyn InterruptLineSink>>,
}

impl std::fmt::Debug for InterruptAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptAggregator")
            .field("sources", &self.sources)
            .field("lines", &self.lines)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl InterruptAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the receiver of line changes. It is told the current state at once.
    pub fn set_sink(&mut self, mut sink: Box<dyn InterruptLineSink>) {
        for line in [CpuLine::Irq0, CpuLine::Nmi] {
            sink.set_line(line, self.lines[line.index()]);
        }
        self.sink = Some(sink);
    }

    /// Register a source, enabled and deasserted.
    pub fn add_source(&mut self, name: &str, line: CpuLine, kind: SourceKind) -> SourceId {
        self.sources.push(Source {
            name: name.to_string(),
            line,
            kind,
            level: false,
            enabled: true,
        });
        SourceId(self.sources.len() - 1)
    }

    /// Record a new level for `id` and update the CPU lines.
    pub fn set_level(&mut self, id: SourceId, level: bool) {
        let source = &mut self.sources[id.0];
        if source.level == level {
            return;
        }
        source.level = level;
        log(LogCategory::Interrupts, LogLevel::Trace, || {
            format!("{} -> {}", self.sources[id.0].name, level)
        });
        self.recompute();
    }

    /// Assert a hold source until the line is acknowledged.
    pub fn pulse(&mut self, id: SourceId) {
        debug_assert_eq!(self.sources[id.0].kind, SourceKind::Hold);
        self.set_level(id, true);
    }

    /// Gate a source at aggregation time. Its stored level is kept.
    pub fn set_enabled(&mut self, id: SourceId, enabled: bool) {
        if self.sources[id.0].enabled != enabled {
            self.sources[id.0].enabled = enabled;
            self.recompute();
        }
    }

    /// CPU interrupt acknowledge: clears the hold sources routed to `line`.
    pub fn acknowledge(&mut self, line: CpuLine) {
        for source in &mut self.sources {
            if source.line == line && source.kind == SourceKind::Hold {
                source.level = false;
            }
        }
        self.recompute();
    }

    pub fn level(&self, id: SourceId) -> bool {
        self.sources[id.0].level
    }

    pub fn is_enabled(&self, id: SourceId) -> bool {
        self.sources[id.0].enabled
    }

    /// Current combined state of `line`.
    pub fn line(&self, line: CpuLine) -> bool {
        self.lines[line.index()]
    }

    /// Deassert every source and re-enable all of them.
    pub fn reset(&mut self) {
        for source in &mut self.sources {
            source.level = false;
            source.enabled = true;
        }
        self.recompute();
    }

    /// Copy source levels and enables from a saved aggregator.
    ///
    /// Sources are matched by position; extra or missing entries are ignored.
    pub fn restore(&mut self, saved: &InterruptAggregator) {
        for (source, saved) in self.sources.iter_mut().zip(&saved.sources) {
            source.level = saved.level;
            source.enabled = saved.enabled;
        }
        self.recompute();
    }

    fn recompute(&mut self) {
        let mut lines = [false; CpuLine::COUNT];
        for source in self.sources.iter().filter(|s| s.enabled && s.level) {
            lines[source.line.index()] = true;
        }

        for line in [CpuLine::Irq0, CpuLine::Nmi] {
            let asserted = lines[line.index()];
            if self.lines[line.index()] != asserted {
                self.lines[line.index()] = asserted;
                log(LogCategory::Interrupts, LogLevel::Debug, || {
                    format!("{:?} {}", line, if asserted { "asserted" } else { "cleared" })
                });
                if let Some(sink) = self.sink.as_mut() {
                    sink.set_line(line, asserted);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every call made on the CPU side.
    struct Recorder(Rc<RefCell<Vec<(CpuLine, bool)>>>);

    impl InterruptLineSink for Recorder {
        fn set_line(&mut self, line: CpuLine, asserted: bool) {
            self.0.borrow_mut().push((line, asserted));
        }
    }

    fn with_recorder() -> (InterruptAggregator, Rc<RefCell<Vec<(CpuLine, bool)>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut irq = InterruptAggregator::new();
        irq.set_sink(Box::new(Recorder(calls.clone())));
        calls.borrow_mut().clear();
        (irq, calls)
    }

    #[test]
    fn test_or_of_levels() {
        let mut irq = InterruptAggregator::new();
        let via = irq.add_source("via", CpuLine::Irq0, SourceKind::Level);
        let disk = irq.add_source("disk", CpuLine::Irq0, SourceKind::Level);

        irq.set_level(via, true);
        irq.set_level(disk, true);
        assert!(irq.line(CpuLine::Irq0));

        irq.set_level(via, false);
        assert!(irq.line(CpuLine::Irq0));

        irq.set_level(disk, false);
        assert!(!irq.line(CpuLine::Irq0));
        assert!(!irq.line(CpuLine::Nmi));
    }

    #[test]
    fn test_sink_only_sees_changes() {
        let (mut irq, calls) = with_recorder();
        let a = irq.add_source("a", CpuLine::Irq0, SourceKind::Level);
        let b = irq.add_source("b", CpuLine::Irq0, SourceKind::Level);

        irq.set_level(a, true);
        irq.set_level(b, true);
        irq.set_level(a, false);
        irq.set_level(b, false);

        assert_eq!(
            *calls.borrow(),
            vec![(CpuLine::Irq0, true), (CpuLine::Irq0, false)]
        );
    }

    #[test]
    fn test_disabled_source_keeps_level() {
        let mut irq = InterruptAggregator::new();
        let hdc = irq.add_source("hdc", CpuLine::Irq0, SourceKind::Level);
        irq.set_enabled(hdc, false);

        irq.set_level(hdc, true);
        assert!(!irq.line(CpuLine::Irq0));
        assert!(irq.level(hdc));

        // Takes effect the moment it is enabled again
        irq.set_enabled(hdc, true);
        assert!(irq.line(CpuLine::Irq0));
    }

    #[test]
    fn test_lines_are_independent() {
        let mut irq = InterruptAggregator::new();
        let via = irq.add_source("via", CpuLine::Irq0, SourceKind::Level);
        let drq = irq.add_source("fdc drq", CpuLine::Nmi, SourceKind::Level);

        irq.set_level(drq, true);
        assert!(irq.line(CpuLine::Nmi));
        assert!(!irq.line(CpuLine::Irq0));

        irq.set_level(via, true);
        irq.set_level(drq, false);
        assert!(irq.line(CpuLine::Irq0));
        assert!(!irq.line(CpuLine::Nmi));
    }

    #[test]
    fn test_hold_source_clears_on_acknowledge() {
        let (mut irq, calls) = with_recorder();
        let vbl = irq.add_source("vblank", CpuLine::Irq0, SourceKind::Hold);
        let via = irq.add_source("via", CpuLine::Irq0, SourceKind::Level);

        irq.pulse(vbl);
        irq.set_level(via, true);
        irq.acknowledge(CpuLine::Irq0);

        // The level source keeps the line up after the hold source is gone
        assert!(!irq.level(vbl));
        assert!(irq.line(CpuLine::Irq0));

        irq.set_level(via, false);
        assert!(!irq.line(CpuLine::Irq0));
        assert_eq!(
            *calls.borrow(),
            vec![(CpuLine::Irq0, true), (CpuLine::Irq0, false)]
        );
    }

    #[test]
    fn test_random_sequence_matches_or() {
        let mut irq = InterruptAggregator::new();
        let ids: Vec<_> = (0..4)
            .map(|i| irq.add_source(&format!("s{}", i), CpuLine::Irq0, SourceKind::Level))
            .collect();
        let mut levels = [false; 4];
        let mut enabled = [true; 4];

        // Simple LCG so the sequence is deterministic
        let mut seed = 0x1234_5678u32;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let which = (seed >> 16) as usize % 4;
            if seed & 0x100 != 0 {
                enabled[which] = seed & 0x200 != 0;
                irq.set_enabled(ids[which], enabled[which]);
            } else {
                levels[which] = seed & 0x400 != 0;
                irq.set_level(ids[which], levels[which]);
            }
            let expected = (0..4).any(|i| levels[i] && enabled[i]);
            assert_eq!(irq.line(CpuLine::Irq0), expected);
        }
    }

    #[test]
    fn test_restore_from_saved_state() {
        let mut irq = InterruptAggregator::new();
        let via = irq.add_source("via", CpuLine::Irq0, SourceKind::Level);
        irq.set_level(via, true);

        let json = serde_json::to_string(&irq).unwrap();
        let saved: InterruptAggregator = serde_json::from_str(&json).unwrap();

        let mut fresh = InterruptAggregator::new();
        fresh.add_source("via", CpuLine::Irq0, SourceKind::Level);
        fresh.restore(&saved);
        assert!(fresh.line(CpuLine::Irq0));
    }
}
