use super::{BufferView, MemoryError};

/// Handle to a [`BankSlot`] owned by an address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SlotId(pub(crate) usize);

/// A named slot holding candidate buffer views, one of which is visible.
///
/// Windows bound to a slot always resolve through the currently selected
/// entry, so switching an entry is immediately visible to every window that
/// references the slot.
#[derive(Debug, Clone)]
pub struct BankSlot {
    name: String,
    entries: Vec<Option<BufferView>>,
    current: Option<usize>,
}

impl BankSlot {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
            current: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Define (or redefine) entry `entry`.
    pub fn configure(&mut self, entry: usize, view: BufferView) {
        if self.entries.len() <= entry {
            self.entries.resize(entry + 1, None);
        }
        self.entries[entry] = Some(view);
    }

    pub fn entry(&self, entry: usize) -> Option<BufferView> {
        self.entries.get(entry).copied().flatten()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Make `entry` the visible one.
    pub fn select(&mut self, entry: usize) -> Result<(), MemoryError> {
        if self.entry(entry).is_none() {
            return Err(MemoryError::UndefinedEntry {
                slot: self.name.clone(),
                entry,
            });
        }
        self.current = Some(entry);
        Ok(())
    }

    /// Index of the selected entry, `None` before the first selection.
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn current_view(&self) -> Option<BufferView> {
        self.current.and_then(|entry| self.entry(entry))
    }
}
