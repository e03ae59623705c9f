use crate::messaging::types::ReplyKeyboard;

/// Default button grid: row-major labels with the byte each one sends.
const DEFAULT_GRID: [[(&str, u8); 2]; 2] = [
    [("Big Off", b'a'), ("Small Off", b'A')],
    [("Big On", b'b'), ("Small On", b'B')],
];

/// Immutable mapping between button labels and device command bytes.
///
/// The lookup table is derived from the keyboard grid, so every button the
/// user can press has exactly one byte and vice versa.
#[derive(Clone, Debug)]
pub struct CommandTable {
    entries: Vec<(String, u8)>,
    keyboard: ReplyKeyboard,
}

impl CommandTable {
    pub fn from_grid<L: Into<String>>(grid: Vec<Vec<(L, u8)>>) -> Self {
        let mut entries = Vec::new();
        let mut rows = Vec::with_capacity(grid.len());
        for row in grid {
            let mut labels = Vec::with_capacity(row.len());
            for (label, byte) in row {
                let label = label.into();
                entries.push((label.clone(), byte));
                labels.push(label);
            }
            rows.push(labels);
        }

        Self {
            entries,
            keyboard: ReplyKeyboard::new(rows),
        }
    }

    pub fn lookup(&self, text: &str) -> Option<u8> {
        self.entries
            .iter()
            .find(|(label, _)| label == text)
            .map(|(_, byte)| *byte)
    }

    pub fn label_for(&self, byte: u8) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, b)| *b == byte)
            .map(|(label, _)| label.as_str())
    }

    pub fn keyboard(&self) -> &ReplyKeyboard {
        &self.keyboard
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::from_grid(DEFAULT_GRID.iter().map(|row| row.to_vec()).collect())
    }
}
