//! Table formatting.

use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table as ComfyTable, presets};

/// Two-column key/value table used by `show`.
pub struct Table {
    inner: ComfyTable,
    colors_enabled: bool,
}

impl Table {
    /// Borderless table sized to the terminal.
    pub fn new() -> Self {
        let colors_enabled = crate::output::colors_enabled();
        let mut inner = ComfyTable::new();
        inner.load_preset(presets::NOTHING);
        inner.set_content_arrangement(ContentArrangement::Dynamic);
        Self {
            inner,
            colors_enabled,
        }
    }

    /// Add a labelled row.
    pub fn field(&mut self, label: &str, value: impl std::fmt::Display) -> &mut Self {
        let mut label = Cell::new(label);
        if self.colors_enabled {
            label = label.fg(Color::Green).add_attribute(Attribute::Bold);
        }
        self.inner.add_row(vec![label, Cell::new(value)]);
        self
    }

    /// Add a labelled row whose value is dimmed.
    pub fn dim_field(&mut self, label: &str, value: impl std::fmt::Display) -> &mut Self {
        let mut value = Cell::new(value);
        if self.colors_enabled {
            value = value.fg(Color::DarkGrey);
        }
        let mut label = Cell::new(label);
        if self.colors_enabled {
            label = label.fg(Color::Green).add_attribute(Attribute::Bold);
        }
        self.inner.add_row(vec![label, value]);
        self
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.inner.row_count()
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}
