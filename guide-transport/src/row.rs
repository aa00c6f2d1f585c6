//! Flat result rows returned by browse and device-list queries

/// One result row: an ordered list of named column values.
///
/// Rows preserve the order columns were produced in and tolerate absent
/// columns; a missing column reads as `None`, never as an error. Lookups are
/// linear, which is the right trade for the row widths seen here (a dozen
/// columns at most).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<(String, String)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column value. A repeated name shadows nothing: the first
    /// occurrence wins on lookup, matching cursor semantics.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.columns.push((name.into(), value.into()));
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up a column by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of columns present.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when the row carries no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate over `(name, value)` pairs in production order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}
