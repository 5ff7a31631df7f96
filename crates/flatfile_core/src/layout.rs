// layout.rs: ordered column names with a name -> position index
use std::collections::HashMap;

/// Ordered column names plus the position of each name.
///
/// Names may repeat; the index is built by iterating and overwriting, so a
/// repeated name resolves to its last position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

fn build_index(columns: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(columns.len());
    for (i, name) in columns.iter().enumerate() {
        index.insert(name.clone(), i);
    }
    index
}

impl ColumnLayout {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let index = build_index(&columns);
        Self { columns, index }
    }

    /// Bind a column list and an index map that were built separately.
    pub fn from_parts(columns: Vec<String>, index: HashMap<String, usize>) -> Self {
        Self { columns, index }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index_map(&self) -> &HashMap<String, usize> {
        &self.index
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Replace the column list. The index map is left as is.
    pub fn set_columns(&mut self, columns: Vec<String>) {
        self.columns = columns;
    }

    pub fn set_index_map(&mut self, index: HashMap<String, usize>) {
        self.index = index;
    }
}
