// parser.rs: map a delimited line to column name -> value using record layouts
use indexmap::IndexMap;

use crate::error::Result;
use crate::metadata::RecordMetadata;
use crate::tokenizer::Dialect;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// Named layout the line was routed to; `None` for the default layout.
    pub record_key: Option<String>,
    pub values: IndexMap<String, Option<String>>,
}

impl ParsedLine {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).and_then(|v| v.as_deref())
    }
}

pub fn parse_line(line: &str, dialect: &Dialect, metadata: &RecordMetadata) -> Result<ParsedLine> {
    let fields = dialect.split(line);
    let record_key = metadata.record_key_for(&fields).map(str::to_string);
    let layout = metadata.layout_for(record_key.as_deref())?;
    if fields.len() < layout.len() {
        tracing::debug!(
            record_key = record_key.as_deref().unwrap_or("<default>"),
            expected = layout.len(),
            found = fields.len(),
            "line has fewer fields than its layout"
        );
    }
    // a repeated name keeps its last position
    let mut values: IndexMap<String, Option<String>> = IndexMap::with_capacity(layout.len());
    for name in layout.columns() {
        let v = layout
            .column_index(name)
            .and_then(|i| fields.get(i))
            .and_then(|f| f.clone());
        values.insert(name.clone(), v);
    }
    Ok(ParsedLine { record_key, values })
}
