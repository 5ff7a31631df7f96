// metadata.rs: default and named record layouts, keyed by record type
use std::collections::HashMap;

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::error::{LayoutError, Result};
use crate::layout::ColumnLayout;
use crate::tokenizer::Dialect;

/// Record-type key that addresses the default layout.
pub const DEFAULT_RECORD_KEY: &str = "detail";
/// Record-type key reserved for the default layout's index map; never resolves a column.
pub const COLUMN_INDEX_KEY: &str = "colIndex";

static EMPTY_LAYOUT: Lazy<ColumnLayout> = Lazy::new(ColumnLayout::default);

pub fn is_reserved_key(key: &str) -> bool {
    key == DEFAULT_RECORD_KEY || key == COLUMN_INDEX_KEY
}

/// Discriminator for a named layout: a line belongs to the layout when the
/// field at the 1-based `position` equals `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordIndicator {
    pub position: usize,
    pub value: String,
}

impl RecordIndicator {
    pub fn matches(&self, fields: &[Option<String>]) -> bool {
        self.position
            .checked_sub(1)
            .and_then(|i| fields.get(i))
            .and_then(|f| f.as_deref())
            == Some(self.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    pub columns: ColumnLayout,
    pub indicator: Option<RecordIndicator>,
}

impl From<ColumnLayout> for RecordLayout {
    fn from(columns: ColumnLayout) -> Self {
        Self { columns, indicator: None }
    }
}

/// Column positions for the default record shape and any named record shapes.
///
/// Built once, then only read. The rebinding setters take `&mut self` so they
/// cannot overlap with readers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordMetadata {
    default: ColumnLayout,
    records: IndexMap<String, RecordLayout>,
}

impl RecordMetadata {
    pub fn new(default: ColumnLayout) -> Self {
        Self { default, records: IndexMap::new() }
    }

    /// Default layout from a column list and an index map built elsewhere.
    pub fn from_parts(columns: Vec<String>, index: HashMap<String, usize>) -> Self {
        Self::new(ColumnLayout::from_parts(columns, index))
    }

    /// Default layout plus named layouts, in the order given.
    pub fn with_record_layouts<I, K, L>(default: ColumnLayout, records: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, L)>,
        K: Into<String>,
        L: Into<RecordLayout>,
    {
        let mut metadata = Self::new(default);
        for (key, layout) in records {
            metadata.add_record_layout(key, layout)?;
        }
        Ok(metadata)
    }

    /// Default layout taken from a header row.
    pub fn from_header(line: &str, dialect: &Dialect) -> Self {
        let names = dialect.fields(line).map(Option::unwrap_or_default);
        Self::new(ColumnLayout::new(names))
    }

    /// Register a named layout. Reserved and repeated keys are rejected.
    pub fn add_record_layout(&mut self, key: impl Into<String>, layout: impl Into<RecordLayout>) -> Result<()> {
        let key = key.into();
        if is_reserved_key(&key) {
            return Err(LayoutError::ReservedRecordKey { key });
        }
        if self.records.contains_key(&key) {
            return Err(LayoutError::DuplicateRecordType { key });
        }
        let layout = layout.into();
        if layout.indicator.as_ref().is_some_and(|ind| ind.position == 0) {
            return Err(LayoutError::InvalidIndicator { key });
        }
        self.records.insert(key, layout);
        Ok(())
    }

    pub fn default_layout(&self) -> &ColumnLayout {
        &self.default
    }

    pub fn columns(&self) -> &[String] {
        self.default.columns()
    }

    pub fn index_map(&self) -> &HashMap<String, usize> {
        self.default.index_map()
    }

    pub fn set_columns(&mut self, columns: Vec<String>) {
        self.default.set_columns(columns);
    }

    pub fn set_index_map(&mut self, index: HashMap<String, usize>) {
        self.default.set_index_map(index);
    }

    pub fn has_named_layouts(&self) -> bool {
        !self.records.is_empty()
    }

    /// Named layouts in registration order.
    pub fn record_layouts(&self) -> impl Iterator<Item = (&str, &ColumnLayout)> + '_ {
        self.records.iter().map(|(k, r)| (k.as_str(), &r.columns))
    }

    pub fn record_layout(&self, key: &str) -> Result<&RecordLayout> {
        self.records
            .get(key)
            .ok_or_else(|| LayoutError::UnknownRecordType { key: key.to_string() })
    }

    pub fn columns_for_record(&self, key: &str) -> Result<&[String]> {
        Ok(self.record_layout(key)?.columns.columns())
    }

    /// Position of `column` within the layout selected by `record_key`.
    ///
    /// `None` and [`DEFAULT_RECORD_KEY`] select the default layout. An unknown
    /// column is `Ok(None)`; an unknown record type is an error.
    pub fn column_index(&self, record_key: Option<&str>, column: &str) -> Result<Option<usize>> {
        match record_key {
            None | Some(DEFAULT_RECORD_KEY) => Ok(self.default.column_index(column)),
            Some(COLUMN_INDEX_KEY) => Ok(None),
            Some(key) => Ok(self.record_layout(key)?.columns.column_index(column)),
        }
    }

    /// Layout columns that apply to `record_key`, with the same routing as [`Self::column_index`].
    pub fn layout_for(&self, record_key: Option<&str>) -> Result<&ColumnLayout> {
        match record_key {
            None | Some(DEFAULT_RECORD_KEY) => Ok(&self.default),
            Some(COLUMN_INDEX_KEY) => Ok(&EMPTY_LAYOUT),
            Some(key) => Ok(&self.record_layout(key)?.columns),
        }
    }

    /// Key of the first named layout whose indicator matches the split line.
    pub fn record_key_for(&self, fields: &[Option<String>]) -> Option<&str> {
        self.records
            .iter()
            .find(|(_, r)| r.indicator.as_ref().is_some_and(|ind| ind.matches(fields)))
            .map(|(k, _)| k.as_str())
    }

    /// Value of `column` in a line already split with the matching dialect.
    pub fn value<'f>(
        &self,
        record_key: Option<&str>,
        column: &str,
        fields: &'f [Option<String>],
    ) -> Result<Option<&'f str>> {
        let idx = self.column_index(record_key, column)?;
        Ok(idx.and_then(|i| fields.get(i)).and_then(|f| f.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::split_line;

    fn header_detail_trailer() -> RecordMetadata {
        let mut md = RecordMetadata::new(ColumnLayout::new(["id", "name", "amount"]));
        md.add_record_layout(
            "header",
            RecordLayout {
                columns: ColumnLayout::new(["type", "file_date"]),
                indicator: Some(RecordIndicator { position: 1, value: "H".into() }),
            },
        )
        .expect("header");
        md.add_record_layout(
            "trailer",
            RecordLayout {
                columns: ColumnLayout::new(["type", "count"]),
                indicator: Some(RecordIndicator { position: 1, value: "T".into() }),
            },
        )
        .expect("trailer");
        md
    }

    #[test]
    fn test_default_layout_lookup() {
        let md = header_detail_trailer();
        assert_eq!(md.column_index(None, "name").unwrap(), Some(1));
        assert_eq!(md.column_index(Some(DEFAULT_RECORD_KEY), "amount").unwrap(), Some(2));
        assert_eq!(md.column_index(None, "nope").unwrap(), None);
        assert_eq!(md.column_index(Some(COLUMN_INDEX_KEY), "name").unwrap(), None);
    }

    #[test]
    fn test_named_layout_lookup_is_independent() {
        let md = header_detail_trailer();
        assert_eq!(md.column_index(Some("header"), "file_date").unwrap(), Some(1));
        assert_eq!(md.column_index(Some("trailer"), "count").unwrap(), Some(1));
        // "name" only exists in the default layout
        assert_eq!(md.column_index(Some("header"), "name").unwrap(), None);
        assert_eq!(md.columns_for_record("trailer").unwrap(), ["type", "count"]);
    }

    #[test]
    fn test_unknown_record_type_is_an_error() {
        let md = header_detail_trailer();
        let err = md.column_index(Some("footer"), "type").unwrap_err();
        assert!(matches!(err, LayoutError::UnknownRecordType { ref key } if key == "footer"));
        assert!(md.columns_for_record("footer").is_err());

        let flat = RecordMetadata::new(ColumnLayout::new(["a"]));
        assert!(flat.column_index(Some("a"), "a").is_err());
    }

    #[test]
    fn test_named_layout_iteration_order() {
        let md = header_detail_trailer();
        assert!(md.has_named_layouts());
        let keys: Vec<&str> = md.record_layouts().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["header", "trailer"]);
        // each call starts a fresh pass
        assert_eq!(md.record_layouts().count(), 2);
        assert!(!RecordMetadata::default().has_named_layouts());
    }

    #[test]
    fn test_reserved_and_duplicate_keys_rejected() {
        let mut md = RecordMetadata::default();
        for key in [DEFAULT_RECORD_KEY, COLUMN_INDEX_KEY] {
            let err = md.add_record_layout(key, ColumnLayout::new(["x"])).unwrap_err();
            assert!(matches!(err, LayoutError::ReservedRecordKey { .. }));
        }
        md.add_record_layout("a", ColumnLayout::new(["x"])).unwrap();
        let err = md.add_record_layout("a", ColumnLayout::new(["y"])).unwrap_err();
        assert!(matches!(err, LayoutError::DuplicateRecordType { .. }));
    }

    #[test]
    fn test_indicator_position_zero_rejected() {
        let err = RecordMetadata::with_record_layouts(
            ColumnLayout::default(),
            [("bad", RecordLayout {
                columns: ColumnLayout::new(["x"]),
                indicator: Some(RecordIndicator { position: 0, value: "B".into() }),
            })],
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::InvalidIndicator { .. }));
    }

    #[test]
    fn test_from_parts_equivalent_to_derived() {
        let names = vec!["id".to_string(), "name".to_string()];
        let index = HashMap::from([("id".to_string(), 0), ("name".to_string(), 1)]);
        let md = RecordMetadata::from_parts(names, index);
        assert_eq!(md, RecordMetadata::new(ColumnLayout::new(["id", "name"])));
        assert_eq!(md.column_index(None, "name").unwrap(), Some(1));
    }

    #[test]
    fn test_setters_rebind_default_layout() {
        let mut md = RecordMetadata::new(ColumnLayout::new(["a"]));
        md.set_columns(vec!["b".to_string()]);
        md.set_index_map(HashMap::from([("b".to_string(), 0)]));
        assert_eq!(md.columns(), ["b"]);
        assert_eq!(md.index_map().len(), 1);
        assert_eq!(md.column_index(None, "b").unwrap(), Some(0));
        assert_eq!(md.column_index(None, "a").unwrap(), None);
    }

    #[test]
    fn test_record_key_routing_and_values() {
        let md = header_detail_trailer();
        let header = split_line(Some("H,2024-01-31"), ',', Some('"'));
        let detail = split_line(Some("7,\"Smith, J\",12.50"), ',', Some('"'));
        let trailer = split_line(Some("T,1"), ',', Some('"'));

        assert_eq!(md.record_key_for(&header), Some("header"));
        assert_eq!(md.record_key_for(&detail), None);
        assert_eq!(md.record_key_for(&trailer), Some("trailer"));

        assert_eq!(md.value(Some("header"), "file_date", &header).unwrap(), Some("2024-01-31"));
        assert_eq!(md.value(None, "name", &detail).unwrap(), Some("Smith, J"));
        assert_eq!(md.value(Some("trailer"), "count", &trailer).unwrap(), Some("1"));
        assert_eq!(md.value(None, "missing", &detail).unwrap(), None);
        assert!(md.value(Some("footer"), "x", &detail).is_err());
    }

    #[test]
    fn test_from_header_row() {
        let md = RecordMetadata::from_header("\"id\", name ,,amount", &Dialect::csv());
        assert_eq!(md.columns(), ["id", "name", "", "amount"]);
        assert_eq!(md.column_index(None, "amount").unwrap(), Some(3));
    }

    #[test]
    fn test_layout_for_routes_like_column_index() {
        let md = header_detail_trailer();
        assert_eq!(md.layout_for(None).unwrap().len(), 3);
        assert_eq!(md.layout_for(Some("header")).unwrap().columns(), ["type", "file_date"]);
        assert!(md.layout_for(Some("nope")).is_err());
    }

    #[test]
    fn test_index_map_key_resolves_no_columns_either_way() {
        let md = header_detail_trailer();
        let layout = md.layout_for(Some(COLUMN_INDEX_KEY)).unwrap();
        assert!(layout.is_empty());
        for name in md.columns() {
            assert_eq!(layout.column_index(name), None);
            assert_eq!(md.column_index(Some(COLUMN_INDEX_KEY), name).unwrap(), None);
        }
    }
}
