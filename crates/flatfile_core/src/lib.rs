// flatfile_core: pure Rust library for delimited flat-file tokenization and record-layout column lookup.
pub mod error;
pub mod layout;
pub mod metadata;
pub mod parser;
pub mod schema;
pub mod tokenizer;

pub use error::LayoutError;
pub use layout::ColumnLayout;
pub use metadata::{
    is_reserved_key, RecordIndicator, RecordLayout, RecordMetadata, COLUMN_INDEX_KEY, DEFAULT_RECORD_KEY,
};
pub use parser::{parse_line, ParsedLine};
pub use schema::{
    ensure_layout_loaded, layout_from_json, load_layout_internal, LayoutDefinition, LoadedLayout, LAYOUT_CACHE,
};
pub use tokenizer::{extract_field, fields, split_line, Dialect, Fields};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_then_lookup() {
        let md = RecordMetadata::from_header("id,name,amount", &Dialect::csv());
        let fields = split_line(Some("1, \"Doe, Jane\" ,3.50"), ',', Some('"'));
        let idx = md.column_index(None, "name").expect("default layout").expect("known column");
        assert_eq!(fields[idx].as_deref(), Some("Doe, Jane"));
    }
}
