// schema.rs: layout definition types and cache/loader
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use crate::error::{LayoutError, Result};
use crate::layout::ColumnLayout;
use crate::metadata::{RecordIndicator, RecordLayout, RecordMetadata};
use crate::tokenizer::Dialect;

pub const SUPPORTED_VERSION: u32 = 1;

/// On-disk description of a file's dialect and record layouts.
#[derive(Deserialize)]
pub struct LayoutDefinition {
    pub version: Option<u32>,
    #[serde(flatten)]
    pub dialect: Dialect,
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub records: Vec<RecordDef>,
}

#[derive(Deserialize)]
pub struct RecordDef {
    pub id: String,
    pub indicator: Option<String>,
    /// 1-based column holding the indicator.
    pub position: Option<usize>,
    pub columns: Vec<ColumnDef>,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub enum ColumnDef { Name(String), Obj { name: String } }

impl ColumnDef {
    fn into_name(self) -> String {
        match self { ColumnDef::Name(s) => s, ColumnDef::Obj { name } => name }
    }
}

fn column_layout(defs: Vec<ColumnDef>) -> ColumnLayout {
    ColumnLayout::new(defs.into_iter().map(ColumnDef::into_name))
}

impl LayoutDefinition {
    pub fn into_metadata(self) -> Result<RecordMetadata> {
        if let Some(v) = self.version {
            if v != SUPPORTED_VERSION {
                return Err(LayoutError::UnsupportedVersion { version: v });
            }
        }
        let mut metadata = RecordMetadata::new(column_layout(self.columns));
        for rec in self.records {
            let indicator = match (rec.indicator, rec.position) {
                (Some(value), Some(position)) => Some(RecordIndicator { position, value }),
                (Some(_), None) => return Err(LayoutError::InvalidIndicator { key: rec.id }),
                (None, _) => None,
            };
            let layout = RecordLayout { columns: column_layout(rec.columns), indicator };
            metadata.add_record_layout(rec.id, layout)?;
        }
        Ok(metadata)
    }
}

pub struct LoadedLayout {
    pub path: String,
    pub mtime: Option<SystemTime>,
    pub dialect: Dialect,
    pub metadata: RecordMetadata,
}

pub static LAYOUT_CACHE: Lazy<RwLock<Option<LoadedLayout>>> = Lazy::new(|| RwLock::new(None));

fn read_mtime(path: &Path) -> Option<SystemTime> { fs::metadata(path).ok().and_then(|m| m.modified().ok()) }

/// Parse a layout definition held in memory. The result has no backing file.
pub fn layout_from_json(json: &str) -> Result<LoadedLayout> {
    let def: LayoutDefinition = serde_json::from_str(json)?;
    let dialect = def.dialect;
    let metadata = def.into_metadata()?;
    Ok(LoadedLayout { path: String::new(), mtime: None, dialect, metadata })
}

pub fn load_layout_internal(layout_path: &str) -> Result<LoadedLayout> {
    let data = fs::read_to_string(layout_path)
        .map_err(|source| LayoutError::LayoutRead { path: PathBuf::from(layout_path), source })?;
    let mut loaded = layout_from_json(&data)?;
    loaded.path = layout_path.to_string();
    loaded.mtime = read_mtime(Path::new(layout_path));
    tracing::debug!(
        path = layout_path,
        columns = loaded.metadata.columns().len(),
        record_types = loaded.metadata.record_layouts().count(),
        "loaded layout definition"
    );
    Ok(loaded)
}

/// Load `layout_path` into [`LAYOUT_CACHE`] unless it is already cached and unchanged on disk.
pub fn ensure_layout_loaded(layout_path: &str) -> Result<()> {
    let mut guard = LAYOUT_CACHE.write().unwrap_or_else(PoisonError::into_inner);
    let need_reload = match guard.as_ref() {
        None => true,
        Some(ll) => {
            if ll.path != layout_path { true } else {
                let current = read_mtime(Path::new(layout_path));
                current != ll.mtime
            }
        }
    };
    if need_reload {
        let loaded = load_layout_internal(layout_path)?;
        *guard = Some(loaded);
    }
    Ok(())
}
