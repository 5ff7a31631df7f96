// PyO3 bindings for flatfile_core
use pyo3::exceptions::{PyKeyError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyModule};
use std::sync::PoisonError;

use flatfile_core as core;

use core::{LayoutError, LoadedLayout, LAYOUT_CACHE};

// Parallel iterators for batch splitting
use rayon::prelude::*;

fn to_py_err(e: LayoutError) -> PyErr {
    match e {
        LayoutError::UnknownRecordType { .. } => PyKeyError::new_err(e.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

fn parse_line_to_dict<'py>(
    py: Python<'py>,
    line: &str,
    layout: &LoadedLayout,
) -> PyResult<Bound<'py, PyDict>> {
    let parsed = core::parse_line(line, &layout.dialect, &layout.metadata).map_err(to_py_err)?;
    let values = PyDict::new(py);
    for (name, value) in &parsed.values {
        let key = pyo3::types::PyString::intern(py, name);
        match value {
            Some(v) => values.set_item(key, v)?,
            None => values.set_item(key, py.None())?,
        }
    }
    let d = PyDict::new(py);
    d.set_item("record_key", parsed.record_key)?;
    d.set_item("values", values)?;
    Ok(d)
}

fn with_layout<T>(f: impl FnOnce(&LoadedLayout) -> PyResult<T>) -> PyResult<T> {
    let guard = LAYOUT_CACHE.read().unwrap_or_else(PoisonError::into_inner);
    let layout = guard.as_ref().ok_or_else(|| {
        PyValueError::new_err("No layout loaded. Call load_layout() or use parse_line_with_layout().")
    })?;
    f(layout)
}

/// Split one line into fields. Absent fields come back as None, an explicit "" as an empty string.
#[pyfunction]
#[pyo3(signature = (line, delimiter=',', qualifier=Some('"')))]
fn split_line(line: Option<&str>, delimiter: char, qualifier: Option<char>) -> Vec<Option<String>> {
    core::split_line(line, delimiter, qualifier)
}

/// Split a batch of lines in parallel.
#[pyfunction]
#[pyo3(signature = (lines, delimiter=',', qualifier=Some('"')))]
fn split_lines(lines: Vec<String>, delimiter: char, qualifier: Option<char>) -> Vec<Vec<Option<String>>> {
    lines
        .par_iter()
        .map(|line| core::split_line(Some(line.as_str()), delimiter, qualifier))
        .collect()
}

/// Extract the field at the given 0-based index. Returns None if absent or out of bounds.
#[pyfunction]
#[pyo3(signature = (line, index, delimiter=',', qualifier=Some('"')))]
fn extract_field(line: &str, index: usize, delimiter: char, qualifier: Option<char>) -> Option<String> {
    core::extract_field(line, delimiter, qualifier, index)
}

/// Load a layout definition from a JSON file path. Returns True on success.
/// Raises ValueError if the file cannot be read or parsed.
#[pyfunction]
#[pyo3(text_signature = "(layout_path)")]
fn load_layout(layout_path: &str) -> PyResult<bool> {
    let loaded = core::load_layout_internal(layout_path).map_err(to_py_err)?;
    let mut guard = LAYOUT_CACHE.write().unwrap_or_else(PoisonError::into_inner);
    *guard = Some(loaded);
    Ok(true)
}

/// Set the layout definition from a JSON string. Returns True on success.
#[pyfunction]
#[pyo3(text_signature = "(layout_json)")]
fn set_layout_json(layout_json: &str) -> PyResult<bool> {
    let loaded = core::layout_from_json(layout_json).map_err(to_py_err)?;
    let mut guard = LAYOUT_CACHE.write().unwrap_or_else(PoisonError::into_inner);
    *guard = Some(loaded);
    Ok(true)
}

/// Return current layout status and metadata.
#[pyfunction]
#[pyo3(text_signature = "()")]
fn get_layout_status(py: Python) -> PyResult<Py<PyDict>> {
    let guard = LAYOUT_CACHE.read().unwrap_or_else(PoisonError::into_inner);
    let d = PyDict::new(py);
    match guard.as_ref() {
        Some(ll) => {
            d.set_item("loaded", true)?;
            if ll.path.is_empty() {
                d.set_item("path", py.None())?;
                d.set_item("source", "json")?;
            } else {
                d.set_item("path", ll.path.clone())?;
                d.set_item("source", "file")?;
            }
            d.set_item("delimiter", ll.dialect.delimiter)?;
            d.set_item("qualifier", ll.dialect.qualifier)?;
            d.set_item("columns", ll.metadata.columns().to_vec())?;
            d.set_item("record_types", ll.metadata.record_layouts().count())?;
        }
        None => {
            d.set_item("loaded", false)?;
            d.set_item("path", py.None())?;
            d.set_item("source", py.None())?;
        }
    }
    Ok(d.unbind())
}

/// Position of a column in the loaded layout. Raises KeyError for an unknown record type.
#[pyfunction]
#[pyo3(signature = (column, record_key=None))]
fn column_index(column: &str, record_key: Option<&str>) -> PyResult<Option<usize>> {
    with_layout(|ll| ll.metadata.column_index(record_key, column).map_err(to_py_err))
}

/// Named record types of the loaded layout, in definition order.
#[pyfunction]
#[pyo3(text_signature = "()")]
fn record_keys() -> PyResult<Vec<String>> {
    with_layout(|ll| Ok(ll.metadata.record_layouts().map(|(k, _)| k.to_string()).collect()))
}

/// Parse a single line using the previously loaded layout.
/// Returns {"record_key": str | None, "values": {column: value}}.
#[pyfunction]
#[pyo3(text_signature = "(line)")]
fn parse_line(py: Python, line: &str) -> PyResult<Py<PyDict>> {
    with_layout(|ll| Ok(parse_line_to_dict(py, line, ll)?.unbind()))
}

/// Parse a single line using the layout at the given path (reloaded when the file changes).
#[pyfunction]
#[pyo3(text_signature = "(line, layout_path)")]
fn parse_line_with_layout(py: Python, line: &str, layout_path: &str) -> PyResult<Py<PyDict>> {
    core::ensure_layout_loaded(layout_path).map_err(to_py_err)?;
    parse_line(py, line)
}

#[pymodule]
#[pyo3(module = "flatfile_rs")]
fn flatfile_rs(_py: Python, m: &Bound<PyModule>) -> PyResult<()> {
    m.add(
        "__doc__",
        "Delimited flat-file tokenizer with record-layout column lookup.\n\n\
        Quick start:\n\
        >>> import flatfile_rs as ff\n\
        >>> ff.split_line('\"a,b\",,c')\n\
        ['a,b', None, 'c']\n\
        >>> ff.load_layout('path/to/layout.json')\n\
        >>> ff.parse_line('H,2024-01-31')['record_key']",
    )?;

    // Tokenizer APIs
    m.add_function(wrap_pyfunction!(split_line, m)?)?;
    m.add_function(wrap_pyfunction!(split_lines, m)?)?;
    m.add_function(wrap_pyfunction!(extract_field, m)?)?;

    // Layout APIs
    m.add_function(wrap_pyfunction!(load_layout, m)?)?;
    m.add_function(wrap_pyfunction!(set_layout_json, m)?)?;
    m.add_function(wrap_pyfunction!(get_layout_status, m)?)?;
    m.add_function(wrap_pyfunction!(column_index, m)?)?;
    m.add_function(wrap_pyfunction!(record_keys, m)?)?;
    m.add_function(wrap_pyfunction!(parse_line, m)?)?;
    m.add_function(wrap_pyfunction!(parse_line_with_layout, m)?)?;

    Ok(())
}
