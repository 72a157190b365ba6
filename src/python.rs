use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;

use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;

use crate::common::hamming;
use crate::common::residues::validate_query;
use crate::errors::MutkitError;
use crate::node::status::{human_readable_report, parse_fixed_format};
use crate::pdb::parsing::Structure;
use crate::pdb::search::find_spans_in_structure;
use crate::positions::convert::convert_mutinfo;

fn to_py_err(err: MutkitError) -> PyErr {
    match err {
        MutkitError::Io(e) => PyIOError::new_err(e.to_string()),
        MutkitError::MissingPath { .. } => PyIOError::new_err(err.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

#[pyfunction]
fn find_matches(
    sequence: String,
    res_nums: Vec<i32>,
    query: String,
    max_mismatches: usize,
) -> PyResult<Vec<(i32, i32, usize)>> {
    let sequence: Vec<char> = sequence.chars().collect();
    hamming::check_aligned(&sequence, &res_nums).map_err(to_py_err)?;
    let query: Vec<char> = query.chars().collect();
    Ok(hamming::find_matches(&sequence, &res_nums, &query, max_mismatches))
}

/// `(chain, start, end, mismatches, matched sequence)` for every hit in a PDB file.
#[pyfunction]
fn find_spans(
    pdb_path: String,
    query: String,
    max_mismatches: usize,
) -> PyResult<Vec<(String, i32, i32, usize, String)>> {
    let query = validate_query(&query).map_err(to_py_err)?;
    let structure = Structure::from_pdb_file(&PathBuf::from(pdb_path)).map_err(to_py_err)?;
    Ok(find_spans_in_structure(&structure, &query, max_mismatches)
        .into_iter()
        .map(|m| (m.chain_id, m.start, m.end, m.mismatches, m.sequence))
        .collect())
}

#[pyfunction]
fn convert_mutinfo_text(text: String, unique_only: bool) -> PyResult<Vec<String>> {
    convert_mutinfo(Cursor::new(text), unique_only).map_err(to_py_err)
}

#[pyfunction]
fn node_report(text: String) -> (String, HashMap<String, String>) {
    let lines: Vec<&str> = text.lines().collect();
    let data = parse_fixed_format(&lines);
    (human_readable_report(&data), data)
}

/// A Python module implemented in Rust.
#[pymodule]
fn mutkit_rs(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(find_matches, m)?)?;
    m.add_function(wrap_pyfunction!(find_spans, m)?)?;
    m.add_function(wrap_pyfunction!(convert_mutinfo_text, m)?)?;
    m.add_function(wrap_pyfunction!(node_report, m)?)?;
    Ok(())
}
