//! Error types shared by every tool in the crate.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MutkitError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Pickle error: {0}")]
    Pickle(#[from] serde_pickle::Error),

    /// Query motif contains something other than the 20 standard amino acids
    #[error("Invalid character in query sequence '{0}'. Only standard 20 amino acids allowed.")]
    InvalidQuery(String),

    #[error("Invalid span '{span}': {reason}")]
    InvalidSpan { span: String, reason: String },

    #[error("Invalid position format: {0}")]
    InvalidPosition(String),

    #[error("Sequence has {sequence} residues but {numbers} residue numbers were given")]
    MisalignedSequence { sequence: usize, numbers: usize },

    #[error("Malformed PDB record at line {line}: {reason}")]
    PdbRecord { line: usize, reason: String },

    #[error("Chain {0} not found in structure")]
    MissingChain(String),

    #[error("{kind} not found: {path}")]
    MissingPath { kind: &'static str, path: PathBuf },

    #[error("{0} command not found. Make sure it's in your PATH.")]
    CommandNotFound(String),
}

impl MutkitError {
    pub fn span(span: impl Into<String>, reason: impl Into<String>) -> Self {
        MutkitError::InvalidSpan {
            span: span.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(kind: &'static str, path: impl Into<PathBuf>) -> Self {
        MutkitError::MissingPath {
            kind,
            path: path.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MutkitError>;
