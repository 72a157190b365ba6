//! Utilities for a protein mutagenesis workflow: locating sequence spans in PDB
//! structures, building RosettaDDG / MutateX position lists, checking Flex ddG
//! outputs and driving the plotting step.

pub mod cli;
pub mod common;
pub mod ddg;
pub mod errors;
pub mod node;
pub mod pdb;
pub mod positions;

#[cfg(feature = "python")]
mod python;

pub use common::hamming::find_matches;
pub use errors::{MutkitError, Result};
pub use pdb::parsing::Structure;
pub use pdb::search::{extract_chain_sequence, find_spans_in_structure, SpanMatch};
pub use pdb::spans::Span;
