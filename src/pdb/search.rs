use std::fs::File;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use rayon::prelude::*;
use serde::Serialize;

use crate::common::hamming::find_matches;
use crate::errors::Result;
use crate::pdb::parsing::{Chain, Structure};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpanMatch {
    pub chain_id: String,
    pub start: i32,
    pub end: i32,
    pub mismatches: usize,
    /// Residues of the matched window as they appear in the structure
    pub sequence: String,
}

impl SpanMatch {
    pub fn span(&self) -> String {
        format!("{}:{}-{}", self.chain_id, self.start, self.end)
    }

    pub fn mismatch_note(&self) -> String {
        match self.mismatches {
            0 => String::new(),
            1 => " (1 mismatch)".to_owned(),
            n => format!(" ({} mismatches)", n),
        }
    }
}

/// Results of searching one PDB file.
#[derive(Debug)]
pub struct FileMatches {
    pub path: PathBuf,
    pub matches: Result<Vec<SpanMatch>>,
}

/// One-letter sequence and residue numbers of a chain, hetero residues excluded.
pub fn extract_chain_sequence(chain: &Chain) -> (Vec<char>, Vec<i32>) {
    chain
        .standard_residues()
        .map(|r| (r.one_letter(), r.number))
        .unzip()
}

/// Run the window matcher over every chain of the first model.
pub fn find_spans_in_structure(
    structure: &Structure,
    query: &str,
    max_mismatches: usize,
) -> Vec<SpanMatch> {
    let query: Vec<char> = query.to_ascii_uppercase().chars().collect();
    let mut results = Vec::new();

    for chain in &structure.chains {
        let (sequence, res_nums) = extract_chain_sequence(chain);
        if sequence.is_empty() || sequence.len() < query.len() {
            continue;
        }

        // Scan on window indices so the matched residues can be sliced back out.
        let qlen = query.len();
        let indices: Vec<i32> = (0..sequence.len() as i32).collect();
        for (i, _, mismatches) in find_matches(&sequence, &indices, &query, max_mismatches) {
            let i = i as usize;
            results.push(SpanMatch {
                chain_id: chain.id.clone(),
                start: res_nums[i],
                end: res_nums[i + qlen - 1],
                mismatches,
                sequence: sequence[i..i + qlen].iter().collect(),
            });
        }
    }

    results
}

/// Parse and search several PDB files in parallel; results keep the input order.
pub fn search_files(paths: &[PathBuf], query: &str, max_mismatches: usize) -> Vec<FileMatches> {
    paths
        .par_iter()
        .map(|path| FileMatches {
            path: path.clone(),
            matches: Structure::from_pdb_file(path)
                .map(|s| find_spans_in_structure(&s, query, max_mismatches)),
        })
        .collect()
}

// MARK: - Export
#[derive(Serialize)]
struct Row<'a> {
    pdb: &'a str,
    chain_id: &'a str,
    start: i32,
    end: i32,
    mismatches: usize,
    sequence: &'a str,
}

pub fn write_matches_csv(out_path: &Path, results: &[(String, Vec<SpanMatch>)]) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_path(out_path)?;
    for (pdb, matches) in results {
        for m in matches {
            wtr.serialize(Row {
                pdb,
                chain_id: &m.chain_id,
                start: m.start,
                end: m.end,
                mismatches: m.mismatches,
                sequence: &m.sequence,
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Pickle the matches as a list of dicts for the Python side of the pipeline.
pub fn write_matches_pickle(out_path: &Path, results: &[(String, Vec<SpanMatch>)]) -> Result<()> {
    let rows: Vec<Row> = results
        .iter()
        .flat_map(|(pdb, matches)| {
            matches.iter().map(move |m| Row {
                pdb,
                chain_id: &m.chain_id,
                start: m.start,
                end: m.end,
                mismatches: m.mismatches,
                sequence: &m.sequence,
            })
        })
        .collect();
    let mut file = File::create(out_path)?;
    serde_pickle::to_writer(&mut file, &rows, Default::default())?;
    Ok(())
}
