use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::common::residues::{three_to_one, UNKNOWN_RESIDUE};
use crate::errors::{MutkitError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Residue {
    pub name: String,
    pub number: i32,
    /// Insertion code, ' ' when absent
    pub insertion: char,
    /// True for HETATM residues (ligands, waters, modified residues)
    pub hetero: bool,
}

impl Residue {
    /// One-letter code, 'X' for anything non-standard.
    pub fn one_letter(&self) -> char {
        three_to_one(&self.name).unwrap_or(UNKNOWN_RESIDUE)
    }

    pub fn is_standard(&self) -> bool {
        three_to_one(&self.name).is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Chain {
    pub id: String,
    pub residues: Vec<Residue>,
}

impl Chain {
    /// Residues coming from ATOM records, in file order.
    pub fn standard_residues(&self) -> impl Iterator<Item = &Residue> {
        self.residues.iter().filter(|r| !r.hetero)
    }

    /// Lowest and highest residue number among non-hetero residues.
    pub fn residue_range(&self) -> Option<(i32, i32)> {
        let nums = self.standard_residues().map(|r| r.number);
        nums.fold(None, |acc, n| match acc {
            None => Some((n, n)),
            Some((lo, hi)) => Some((lo.min(n), hi.max(n))),
        })
    }
}

/// First model of a PDB file, reduced to chains and residues.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Structure {
    pub chains: Vec<Chain>,
}

impl Structure {
    pub fn from_pdb_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(MutkitError::missing("PDB file", path));
        }
        let data = fs::read_to_string(path)?;
        let structure = Self::from_pdb_str(&data)?;
        log::debug!(
            "{}: {} chain(s), {} residue(s)",
            path.display(),
            structure.chains.len(),
            structure.chains.iter().map(|c| c.residues.len()).sum::<usize>()
        );
        Ok(structure)
    }

    pub fn from_pdb_str(contents: &str) -> Result<Self> {
        let mut structure = Structure::default();
        let mut chain_lookup: HashMap<String, usize> = HashMap::new();
        let mut residue_lookup: HashMap<(usize, i32, char, bool), usize> = HashMap::new();

        for (idx, line) in contents.lines().enumerate() {
            if line.starts_with("ENDMDL") {
                break;
            }

            let hetero = match get_record_for(line) {
                "ATOM" => false,
                "HETATM" => true,
                _ => continue,
            };

            let Some((name, chain_id, number, insertion)) = get_res_fields(line, idx + 1)? else {
                log::debug!("Skipping truncated record at line {}", idx + 1);
                continue;
            };

            let chain_idx = *chain_lookup.entry(chain_id.clone()).or_insert_with(|| {
                structure.chains.push(Chain {
                    id: chain_id,
                    residues: Vec::new(),
                });
                structure.chains.len() - 1
            });

            let key = (chain_idx, number, insertion, hetero);
            if residue_lookup.contains_key(&key) {
                continue;
            }
            let residues = &mut structure.chains[chain_idx].residues;
            residue_lookup.insert(key, residues.len());
            residues.push(Residue {
                name,
                number,
                insertion,
                hetero,
            });
        }

        Ok(structure)
    }

    pub fn chain(&self, id: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.id == id)
    }
}

// MARK: - Fixed-column fields
fn get_record_for(line: &str) -> &str {
    line.get(0..6).unwrap_or(line).trim_end()
}

fn get_res_fields(line: &str, line_no: usize) -> Result<Option<(String, String, i32, char)>> {
    let (Some(name), Some(num_str)) = (line.get(17..20), line.get(22..26)) else {
        return Ok(None);
    };

    let chain = line.get(21..22).unwrap_or(" ").trim().to_owned();
    let number = num_str
        .trim()
        .parse::<i32>()
        .map_err(|_| MutkitError::PdbRecord {
            line: line_no,
            reason: format!("invalid residue number '{}'", num_str.trim()),
        })?;
    let insertion = line.get(26..27).and_then(|s| s.chars().next()).unwrap_or(' ');

    Ok(Some((name.trim().to_ascii_uppercase(), chain, number, insertion)))
}
