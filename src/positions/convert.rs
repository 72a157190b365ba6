//! RosettaDDG mutinfo / span files to MutateX position lists.
//!
//! Accepted position tokens (one or more per line, comma or space separated):
//! `H.S.214`, `H.S.214.A`, `H S 214`, `H-S214A`, `E-Ser657A`. Tokens without
//! chain information such as `S657A` never parse, so the next token is tried.

use std::collections::{BTreeMap, HashSet};
use std::io::BufRead;
use std::sync::OnceLock;

use regex::Regex;

use crate::common::residues::one_letter_or_x;
use crate::errors::{MutkitError, Result};
use crate::pdb::parsing::Structure;
use crate::pdb::spans::Span;
use crate::positions::lists::mutatex_entry;

fn hyphenated() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z])-([A-Za-z]{1,3})(\d+)([A-Za-z]{1,3})?$").expect("valid regex")
    })
}

fn separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s,]+").expect("valid regex"))
}

/// Parse one token into `(chain, wild-type one-letter code, residue number)`.
pub fn parse_rosetta_position(token: &str) -> Result<(char, char, i32)> {
    let s = token.trim();

    let parts: Vec<&str> = s.split(|c: char| c == '.' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() == 3 || parts.len() == 4 {
        let chain = parts[0]
            .chars()
            .next()
            .ok_or_else(|| MutkitError::InvalidPosition(format!("Invalid chain: {}", parts[0])))?;
        let resnum = parts[2].parse::<i32>().map_err(|_| {
            MutkitError::InvalidPosition(format!("Invalid residue number: {}", parts[2]))
        })?;
        return Ok((chain, one_letter_or_x(parts[1]), resnum));
    }

    if let Some(caps) = hyphenated().captures(s) {
        let chain = caps[1].chars().next().unwrap_or_default();
        let resnum = caps[3]
            .parse::<i32>()
            .map_err(|_| MutkitError::InvalidPosition(s.to_owned()))?;
        return Ok((chain, one_letter_or_x(&caps[2]), resnum));
    }

    Err(MutkitError::InvalidPosition(token.to_owned()))
}

/// Convert a mutinfo file; lines nothing can be read from are logged and skipped.
pub fn convert_mutinfo<R: BufRead>(reader: R, unique_only: bool) -> Result<Vec<String>> {
    let mut positions = Vec::new();
    let mut seen = HashSet::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parsed = separators()
            .split(line)
            .filter(|t| !t.is_empty())
            .find_map(|t| parse_rosetta_position(t).ok());

        match parsed {
            Some((chain, residue, resnum)) => {
                let entry = mutatex_entry(residue, &chain.to_string(), resnum);
                if !unique_only || seen.insert(entry.clone()) {
                    positions.push(entry);
                }
            }
            None => log::warn!(
                "Line {}: Could not parse any token - skipping line: '{}'",
                idx + 1,
                line
            ),
        }
    }

    Ok(positions)
}

/// Expand a `chain:start-end` (or `chain:N`) file against a structure.
pub fn convert_spans_file<R: BufRead>(reader: R, structure: &Structure) -> Result<Vec<String>> {
    let mut positions = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let span = match Span::parse_lenient(line) {
            Ok(span) => span,
            Err(err) => {
                log::warn!("{}", err);
                continue;
            }
        };

        let Some(chain) = structure.chain(&span.chain) else {
            log::warn!("Chain {} not found in PDB", span.chain);
            continue;
        };
        positions.extend(
            chain
                .standard_residues()
                .filter(|r| span.contains(r.number))
                .map(|r| mutatex_entry(r.one_letter(), &chain.id, r.number)),
        );
    }

    Ok(positions)
}

/// Totals and per-chain counts of a converted position list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionStats {
    pub total: usize,
    pub per_chain: BTreeMap<char, usize>,
}

impl ConversionStats {
    /// MutateX entries start with the residue code, the chain is the second character.
    pub fn from_positions(positions: &[String]) -> Self {
        let mut per_chain = BTreeMap::new();
        for chain in positions.iter().filter_map(|p| p.chars().nth(1)) {
            *per_chain.entry(chain).or_insert(0) += 1;
        }
        ConversionStats {
            total: positions.len(),
            per_chain,
        }
    }
}

pub fn summary(input: &str, output: Option<&str>, positions: &[String]) -> String {
    let stats = ConversionStats::from_positions(positions);
    let mut lines = vec![
        "=== Conversion Summary ===".to_owned(),
        format!("Input file: {}", input),
    ];
    if let Some(output) = output {
        lines.push(format!("Output file: {}", output));
    }
    lines.push(format!("Total positions: {}", stats.total));

    if !positions.is_empty() {
        lines.push(String::new());
        lines.push("Positions by chain:".to_owned());
        for (chain, count) in &stats.per_chain {
            lines.push(format!("  Chain {}: {} positions", chain, count));
        }
        lines.push(String::new());
        if positions.len() <= 20 {
            lines.push("All positions:".to_owned());
            lines.extend(positions.iter().map(|p| format!("  {}", p)));
        } else {
            lines.push("First 10 positions:".to_owned());
            lines.extend(positions.iter().take(10).map(|p| format!("  {}", p)));
            lines.push(format!("  ... and {} more", positions.len() - 10));
        }
    }

    lines.join("\n")
}
