use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::errors::{MutkitError, Result};
use crate::pdb::parsing::Structure;

/// Inclusive residue range on a chain, written `chain:start-end`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    pub chain: String,
    pub start: i32,
    pub end: i32,
}

impl Span {
    pub fn contains(&self, resnum: i32) -> bool {
        self.start <= resnum && resnum <= self.end
    }

    /// Like `from_str`, but a bare `CHAIN:N` is read as a one-residue span.
    pub fn parse_lenient(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once(':') {
            Some((chain, num)) if !num.contains('-') => {
                let n = parse_bound(s, num)?;
                Ok(Span {
                    chain: chain.to_owned(),
                    start: n,
                    end: n,
                })
            }
            _ => s.parse(),
        }
    }
}

impl FromStr for Span {
    type Err = MutkitError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (chain, range) = s
            .split_once(':')
            .ok_or_else(|| MutkitError::span(s, "expected format CHAIN:START-END"))?;
        let (start, end) = range
            .split_once('-')
            .ok_or_else(|| MutkitError::span(s, "expected range format START-END"))?;
        let (start, end) = (parse_bound(s, start)?, parse_bound(s, end)?);
        if start > end {
            return Err(MutkitError::span(
                s,
                format!("{}-{}, start must be <= end", start, end),
            ));
        }
        Ok(Span {
            chain: chain.to_owned(),
            start,
            end,
        })
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chain, self.start, self.end)
    }
}

fn parse_bound(span: &str, bound: &str) -> Result<i32> {
    bound
        .trim()
        .parse()
        .map_err(|_| MutkitError::span(span, format!("'{}' is not a residue number", bound)))
}

/// Drop repeated span strings, keeping the first occurrence.
pub fn dedup_preserving_order(spans: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    spans
        .into_iter()
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

pub fn parse_spans<S: AsRef<str>>(spans: &[S]) -> Result<Vec<Span>> {
    spans.iter().map(|s| s.as_ref().parse()).collect()
}

/// Warnings for spans that do not fit the structure. Nothing here is fatal.
pub fn validate_spans(structure: &Structure, spans: &[Span]) -> Vec<String> {
    let mut warnings = Vec::new();

    for span in spans {
        let Some(chain) = structure.chain(&span.chain) else {
            warnings.push(format!("Chain {} not found in structure", span.chain));
            continue;
        };
        let Some((min_res, max_res)) = chain.residue_range() else {
            warnings.push(format!("Chain {} has no standard residues", span.chain));
            continue;
        };
        if span.start < min_res || span.end > max_res {
            warnings.push(format!(
                "Span {} partially outside chain range {}-{}",
                span, min_res, max_res
            ));
        }
    }

    warnings
}

/// Whole-chain span for every chain carrying standard residues.
pub fn chain_spans(structure: &Structure) -> Vec<(Span, usize)> {
    structure
        .chains
        .iter()
        .filter_map(|chain| {
            let (start, end) = chain.residue_range()?;
            let span = Span {
                chain: chain.id.clone(),
                start,
                end,
            };
            Some((span, chain.standard_residues().count()))
        })
        .collect()
}
