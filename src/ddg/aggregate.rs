//! Diagnostics for `ddg_mutations_aggregate.csv` before it is handed to the plotter.
//!
//! The plotter splits every `mutation` value on '.' into exactly four parts
//! (chain, wild type, residue number, mutant) and refuses multi-mutations, so
//! most of the checks here look for rows that would break that step.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use csv::ReaderBuilder;

use crate::common::residues::is_standard;
use crate::errors::{MutkitError, Result};

pub const REQUIRED_COLUMNS: [&str; 7] = [
    "mutation",
    "mutation_label",
    "position_label",
    "state",
    "energy_unit",
    "score_function_name",
    "total_score",
];

const REQUIRED_STATES: [&str; 3] = ["ddg", "wt", "mut"];

const ENERGY_TERMS: [&str; 10] = [
    "hbond_sr_bb",
    "hbond_lr_bb",
    "hbond_bb_sc",
    "hbond_sc",
    "omega",
    "fa_dun",
    "p_aa_pp",
    "yhh_planarity",
    "ref",
    "rama_prepro",
];

const MAX_EXAMPLES: usize = 10;

/// Cell contents read as missing values, same list pandas uses by default.
const MISSING_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_missing(cell: &str) -> bool {
    cell.is_empty() || MISSING_TOKENS.contains(&cell)
}

/// Header plus rows, all cells kept as text. Empty cells and NA-style tokens stand
/// for missing values.
#[derive(Debug, Clone, Default)]
pub struct AggregateTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl AggregateTable {
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(MutkitError::missing("aggregate CSV", path));
        }
        let rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
        Self::from_reader(rdr)
    }

    pub fn from_reader<R: std::io::Read>(mut rdr: csv::Reader<R>) -> Result<Self> {
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(
                (0..headers.len())
                    .map(|i| record.get(i).unwrap_or("").trim().to_owned())
                    .collect(),
            );
        }
        Ok(AggregateTable { headers, rows })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Cells of one column, `None` for missing values. Missing columns yield nothing.
    pub fn column(&self, name: &str) -> Vec<Option<&str>> {
        let Some(idx) = self.headers.iter().position(|h| h == name) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .map(|row| Some(row[idx].as_str()).filter(|v| !is_missing(v)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub passed: bool,
    pub messages: Vec<String>,
}

impl CheckOutcome {
    fn new(name: &'static str, passed: bool, messages: Vec<String>) -> Self {
        Self {
            name,
            passed,
            messages,
        }
    }

    fn missing_column(name: &'static str, column: &str) -> Self {
        Self::new(name, false, vec![format!("'{}' column not found!", column)])
    }
}

#[derive(Debug, Clone, Default)]
pub struct AggregateReport {
    pub rows: usize,
    pub columns: usize,
    pub checks: Vec<CheckOutcome>,
}

impl AggregateReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn check(&self, name: &str) -> Option<&CheckOutcome> {
        self.checks.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for AggregateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "CSV loaded successfully: {} rows, {} columns",
            self.rows, self.columns
        )?;
        for check in &self.checks {
            let mark = if check.passed { "PASS" } else { "FAIL" };
            writeln!(f, "\n[{}] {}", mark, check.name)?;
            for msg in &check.messages {
                writeln!(f, "   {}", msg)?;
            }
        }
        writeln!(f, "\n{}", "=".repeat(60))?;
        if self.passed() {
            writeln!(f, "ALL CHECKS PASSED!")?;
            write!(f, "   The CSV should work with rosetta_ddg_plot total_heatmap_saturation")
        } else {
            writeln!(f, "SOME CHECKS FAILED!")?;
            write!(f, "   Fix the issues above before running rosetta_ddg_plot")
        }
    }
}

pub fn check_file(path: &Path) -> Result<AggregateReport> {
    let table = AggregateTable::from_path(path)?;
    log::info!(
        "Diagnosing {}: {} rows, {} columns",
        path.display(),
        table.rows.len(),
        table.headers.len()
    );
    Ok(check_table(&table))
}

pub fn check_table(table: &AggregateTable) -> AggregateReport {
    AggregateReport {
        rows: table.rows.len(),
        columns: table.headers.len(),
        checks: vec![
            check_required_columns(table),
            check_mutation_format(table),
            check_state_column(table),
            check_numeric_columns(table),
            check_saturation_compatibility(table),
            check_data_consistency(table),
        ],
    }
}

// MARK: - Individual checks
fn check_required_columns(table: &AggregateTable) -> CheckOutcome {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !table.has_column(c))
        .collect();
    if missing.is_empty() {
        return CheckOutcome::new("Required columns", true, vec![]);
    }
    CheckOutcome::new(
        "Required columns",
        false,
        vec![
            format!("Missing required columns: {:?}", missing),
            format!("Available columns: {:?}", table.headers),
        ],
    )
}

fn is_multi_mutation(mutation: &str) -> bool {
    mutation.contains([',', ':', ';'])
}

/// Why a single mutation string would not split into chain.wt.num.mut, if it would not.
pub fn mutation_format_problem(mutation: &str) -> Option<String> {
    let parts: Vec<&str> = mutation.splitn(4, '.').collect();
    if parts.len() != 4 {
        return Some(format!("Expected 4 parts, got {}", parts.len()));
    }
    let empty: Vec<usize> = (0..4).filter(|&i| parts[i].is_empty()).collect();
    if !empty.is_empty() {
        return Some(format!("Empty parts at positions: {:?}", empty));
    }

    let (chain, wt, num, mutant) = (parts[0], parts[1], parts[2], parts[3]);
    let single_standard = |s: &str| s.chars().count() == 1 && s.chars().all(is_standard);
    if chain.chars().count() != 1 || !chain.chars().all(char::is_alphabetic) {
        return Some(format!("Invalid chain '{}' (should be single letter)", chain));
    }
    if !single_standard(wt) {
        return Some(format!("Invalid WT residue '{}'", wt));
    }
    if !single_standard(mutant) {
        return Some(format!("Invalid mutant residue '{}'", mutant));
    }
    if !num.chars().all(|c| c.is_ascii_digit()) {
        return Some(format!(
            "Invalid residue number '{}' (should be numeric)",
            num
        ));
    }
    None
}

fn check_mutation_format(table: &AggregateTable) -> CheckOutcome {
    const NAME: &str = "Mutation format";
    if !table.has_column("mutation") {
        return CheckOutcome::missing_column(NAME, "mutation");
    }
    let column = table.column("mutation");
    let mut issues = Vec::new();

    let empty_rows: Vec<usize> = column
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_none())
        .map(|(i, _)| i)
        .collect();
    if !empty_rows.is_empty() {
        issues.push(format!(
            "{} NaN/null values in mutation column",
            empty_rows.len()
        ));
        issues.push(format!(
            "   First NaN rows: {:?}",
            &empty_rows[..empty_rows.len().min(MAX_EXAMPLES)]
        ));
    }

    let malformed: Vec<(usize, &str, String)> = column
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|m| (i, m)))
        .filter_map(|(i, m)| mutation_format_problem(m).map(|why| (i + 2, m, why)))
        .collect();
    if !malformed.is_empty() {
        issues.push(format!("{} malformed mutation entries:", malformed.len()));
        for (row, m, why) in malformed.iter().take(MAX_EXAMPLES) {
            issues.push(format!("   Row {}: '{}' - {}", row, m, why));
        }
        if malformed.len() > MAX_EXAMPLES {
            issues.push(format!("   ... and {} more", malformed.len() - MAX_EXAMPLES));
        }
    }

    let multi: Vec<&str> = column.iter().flatten().copied().filter(|m| is_multi_mutation(m)).collect();
    if !multi.is_empty() {
        issues.push(format!(
            "{} entries appear to contain multiple mutations (comma/colon/semicolon separated)",
            multi.len()
        ));
        issues.push(format!("   Examples: {:?}", &multi[..multi.len().min(5)]));
    }

    let bad_split: Vec<&str> = column
        .iter()
        .flatten()
        .copied()
        .filter(|m| m.splitn(4, '.').count() != 4)
        .collect();
    if !bad_split.is_empty() {
        issues.push(format!(
            "{} mutation strings would not split into 4 parts (exactly the error the plot catches)",
            bad_split.len()
        ));
        issues.push(format!("   Examples: {:?}", &bad_split[..bad_split.len().min(5)]));
    }

    if issues.is_empty() {
        return CheckOutcome::new(NAME, true, vec!["Mutation column format is valid".to_owned()]);
    }
    CheckOutcome::new(NAME, false, issues)
}

fn check_state_column(table: &AggregateTable) -> CheckOutcome {
    const NAME: &str = "State column";
    if !table.has_column("state") {
        return CheckOutcome::missing_column(NAME, "state");
    }
    let column = table.column("state");
    let found: BTreeSet<&str> = column.iter().flatten().copied().collect();
    let missing: Vec<&str> = REQUIRED_STATES
        .iter()
        .copied()
        .filter(|s| !found.contains(s))
        .collect();
    if !missing.is_empty() {
        return CheckOutcome::new(
            NAME,
            false,
            vec![
                format!("Missing required states: {:?}", missing),
                format!("Found states: {:?}", found),
            ],
        );
    }
    let empty = column.iter().filter(|v| v.is_none()).count();
    if empty > 0 {
        return CheckOutcome::new(
            NAME,
            false,
            vec![format!("{} NaN values in state column", empty)],
        );
    }
    CheckOutcome::new(NAME, true, vec![])
}

fn check_numeric_columns(table: &AggregateTable) -> CheckOutcome {
    const NAME: &str = "Numeric columns";
    let numeric = table.headers.iter().filter(|h| {
        h.as_str() == "total_score" || h.starts_with("fa_") || ENERGY_TERMS.contains(&h.as_str())
    });

    let mut issues = Vec::new();
    for col in numeric {
        let bad: Vec<&str> = table
            .column(col)
            .into_iter()
            .flatten()
            .filter(|v| v.parse::<f64>().is_err())
            .collect();
        if !bad.is_empty() {
            issues.push(format!(
                "Non-numeric values in '{}': {:?}",
                col,
                &bad[..bad.len().min(5)]
            ));
        }
    }
    CheckOutcome::new(NAME, issues.is_empty(), issues)
}

fn check_saturation_compatibility(table: &AggregateTable) -> CheckOutcome {
    const NAME: &str = "Saturation compatibility";
    if !table.has_column("state") || !table.has_column("mutation") {
        return CheckOutcome::missing_column(NAME, "state/mutation");
    }

    let ddg: Vec<&str> = table
        .column("state")
        .into_iter()
        .zip(table.column("mutation"))
        .filter(|(state, _)| *state == Some("ddg"))
        .filter_map(|(_, m)| m)
        .collect();
    if ddg.is_empty() {
        return CheckOutcome::new(NAME, false, vec!["No ddg rows found!".to_owned()]);
    }

    // position -> mutant residues, in order of first appearance
    let mut order: Vec<String> = Vec::new();
    let mut positions: HashMap<String, BTreeSet<&str>> = HashMap::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for &m in &ddg {
        *counts.entry(m).or_insert(0) += 1;
        let parts: Vec<&str> = m.splitn(4, '.').collect();
        if parts.len() != 4 {
            continue;
        }
        let position = format!("{}.{}.{}", parts[0], parts[1], parts[2]);
        if !positions.contains_key(&position) {
            order.push(position.clone());
        }
        positions.entry(position).or_default().insert(parts[3]);
    }

    let mut messages = Vec::new();
    let mut duplicates: Vec<(&str, usize)> = counts.into_iter().filter(|(_, n)| *n > 1).collect();
    duplicates.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    if !duplicates.is_empty() {
        messages.push(format!(
            "WARNING: {} duplicate mutations found:",
            duplicates.len()
        ));
        for (m, n) in duplicates.iter().take(MAX_EXAMPLES) {
            messages.push(format!("   '{}' appears {} times", m, n));
        }
    }

    let multi: Vec<&str> = ddg.iter().copied().filter(|m| is_multi_mutation(m)).collect();
    if !multi.is_empty() {
        messages.push(format!(
            "{} multiple mutations found (not compatible with saturation plot):",
            multi.len()
        ));
        messages.extend(multi.iter().take(5).map(|m| format!("   '{}'", m)));
        return CheckOutcome::new(NAME, false, messages);
    }

    messages.push(format!(
        "Found {} positions with saturation data",
        positions.len()
    ));
    for pos in order.iter().take(5) {
        let muts = &positions[pos];
        messages.push(format!("   {}: {} mutations ({:?})", pos, muts.len(), muts));
    }
    if order.len() > 5 {
        messages.push(format!("   ... and {} more positions", order.len() - 5));
    }
    CheckOutcome::new(NAME, true, messages)
}

fn check_data_consistency(table: &AggregateTable) -> CheckOutcome {
    const NAME: &str = "Data consistency";
    for col in ["mutation", "state", "energy_unit", "score_function_name"] {
        if !table.has_column(col) {
            return CheckOutcome::missing_column(NAME, col);
        }
    }

    let mut order: Vec<&str> = Vec::new();
    let mut states: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for (m, s) in table.column("mutation").into_iter().zip(table.column("state")) {
        let Some(m) = m else { continue };
        let entry = states.entry(m).or_insert_with(|| {
            order.push(m);
            BTreeSet::new()
        });
        if let Some(s) = s {
            entry.insert(s);
        }
    }

    let mut issues = Vec::new();
    let incomplete: Vec<(&str, Vec<&str>)> = order
        .iter()
        .filter_map(|m| {
            let missing: Vec<&str> = REQUIRED_STATES
                .iter()
                .copied()
                .filter(|s| !states[m].contains(s))
                .collect();
            (!missing.is_empty()).then_some((*m, missing))
        })
        .collect();
    if !incomplete.is_empty() {
        issues.push(format!("{} mutations missing states:", incomplete.len()));
        for (m, missing) in incomplete.iter().take(5) {
            issues.push(format!("   '{}' missing: {:?}", m, missing));
        }
        if incomplete.len() > 5 {
            issues.push(format!("   ... and {} more", incomplete.len() - 5));
        }
    }

    for (col, label) in [
        ("energy_unit", "energy units"),
        ("score_function_name", "score functions"),
    ] {
        let distinct: BTreeSet<Option<&str>> = table.column(col).into_iter().collect();
        if distinct.len() > 1 {
            issues.push(format!("Multiple {} found: {:?}", label, distinct));
        }
    }

    CheckOutcome::new(NAME, issues.is_empty(), issues)
}
