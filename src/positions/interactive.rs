use std::io::{BufRead, Write};

use crate::errors::Result;
use crate::pdb::parsing::Structure;
use crate::pdb::search::find_spans_in_structure;
use crate::pdb::spans::chain_spans;

/// Prompt-driven span selection over `input`/`output`.
///
/// Returns the chosen spans as `chain:start-end` strings; an empty list when the
/// user exits, the input ends, or the structure has no standard residues.
pub fn select_spans<R: BufRead, W: Write>(
    structure: &Structure,
    input: &mut R,
    output: &mut W,
) -> Result<Vec<String>> {
    writeln!(output, "\n=== Interactive Mode ===")?;
    writeln!(output, "Available chains in structure:")?;

    let chains = chain_spans(structure);
    for (span, count) in &chains {
        writeln!(
            output,
            "  Chain {}: {} residues (range: {}-{})",
            span.chain, count, span.start, span.end
        )?;
    }
    if chains.is_empty() {
        writeln!(output, "No standard residues found in structure!")?;
        return Ok(Vec::new());
    }

    loop {
        writeln!(output, "\nOptions:")?;
        writeln!(output, "  1. Search for a sequence motif")?;
        writeln!(output, "  2. Manually enter residue spans")?;
        writeln!(output, "  3. Select entire chains")?;
        writeln!(output, "  4. Exit interactive mode")?;

        let Some(choice) = prompt(input, output, "\nSelect option (1-4): ")? else {
            return Ok(Vec::new());
        };

        match choice.as_str() {
            "1" => {
                let Some(query) = prompt(input, output, "Enter sequence to search (1-letter code): ")? else {
                    return Ok(Vec::new());
                };
                let query = query.to_ascii_uppercase();
                if query.is_empty() {
                    continue;
                }
                let fuzzy = prompt(input, output, "Allow mismatches? (0 for exact match, or number): ")?
                    .unwrap_or_default();
                let max_mismatches = fuzzy.parse::<usize>().unwrap_or(0);

                let matches = find_spans_in_structure(structure, &query, max_mismatches);
                if matches.is_empty() {
                    writeln!(
                        output,
                        "No matches found for '{}' with {} allowed mismatches",
                        query, max_mismatches
                    )?;
                    continue;
                }

                writeln!(output, "\nFound {} match(es):", matches.len())?;
                for (i, m) in matches.iter().enumerate() {
                    writeln!(
                        output,
                        "  {}. Chain {}: {}-{} [{}]{}",
                        i + 1,
                        m.chain_id,
                        m.start,
                        m.end,
                        m.sequence,
                        m.mismatch_note()
                    )?;
                }
                let spans: Vec<String> = matches.iter().map(|m| m.span()).collect();

                let use_all = prompt(input, output, "\nUse all matches? (y/n): ")?.unwrap_or_default();
                if use_all.eq_ignore_ascii_case("y") {
                    return Ok(spans);
                }
                let selected = prompt(
                    input,
                    output,
                    "Enter match numbers to use (comma-separated, e.g., 1,3): ",
                )?
                .unwrap_or_default();
                if !selected.is_empty() {
                    return Ok(pick(&selected, &spans));
                }
            }
            "2" => {
                let spans = prompt(input, output, "Enter residue spans (e.g., A:30-37,B:50-60): ")?
                    .unwrap_or_default();
                if !spans.is_empty() {
                    return Ok(spans.split(',').map(|s| s.trim().to_owned()).collect());
                }
            }
            "3" => {
                writeln!(output, "\nAvailable chains:")?;
                for (i, (span, _)) in chains.iter().enumerate() {
                    writeln!(
                        output,
                        "  {}. Chain {} ({}-{})",
                        i + 1,
                        span.chain,
                        span.start,
                        span.end
                    )?;
                }
                let selected = prompt(input, output, "\nSelect chains (comma-separated numbers): ")?
                    .unwrap_or_default();
                if !selected.is_empty() {
                    let whole: Vec<String> = chains.iter().map(|(s, _)| s.to_string()).collect();
                    return Ok(pick(&selected, &whole));
                }
            }
            "4" => return Ok(Vec::new()),
            _ => {}
        }
    }
}

/// `None` once the input is exhausted.
fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, text: &str) -> Result<Option<String>> {
    write!(output, "{}", text)?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_owned()))
}

/// 1-based picks from a comma-separated list; out of range and non-numeric entries are ignored.
fn pick(selection: &str, items: &[String]) -> Vec<String> {
    selection
        .split(',')
        .filter_map(|x| x.trim().parse::<usize>().ok())
        .filter(|&i| i >= 1 && i <= items.len())
        .map(|i| items[i - 1].clone())
        .collect()
}
