use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::common::residues::{STANDARD_AMINO_ACIDS, UNKNOWN_RESIDUE};
use crate::errors::Result;
use crate::pdb::parsing::Structure;
use crate::pdb::spans::Span;

/// Position entries plus the non-standard residues that were left out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PositionList {
    pub entries: Vec<String>,
    pub skipped: Vec<String>,
}

/// MutateX entry, e.g. `SH214`.
pub fn mutatex_entry(one_letter: char, chain: &str, resnum: i32) -> String {
    format!("{}{}{}", one_letter, chain, resnum)
}

/// RosettaDDG entry, e.g. `H.S.214 L`.
pub fn rosetta_entry(one_letter: char, chain: &str, resnum: i32, move_chain: &str) -> String {
    format!("{}.{}.{} {}", chain, one_letter, resnum, move_chain)
}

/// Walk the standard residues covered by `spans`, in span order then chain order.
fn collect<F>(structure: &Structure, spans: &[Span], mut emit: F) -> PositionList
where
    F: FnMut(&mut PositionList, Option<char>, &str, i32, &str),
{
    let mut list = PositionList::default();

    for span in spans {
        let Some(chain) = structure.chain(&span.chain) else {
            log::warn!("Chain {} not found in structure.", span.chain);
            continue;
        };
        for res in chain.standard_residues().filter(|r| span.contains(r.number)) {
            let code = res.is_standard().then(|| res.one_letter());
            emit(&mut list, code, &chain.id, res.number, &res.name);
        }
    }

    list
}

pub fn mutatex_positions(
    structure: &Structure,
    spans: &[Span],
    include_non_standard: bool,
) -> PositionList {
    collect(structure, spans, |list, code, chain, resnum, name| match code {
        Some(one) => list.entries.push(mutatex_entry(one, chain, resnum)),
        None if include_non_standard => {
            log::info!(
                "Including non-standard residue {} as X at {}{}",
                name,
                chain,
                resnum
            );
            list.entries.push(mutatex_entry(UNKNOWN_RESIDUE, chain, resnum));
        }
        None => list.skipped.push(format!("{} at {}{}", name, chain, resnum)),
    })
}

pub fn rosetta_positions(structure: &Structure, spans: &[Span], move_chain: &str) -> PositionList {
    collect(structure, spans, |list, code, chain, resnum, name| match code {
        Some(one) => list.entries.push(rosetta_entry(one, chain, resnum, move_chain)),
        None => {
            log::warn!("Skipping unknown residue {} at {}{}", name, chain, resnum);
            list.skipped.push(format!("{} at {}{}", name, chain, resnum));
        }
    })
}

/// One entry per line; `append` keeps whatever the file already holds.
pub fn write_position_list(out_path: &Path, entries: &[String], append: bool) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(out_path)?;
    let mut wtr = BufWriter::new(file);
    for entry in entries {
        writeln!(wtr, "{}", entry)?;
    }
    wtr.flush()?;
    Ok(())
}

/// The 20 standard residue types, one per line, for saturation runs.
pub fn write_residue_types(out_path: &Path) -> Result<()> {
    let entries: Vec<String> = STANDARD_AMINO_ACIDS.chars().map(String::from).collect();
    write_position_list(out_path, &entries, false)
}

pub fn summary(out_path: &Path, list: &PositionList) -> String {
    let mut lines = vec![
        "=== Position List Generation Summary ===".to_owned(),
        format!("Output file: {}", out_path.display()),
        format!("Total positions: {}", list.entries.len()),
    ];
    if !list.skipped.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "Skipped {} non-standard residues:",
            list.skipped.len()
        ));
        lines.extend(list.skipped.iter().take(5).map(|s| format!("  - {}", s)));
        if list.skipped.len() > 5 {
            lines.push(format!("  ... and {} more", list.skipped.len() - 5));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdb::spans::parse_spans;

    const PDB: &str = "\
ATOM      1  CA  GLY H  31      11.000  10.000  10.000  1.00 20.00           C
ATOM      2  CA  PHE H  32      11.000  10.000  10.000  1.00 20.00           C
ATOM      3  CA  UNK H  33      11.000  10.000  10.000  1.00 20.00           C
ATOM      4  CA  SER H  34      11.000  10.000  10.000  1.00 20.00           C
HETATM    5  O   HOH H  35      11.000  10.000  10.000  1.00 20.00           O
ATOM      6  CA  ARG L  50      11.000  10.000  10.000  1.00 20.00           C
";

    fn structure() -> Structure {
        Structure::from_pdb_str(PDB).unwrap()
    }

    #[test]
    fn mutatex_skips_non_standard_by_default() {
        let spans = parse_spans(&["H:31-40", "L:50-50", "Q:1-2"]).unwrap();
        let list = mutatex_positions(&structure(), &spans, false);
        assert_eq!(list.entries, vec!["GH31", "FH32", "SH34", "RL50"]);
        assert_eq!(list.skipped, vec!["UNK at H33"]);
    }

    #[test]
    fn mutatex_can_include_non_standard_as_x() {
        let spans = parse_spans(&["H:32-33"]).unwrap();
        let list = mutatex_positions(&structure(), &spans, true);
        assert_eq!(list.entries, vec!["FH32", "XH33"]);
        assert!(list.skipped.is_empty());
    }

    #[test]
    fn rosetta_entries_carry_move_chain() {
        let spans = parse_spans(&["H:31-33"]).unwrap();
        let list = rosetta_positions(&structure(), &spans, "L");
        assert_eq!(list.entries, vec!["H.G.31 L", "H.F.32 L"]);
    }

    #[test]
    fn append_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("position_list.txt");
        write_position_list(&path, &["GH31".into()], false).unwrap();
        write_position_list(&path, &["FH32".into()], true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "GH31\nFH32\n");
        write_position_list(&path, &["SH34".into()], false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "SH34\n");
    }

    #[test]
    fn residue_types_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("residues.txt");
        write_residue_types(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 20);
        assert!(text.starts_with("A\nC\nD\n"));
    }

    #[test]
    fn summary_truncates_skipped() {
        let list = PositionList {
            entries: vec!["GH31".into()],
            skipped: (0..7).map(|i| format!("UNK at H{}", i)).collect(),
        };
        let text = summary(Path::new("out.txt"), &list);
        assert!(text.contains("Total positions: 1"));
        assert!(text.contains("Skipped 7 non-standard residues:"));
        assert!(text.contains("  - UNK at H4"));
        assert!(!text.contains("UNK at H5\n"));
        assert!(text.ends_with("  ... and 2 more"));
    }
}
