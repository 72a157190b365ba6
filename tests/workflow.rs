//! End-to-end runs over a small two-chain antibody fragment.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Command;

use mutkit_rs::{
    ddg::aggregate,
    find_spans_in_structure,
    pdb::spans::parse_spans,
    positions::{convert, lists},
    Structure,
};
use tempfile::TempDir;

/// Heavy chain GFTFSRAS at 31-38, light chain RAS at 50-52 plus a ligand.
fn write_pdb(dir: &Path) -> PathBuf {
    let residues = [
        ("GLY", 'H', 31),
        ("PHE", 'H', 32),
        ("THR", 'H', 33),
        ("PHE", 'H', 34),
        ("SER", 'H', 35),
        ("ARG", 'H', 36),
        ("ALA", 'H', 37),
        ("SER", 'H', 38),
        ("ARG", 'L', 50),
        ("ALA", 'L', 51),
        ("SER", 'L', 52),
    ];
    let mut text = String::from("HEADER    TEST FRAGMENT\n");
    for (i, (name, chain, num)) in residues.iter().enumerate() {
        for (j, atom) in ["N", "CA", "C", "O"].iter().enumerate() {
            text.push_str(&format!(
                "ATOM  {:>5}  {:<3} {} {}{:>4}    {:>8.3}{:>8.3}{:>8.3}  1.00 20.00           {}\n",
                i * 4 + j + 1,
                atom,
                name,
                chain,
                num,
                10.0 + j as f64,
                10.0 + i as f64,
                10.0,
                &atom[..1]
            ));
        }
    }
    text.push_str(
        "HETATM   45  C1  NAG L 301      30.000  10.000  10.000  1.00 20.00           C\n",
    );
    text.push_str("END\n");

    let path = dir.join("fragment.pdb");
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn motif_to_mutatex_list() {
    let tmp = TempDir::new().unwrap();
    let structure = Structure::from_pdb_file(&write_pdb(tmp.path())).unwrap();

    let matches = find_spans_in_structure(&structure, "RAS", 0);
    let spans: Vec<String> = matches.iter().map(|m| m.span()).collect();
    assert_eq!(spans, vec!["H:36-38", "L:50-52"]);

    let list = lists::mutatex_positions(&structure, &parse_spans(&spans).unwrap(), false);
    assert_eq!(list.entries, vec!["RH36", "AH37", "SH38", "RL50", "AL51", "SL52"]);

    let out = tmp.path().join("position_list.txt");
    lists::write_position_list(&out, &list.entries, false).unwrap();

    // The same spans through the converter give the same list
    let spans_file = spans.join("\n");
    let converted = convert::convert_spans_file(Cursor::new(spans_file), &structure).unwrap();
    assert_eq!(converted, list.entries);
    assert_eq!(
        fs::read_to_string(out).unwrap().lines().collect::<Vec<_>>(),
        converted
    );
}

#[test]
fn rosetta_list_converts_back_to_mutatex() {
    let tmp = TempDir::new().unwrap();
    let structure = Structure::from_pdb_file(&write_pdb(tmp.path())).unwrap();

    let spans = parse_spans(&["H:31-34"]).unwrap();
    let rosetta = lists::rosetta_positions(&structure, &spans, "L");
    assert_eq!(rosetta.entries[0], "H.G.31 L");

    let text = rosetta.entries.join("\n");
    let mutatex = convert::convert_mutinfo(Cursor::new(text), true).unwrap();
    assert_eq!(mutatex, vec!["GH31", "FH32", "TH33", "FH34"]);
}

#[test]
fn aggregate_check_from_disk() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("ddg_mutations_aggregate.csv");
    let mut text = String::from(
        "mutation,mutation_label,position_label,state,energy_unit,score_function_name,total_score\n",
    );
    for state in ["wt", "mut", "ddg"] {
        text.push_str(&format!("H.S.35.A,S35A,S35,{state},kcal/mol,fa_talaris2014,0.5\n"));
    }
    fs::write(&path, text).unwrap();

    let report = aggregate::check_file(&path).unwrap();
    assert!(report.passed(), "{}", report);
    assert_eq!((report.rows, report.columns), (3, 7));

    assert!(aggregate::check_file(&tmp.path().join("missing.csv")).is_err());
}

fn mutkit() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mutkit"));
    cmd.env("RUST_LOG", "off");
    cmd
}

#[test]
fn find_spans_exit_codes() {
    let tmp = TempDir::new().unwrap();
    let pdb = write_pdb(tmp.path());

    let out = mutkit()
        .args(["find-spans", "-p"])
        .arg(&pdb)
        .args(["-s", "gftx", "--fuzzy", "1"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Invalid character in query sequence"));

    let out = mutkit()
        .args(["find-spans", "-p"])
        .arg(&pdb)
        .args(["-s", "GFTW", "--fuzzy", "1"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Found 1 match(es):"));
    assert!(stdout.contains("H:31-34 (1 mismatch)"));

    let out = mutkit()
        .args(["find-spans", "-p"])
        .arg(&pdb)
        .args(["-s", "WWWW"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn find_spans_over_several_files() {
    let tmp = TempDir::new().unwrap();
    let hit = write_pdb(tmp.path());
    let miss = tmp.path().join("poly_ala.pdb");
    fs::write(
        &miss,
        "ATOM      1  CA  ALA A   1      10.000  10.000  10.000  1.00 20.00           C\n\
         ATOM      2  CA  ALA A   2      11.000  10.000  10.000  1.00 20.00           C\n\
         ATOM      3  CA  ALA A   3      12.000  10.000  10.000  1.00 20.00           C\n",
    )
    .unwrap();

    let out = mutkit()
        .args(["find-spans", "-p"])
        .arg(&miss)
        .arg(&hit)
        .args(["-s", "RAS"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    let no_match = stdout.find("No match found for sequence 'RAS'").unwrap();
    let header = stdout.find(&format!("{}:", hit.display())).unwrap();
    assert!(no_match < header);
    assert!(stdout.contains("Found 2 match(es):"));
    assert!(stdout.contains("H:36-38\nL:50-52"));

    let out = mutkit()
        .args(["find-spans", "-p"])
        .arg(&miss)
        .arg(&hit)
        .args(["-s", "WWW"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert_eq!(
        String::from_utf8_lossy(&out.stdout)
            .matches("No match found")
            .count(),
        2
    );
}

#[test]
fn convert_stats_only() {
    let tmp = TempDir::new().unwrap();
    let mutinfo = tmp.path().join("mutinfo.txt");
    fs::write(&mutinfo, "H.S.35.A\nH-S35G\nL.R.50.A\n").unwrap();

    let out = mutkit()
        .args(["convert", "--stats-only", "-i"])
        .arg(&mutinfo)
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Total positions: 2"));
    assert!(stdout.contains("  Chain H: 1 positions"));
    assert!(!stdout.contains("Output file"));
}
