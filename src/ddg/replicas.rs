//! Flex ddG runs with incomplete replicas.
//!
//! A replica `r` of mutation `m` is complete when `<flex>/<m>/<r>/ddg.db3` exists.
//! Mutations with any missing replica are dropped from mutinfo and listed in a redo
//! file as `<mut_id>:<replica>`.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::errors::{MutkitError, Result};

pub const DEFAULT_NSTRUCT: usize = 35;

#[derive(Debug, Clone)]
pub struct ReplicaCheck {
    pub flex_dir: PathBuf,
    pub nstruct: usize,
    pub mutinfo: String,
    pub inplace: bool,
    pub redo_list: PathBuf,
}

impl Default for ReplicaCheck {
    fn default() -> Self {
        Self {
            flex_dir: PathBuf::from("flexddg"),
            nstruct: DEFAULT_NSTRUCT,
            mutinfo: "mutinfo.txt".to_owned(),
            inplace: false,
            redo_list: PathBuf::from("missing_replicas.txt"),
        }
    }
}

#[derive(Debug, Default)]
pub struct ReplicaReport {
    /// Missing replica numbers keyed by mutation id
    pub missing: BTreeMap<String, Vec<usize>>,
    /// Where the cleaned mutinfo went, if anything was removed
    pub cleaned: Option<PathBuf>,
    pub backup: Option<PathBuf>,
}

impl ReplicaReport {
    pub fn missing_replica_count(&self) -> usize {
        self.missing.values().map(Vec::len).sum()
    }
}

/// Replica numbers in `1..=nstruct` lacking a `ddg.db3`.
pub fn missing_replicas(mut_dir: &Path, nstruct: usize) -> Vec<usize> {
    if !mut_dir.is_dir() {
        log::debug!("Missing entire directory for {}", mut_dir.display());
        return (1..=nstruct).collect();
    }
    (1..=nstruct)
        .filter(|rep| !mut_dir.join(rep.to_string()).join("ddg.db3").is_file())
        .collect()
}

pub fn run(check: &ReplicaCheck) -> Result<ReplicaReport> {
    if !check.flex_dir.is_dir() {
        return Err(MutkitError::missing("flex directory", &check.flex_dir));
    }
    let mutinfo_path = check.flex_dir.join(&check.mutinfo);
    if !mutinfo_path.is_file() {
        return Err(MutkitError::missing("mutinfo file", &mutinfo_path));
    }
    log::info!("Expecting {} replica(s) per mutation", check.nstruct);

    let contents = fs::read_to_string(&mutinfo_path)?;
    let lines: Vec<&str> = contents.lines().filter(|l| !l.trim().is_empty()).collect();
    log::info!("Processing {} mutations from {}...", lines.len(), check.mutinfo);

    let checked: Vec<(&str, Option<(String, Vec<usize>)>)> = lines
        .par_iter()
        .map(|&line| {
            let cols: Vec<&str> = line.split(',').collect();
            if cols.len() < 2 {
                log::warn!("Skipping malformed mutinfo line: {}", line);
                return (line, None);
            }
            let mut_id = cols[1].to_owned();
            let reps = missing_replicas(&check.flex_dir.join(&mut_id), check.nstruct);
            (line, Some((mut_id, reps)))
        })
        .collect();

    let mut report = ReplicaReport::default();
    let mut keep = Vec::new();
    for (line, result) in checked {
        match result {
            Some((mut_id, reps)) if !reps.is_empty() => {
                report.missing.entry(mut_id).or_default().extend(reps);
            }
            Some(_) => keep.push(line),
            None => {}
        }
    }
    for reps in report.missing.values_mut() {
        reps.sort_unstable();
        reps.dedup();
    }

    // Always rewrite the redo list so a stale one is never picked up.
    let mut redo = BufWriter::new(fs::File::create(&check.redo_list)?);
    for (mut_id, reps) in &report.missing {
        for rep in reps {
            writeln!(redo, "{}:{}", mut_id, rep)?;
        }
    }
    redo.flush()?;

    if report.missing.is_empty() {
        log::info!(
            "All mutations have the expected {} replicas - no action needed.",
            check.nstruct
        );
        log::info!("Created empty redo list file: {}", check.redo_list.display());
        return Ok(report);
    }

    log::info!(
        "Detected {} mutation(s) with incomplete replicas.",
        report.missing.len()
    );
    log::info!(
        "Wrote redo list ({} entries) to {}",
        report.missing_replica_count(),
        check.redo_list.display()
    );

    let cleaned = if check.inplace {
        let backup = mutinfo_path.with_extension("bak");
        log::info!("Backing up original mutinfo to {}", backup.display());
        fs::rename(&mutinfo_path, &backup)?;
        report.backup = Some(backup);
        mutinfo_path
    } else {
        mutinfo_path.with_extension("cleaned.txt")
    };

    let mut out = BufWriter::new(fs::File::create(&cleaned)?);
    for line in keep {
        writeln!(out, "{}", line)?;
    }
    out.flush()?;
    log::info!("Wrote cleaned mutinfo to {}", cleaned.display());
    report.cleaned = Some(cleaned);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch_replicas(flex: &Path, mut_id: &str, reps: impl IntoIterator<Item = usize>) {
        for rep in reps {
            let dir = flex.join(mut_id).join(rep.to_string());
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("ddg.db3"), b"").unwrap();
        }
    }

    #[test]
    fn reports_partial_and_absent_mutations() {
        let tmp = tempfile::tempdir().unwrap();
        let flex = tmp.path().join("flexddg");
        fs::create_dir_all(&flex).unwrap();
        fs::write(
            flex.join("mutinfo.txt"),
            "1,H.S.31.A,x\n2,H.S.31.G,x\nbroken\n\n3,H.F.32.A,x\n",
        )
        .unwrap();
        touch_replicas(&flex, "H.S.31.A", 1..=3);
        touch_replicas(&flex, "H.S.31.G", [1, 3]);

        let check = ReplicaCheck {
            flex_dir: flex.clone(),
            nstruct: 3,
            redo_list: tmp.path().join("redo.txt"),
            ..Default::default()
        };
        let report = run(&check).unwrap();

        assert_eq!(report.missing["H.S.31.G"], vec![2]);
        assert_eq!(report.missing["H.F.32.A"], vec![1, 2, 3]);
        assert_eq!(report.missing_replica_count(), 4);

        let redo = fs::read_to_string(tmp.path().join("redo.txt")).unwrap();
        assert_eq!(redo, "H.F.32.A:1\nH.F.32.A:2\nH.F.32.A:3\nH.S.31.G:2\n");

        let cleaned = flex.join("mutinfo.cleaned.txt");
        assert_eq!(report.cleaned.as_deref(), Some(cleaned.as_path()));
        assert_eq!(fs::read_to_string(cleaned).unwrap(), "1,H.S.31.A,x\n");
    }

    #[test]
    fn inplace_keeps_a_backup() {
        let tmp = tempfile::tempdir().unwrap();
        let flex = tmp.path().to_path_buf();
        fs::write(flex.join("mutinfo.txt"), "1,A,x\n2,B,x\n").unwrap();
        touch_replicas(&flex, "A", [1]);

        let check = ReplicaCheck {
            flex_dir: flex.clone(),
            nstruct: 1,
            inplace: true,
            redo_list: tmp.path().join("redo.txt"),
            ..Default::default()
        };
        run(&check).unwrap();

        assert_eq!(fs::read_to_string(flex.join("mutinfo.txt")).unwrap(), "1,A,x\n");
        assert_eq!(fs::read_to_string(flex.join("mutinfo.bak")).unwrap(), "1,A,x\n2,B,x\n");
    }

    #[test]
    fn complete_run_writes_empty_redo_list() {
        let tmp = tempfile::tempdir().unwrap();
        let flex = tmp.path().to_path_buf();
        fs::write(flex.join("mutinfo.txt"), "1,A,x\n").unwrap();
        touch_replicas(&flex, "A", [1, 2]);
        let redo = tmp.path().join("redo.txt");
        fs::write(&redo, "stale\n").unwrap();

        let check = ReplicaCheck {
            flex_dir: flex.clone(),
            nstruct: 2,
            redo_list: redo.clone(),
            ..Default::default()
        };
        let report = run(&check).unwrap();
        assert!(report.missing.is_empty());
        assert!(report.cleaned.is_none());
        assert_eq!(fs::read_to_string(redo).unwrap(), "");
        assert!(!flex.join("mutinfo.cleaned.txt").exists());
    }

    #[test]
    fn missing_inputs_are_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let check = ReplicaCheck {
            flex_dir: tmp.path().join("nope"),
            ..Default::default()
        };
        assert!(matches!(run(&check), Err(MutkitError::MissingPath { kind: "flex directory", .. })));

        let check = ReplicaCheck {
            flex_dir: tmp.path().to_path_buf(),
            ..Default::default()
        };
        assert!(matches!(run(&check), Err(MutkitError::MissingPath { kind: "mutinfo file", .. })));
    }
}
