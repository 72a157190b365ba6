use crate::{
    common::residues::validate_query,
    ddg::{
        aggregate,
        plots::{self, PlotOptions, PlotSet, PlotStatus, DEFAULT_PLOT_COMMAND},
        replicas::{self, ReplicaCheck, DEFAULT_NSTRUCT},
    },
    node::status,
    pdb::{
        parsing::Structure,
        search::{find_spans_in_structure, search_files, write_matches_csv, write_matches_pickle},
        spans::{dedup_preserving_order, parse_spans, validate_spans},
    },
    positions::{convert, interactive, lists},
    MutkitError,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pretty_env_logger::env_logger::DEFAULT_FILTER_ENV;
use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
    process::ExitCode,
};

#[derive(Debug, Subcommand)]
enum Commands {
    /// Find spans in PDB chains matching a 1-letter amino acid query
    #[clap(arg_required_else_help = true)]
    FindSpans {
        /// Input PDB file(s)
        #[clap(long, short = 'p', required = true, num_args = 1..)]
        pdb: Vec<PathBuf>,
        /// Query sequence in 1-letter codes, e.g. EVQLVQ
        #[clap(long, short = 's')]
        sequence: String,
        /// Allow up to N mismatches (0 = exact match)
        #[clap(long, default_value_t = 0)]
        fuzzy: usize,
        /// Also write all matches to a CSV table
        #[clap(long)]
        csv: Option<PathBuf>,
        /// Also write all matches to a Python pickle
        #[clap(long)]
        pickle: Option<PathBuf>,
    },
    /// Generate a MutateX position list from spans, motif searches or interactively
    #[clap(arg_required_else_help = true)]
    MutatexPositions {
        /// Input PDB file
        #[clap(long, short = 'p')]
        pdb: PathBuf,
        /// Residue spans to include, e.g. A:30-37 B:50-60
        #[clap(long, short = 's', num_args = 1..)]
        spans: Vec<String>,
        /// Sequence motif to search; repeat for several motifs
        #[clap(long, short = 'q')]
        query: Vec<String>,
        /// Allow up to N mismatches in motif searches
        #[clap(long, default_value_t = 0)]
        fuzzy: usize,
        /// Select spans interactively
        #[clap(long, short = 'i', action)]
        interactive: bool,
        /// Output position list
        #[clap(long, short = 'o', default_value = "position_list.txt")]
        output: PathBuf,
        /// Include non-standard residues as 'X'
        #[clap(long, action)]
        include_non_standard: bool,
        /// Append to the output file instead of overwriting
        #[clap(long, action)]
        append_output: bool,
        /// Validate spans against the structure and print warnings
        #[clap(long, action)]
        validate: bool,
    },
    /// Generate RosettaDDG position and residue-type lists for saturation mutagenesis
    #[clap(arg_required_else_help = true)]
    RosettaInputs {
        /// Input PDB file
        #[clap(long, short = 'p')]
        pdb: PathBuf,
        /// Residue spans to include, e.g. A:30-37 B:50-60
        #[clap(long, short = 's', required = true, num_args = 1..)]
        spans: Vec<String>,
        /// Chain moved away from the interface (Flex ddG)
        #[clap(long, short = 'm')]
        movechain: String,
        /// Output position list
        #[clap(long, short = 'o', default_value = "positions.txt")]
        output: PathBuf,
        /// Output residue-type list
        #[clap(long, short = 'r', default_value = "residues.txt")]
        residues: PathBuf,
        /// Don't write the residue-type list
        #[clap(long, action)]
        no_residues: bool,
    },
    /// Convert RosettaDDG mutinfo (or a spans file) to a MutateX position list
    #[clap(arg_required_else_help = true)]
    Convert {
        /// mutinfo.txt or spans file
        #[clap(long, short = 'i')]
        input: PathBuf,
        /// Output position list
        #[clap(long, short = 'o')]
        output: Option<PathBuf>,
        /// PDB file, required with --spans
        #[clap(long, short = 'p')]
        pdb: Option<PathBuf>,
        /// Input is a chain:start-end spans file
        #[clap(long, action)]
        spans: bool,
        /// Keep duplicate positions
        #[clap(long, action)]
        keep_duplicates: bool,
        /// Only print statistics
        #[clap(long, action)]
        stats_only: bool,
    },
    /// Find Flex ddG mutations with missing replicas, clean mutinfo and write a redo list
    MissingReplicas {
        /// Path to the flexddg directory
        #[clap(long, default_value = "flexddg")]
        flex: PathBuf,
        /// Expected replicas per mutation
        #[clap(long, default_value_t = DEFAULT_NSTRUCT)]
        nstruct: usize,
        /// mutinfo file name inside --flex
        #[clap(long, default_value = "mutinfo.txt")]
        mutinfo: String,
        /// Overwrite mutinfo in place (original kept as .bak)
        #[clap(long, action)]
        inplace: bool,
        /// Output file for <mut_id>:<replica> entries
        #[clap(long, default_value = "missing_replicas.txt")]
        log: PathBuf,
    },
    /// Diagnose an aggregate ddG CSV before plotting
    CheckAggregate {
        #[clap(default_value = "ddg_mutations_aggregate.csv")]
        file: PathBuf,
    },
    /// Generate every ddG plot type through the external plotting command
    Plots {
        /// Aggregate CSV file
        #[clap(long, short = 'i', default_value = "ddg_mutations_aggregate.csv")]
        input: PathBuf,
        /// Output directory for plots
        #[clap(long, short = 'o', default_value = "plots")]
        output_dir: PathBuf,
        /// Base path holding config_plot/ and config_aggregate/
        #[clap(long, default_value = "RosettaDDGPrediction")]
        config_base_path: PathBuf,
        /// Structures CSV used by dg_swarmplot
        #[clap(long, default_value = "ddg_mutations_structures.csv")]
        structures_file: PathBuf,
        /// YAML plot set replacing the built-in one
        #[clap(long)]
        plot_set: Option<PathBuf>,
        /// Plotting executable
        #[clap(long, default_value = DEFAULT_PLOT_COMMAND)]
        plotter: String,
    },
    /// Summarise a fixed-width host status report (stdin if no file is given)
    NodeReport { file: Option<PathBuf> },
}

#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    pub command: Commands,

    /// Verbose output. See more with e.g. RUST_LOG=Trace
    #[clap(long, short = 'v', action, global = true)]
    pub verbose: bool,
}

pub fn do_main() -> Result<ExitCode> {
    let args = Args::parse();
    if std::env::var(DEFAULT_FILTER_ENV).is_err() {
        std::env::set_var(
            DEFAULT_FILTER_ENV,
            if args.verbose { "Debug" } else { "Info" },
        );
    }
    pretty_env_logger::init();

    match args.command {
        Commands::FindSpans {
            pdb,
            sequence,
            fuzzy,
            csv,
            pickle,
        } => find_spans(pdb, &sequence, fuzzy, csv, pickle),
        Commands::MutatexPositions {
            pdb,
            spans,
            query,
            fuzzy,
            interactive,
            output,
            include_non_standard,
            append_output,
            validate,
        } => mutatex_positions(MutatexArgs {
            pdb,
            spans,
            query,
            fuzzy,
            interactive,
            output,
            include_non_standard,
            append_output,
            validate,
        }),
        Commands::RosettaInputs {
            pdb,
            spans,
            movechain,
            output,
            residues,
            no_residues,
        } => rosetta_inputs(pdb, &spans, &movechain, output, (!no_residues).then_some(residues)),
        Commands::Convert {
            input,
            output,
            pdb,
            spans,
            keep_duplicates,
            stats_only,
        } => convert_positions(input, output, pdb, spans, keep_duplicates, stats_only),
        Commands::MissingReplicas {
            flex,
            nstruct,
            mutinfo,
            inplace,
            log,
        } => {
            let check = ReplicaCheck {
                flex_dir: flex,
                nstruct,
                mutinfo,
                inplace,
                redo_list: log,
            };
            replicas::run(&check)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::CheckAggregate { file } => check_aggregate(file),
        Commands::Plots {
            input,
            output_dir,
            config_base_path,
            structures_file,
            plot_set,
            plotter,
        } => {
            let set = match plot_set {
                Some(path) => PlotSet::from_yaml_file(&path)
                    .with_context(|| format!("reading plot set {}", path.display()))?,
                None => PlotSet::default(),
            };
            let opts = PlotOptions {
                input,
                output_dir,
                config_base: config_base_path,
                structures: structures_file,
                command: plotter,
            };
            run_plots(&set, &opts)
        }
        Commands::NodeReport { file } => {
            let data = match file {
                Some(path) => status::read_fixed_format(BufReader::new(
                    File::open(&path).with_context(|| format!("opening {}", path.display()))?,
                ))?,
                None => status::read_fixed_format(io::stdin().lock())?,
            };
            println!("{}", status::human_readable_report(&data));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_structure(path: &Path) -> Result<Structure> {
    Structure::from_pdb_file(path).with_context(|| format!("loading PDB file {}", path.display()))
}

fn find_spans(
    pdb: Vec<PathBuf>,
    sequence: &str,
    fuzzy: usize,
    csv: Option<PathBuf>,
    pickle: Option<PathBuf>,
) -> Result<ExitCode> {
    let query = match validate_query(sequence) {
        Ok(query) => query,
        Err(err) => {
            println!("Error: {}", err);
            return Ok(ExitCode::from(1));
        }
    };

    let mut found = Vec::new();
    for file in search_files(&pdb, &query, fuzzy) {
        let matches = file
            .matches
            .with_context(|| format!("searching {}", file.path.display()))?;
        if matches.is_empty() {
            println!(
                "No match found for sequence '{}' in {} (max mismatches: {})",
                query,
                file.path.display(),
                fuzzy
            );
            continue;
        }
        if pdb.len() > 1 {
            println!("{}:", file.path.display());
        }
        println!("Found {} match(es):", matches.len());
        for m in &matches {
            println!("{}{}", m.span(), m.mismatch_note());
        }
        found.push((file.path.display().to_string(), matches));
    }

    if let Some(path) = csv {
        write_matches_csv(&path, &found)?;
        log::info!("Wrote match table to {}", path.display());
    }
    if let Some(path) = pickle {
        write_matches_pickle(&path, &found)?;
        log::info!("Wrote pickled matches to {}", path.display());
    }

    if found.is_empty() {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

struct MutatexArgs {
    pdb: PathBuf,
    spans: Vec<String>,
    query: Vec<String>,
    fuzzy: usize,
    interactive: bool,
    output: PathBuf,
    include_non_standard: bool,
    append_output: bool,
    validate: bool,
}

fn mutatex_positions(args: MutatexArgs) -> Result<ExitCode> {
    log::info!("Loading PDB file: {}", args.pdb.display());
    let structure = load_structure(&args.pdb)?;
    let mut all_spans = Vec::new();

    if args.interactive {
        let stdin = io::stdin();
        all_spans.extend(interactive::select_spans(
            &structure,
            &mut stdin.lock(),
            &mut io::stdout(),
        )?);
    }

    for q in &args.query {
        println!("\nSearching for sequence: {} (max {} mismatches)", q, args.fuzzy);
        let matches = find_spans_in_structure(&structure, q, args.fuzzy);
        if matches.is_empty() {
            println!("No matches found for '{}'", q);
            continue;
        }
        println!("Found {} match(es):", matches.len());
        for m in matches {
            println!("  {} [{}]{}", m.span(), m.sequence, m.mismatch_note());
            all_spans.push(m.span());
        }
    }

    all_spans.extend(args.spans);

    if all_spans.is_empty() {
        println!("\nNo spans specified. Use -s, -q, or -i to select residues.");
        return Ok(ExitCode::from(1));
    }

    let unique = dedup_preserving_order(all_spans);
    println!(
        "\nProcessing {} unique span(s): {}",
        unique.len(),
        unique.join(", ")
    );

    let spans = match parse_spans(&unique) {
        Ok(spans) => spans,
        Err(err) => {
            println!("Error: {}", err);
            return Ok(ExitCode::from(1));
        }
    };

    if args.validate {
        let warnings = validate_spans(&structure, &spans);
        if !warnings.is_empty() {
            println!("\nValidation warnings:");
            for w in warnings {
                println!("  - {}", w);
            }
        }
    }

    let list = lists::mutatex_positions(&structure, &spans, args.include_non_standard);
    lists::write_position_list(&args.output, &list.entries, args.append_output)?;
    println!("\n{}", lists::summary(&args.output, &list));

    if list.entries.is_empty() {
        println!("\nWarning: No valid positions found!");
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn rosetta_inputs(
    pdb: PathBuf,
    spans: &[String],
    movechain: &str,
    output: PathBuf,
    residues: Option<PathBuf>,
) -> Result<ExitCode> {
    let structure = load_structure(&pdb)?;
    let spans = parse_spans(spans)?;
    for span in &spans {
        if structure.chain(&span.chain).is_none() {
            return Err(MutkitError::MissingChain(span.chain.clone()).into());
        }
    }

    let list = lists::rosetta_positions(&structure, &spans, movechain);
    lists::write_position_list(&output, &list.entries, false)?;
    println!(
        "Generated position list: {} with {} entries.",
        output.display(),
        list.entries.len()
    );

    if let Some(path) = residues {
        lists::write_residue_types(&path)?;
        println!("Generated standard 20 AA reslist file: {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn convert_positions(
    input: PathBuf,
    output: Option<PathBuf>,
    pdb: Option<PathBuf>,
    spans_mode: bool,
    keep_duplicates: bool,
    stats_only: bool,
) -> Result<ExitCode> {
    if spans_mode && pdb.is_none() {
        println!("Error: --pdb is required when using --spans mode");
        return Ok(ExitCode::from(1));
    }
    let output = match (output, stats_only) {
        (_, true) => None,
        (Some(path), false) => Some(path),
        (None, false) => {
            println!("Error: --output is required unless using --stats-only");
            return Ok(ExitCode::from(1));
        }
    };

    let reader = BufReader::new(
        File::open(&input).with_context(|| format!("opening {}", input.display()))?,
    );
    let positions = match pdb {
        Some(pdb) if spans_mode => convert::convert_spans_file(reader, &load_structure(&pdb)?)?,
        _ => convert::convert_mutinfo(reader, !keep_duplicates)?,
    };

    if let Some(path) = &output {
        lists::write_position_list(path, &positions, false)?;
    }

    let input = input.display().to_string();
    let output = output.map(|p| p.display().to_string());
    println!(
        "\n{}",
        convert::summary(&input, output.as_deref(), &positions)
    );
    Ok(ExitCode::SUCCESS)
}

fn check_aggregate(file: PathBuf) -> Result<ExitCode> {
    println!("Diagnosing CSV file: {}", file.display());
    println!("{}", "=".repeat(60));
    let report = match aggregate::check_file(&file) {
        Ok(report) => report,
        Err(err) => {
            println!("ERROR: {}", err);
            println!("\nCannot proceed with further checks - file loading failed");
            return Ok(ExitCode::from(1));
        }
    };
    println!("{}", report);
    if report.passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

fn run_plots(set: &PlotSet, opts: &PlotOptions) -> Result<ExitCode> {
    let results = plots::generate(set, opts)?;
    let generated = results
        .iter()
        .filter(|(_, status)| *status == PlotStatus::Generated)
        .count();
    println!(
        "\nPlot generation complete ({} of {} plots)! Check the '{}' directory for results.",
        generated,
        results.len(),
        opts.output_dir.display()
    );
    Ok(ExitCode::SUCCESS)
}
