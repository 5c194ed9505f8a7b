use clap::{Parser, Subcommand};
use sf_document::{Document, DocumentError};
use sf_moc::{
    CancellationToken, DiscretizationConfig, DiscretizationError, SolveError, SolveOptions,
    SolveProgress,
};
use sf_network::Network;
use sf_results::{
    ResultsError, RunManifest, RunStore, RunType, SimulationResult, compute_run_id,
    export::{element_csv, series_csv},
    timestamp_now,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{info, warn};

const SOLVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("{0}")]
    Document(#[from] DocumentError),

    #[error("{0}")]
    Discretization(#[from] DiscretizationError),

    #[error("{0}")]
    Solve(#[from] SolveError),

    #[error("{0}")]
    Results(#[from] ResultsError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Cannot install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("Pipe '{name}' not found in run {run_id}")]
    UnknownPipe { name: String, run_id: String },

    #[error("No '{field}' values recorded for element '{element}' in run {run_id}")]
    UnknownElementField {
        element: String,
        field: String,
        run_id: String,
    },

    #[error("Network has {count} validation problem(s)")]
    Invalid { count: usize },
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "surgeflow")]
#[command(about = "SurgeFlow CLI - hydraulic transient simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a network document, listing every problem found
    Validate {
        /// Path to the network document (.json, .yaml or .yml)
        document: PathBuf,
    },
    /// Show the time step and reaches chosen for every pipe
    Discretize {
        document: PathBuf,
        /// Largest accepted relative wave speed adjustment
        #[arg(long, default_value_t = DiscretizationConfig::default().celerity_tolerance)]
        tolerance: f64,
        /// Upper bound on reaches per pipe
        #[arg(long, default_value_t = DiscretizationConfig::default().max_reaches)]
        max_reaches: u32,
    },
    /// Run a transient simulation
    Run {
        document: PathBuf,
        /// Simulated duration in seconds
        #[arg(long)]
        duration: f64,
        /// Force this time step in seconds
        #[arg(long)]
        dt: Option<f64>,
        /// Record every N-th step
        #[arg(long, default_value_t = 1)]
        record_every: usize,
        /// Sweep pipes on a single thread
        #[arg(long)]
        sequential: bool,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
    },
    /// List cached runs for a document
    Runs { document: PathBuf },
    /// Show details of a cached run
    ShowRun { document: PathBuf, run_id: String },
    /// Export the head and flow history of one node as CSV
    ExportSeries {
        document: PathBuf,
        run_id: String,
        /// Pipe name
        pipe: String,
        /// Node index along the pipe, 0 at the inlet
        index: u32,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export one recorded element value (e.g. a valve's opening) as CSV
    ExportElement {
        document: PathBuf,
        run_id: String,
        /// Element name
        element: String,
        /// Recorded value name, e.g. opening, level, speed_rpm
        field: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Validate { document } => cmd_validate(&document),
        Commands::Discretize {
            document,
            tolerance,
            max_reaches,
        } => cmd_discretize(&document, tolerance, max_reaches),
        Commands::Run {
            document,
            duration,
            dt,
            record_every,
            sequential,
            no_cache,
        } => {
            let options = SolveOptions {
                duration_s: duration,
                dt_override: dt,
                record_every,
                parallel: !sequential,
                ..SolveOptions::default()
            };
            cmd_run(&document, &options, !no_cache)
        }
        Commands::Runs { document } => cmd_runs(&document),
        Commands::ShowRun { document, run_id } => cmd_show_run(&document, &run_id),
        Commands::ExportSeries {
            document,
            run_id,
            pipe,
            index,
            output,
        } => cmd_export_series(&document, &run_id, &pipe, index, output.as_deref()),
        Commands::ExportElement {
            document,
            run_id,
            element,
            field,
            output,
        } => cmd_export_element(&document, &run_id, &element, &field, output.as_deref()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_network(path: &Path) -> CliResult<(Document, Network)> {
    let doc = sf_document::load(path)?;
    let network = sf_document::to_network(&doc)?;
    Ok((doc, network))
}

fn cmd_validate(path: &Path) -> CliResult<()> {
    println!("Validating document: {}", path.display());
    let doc = sf_document::load(path)?;
    let network = sf_document::build_network(&doc)?;
    let report = network.validation_report();
    if !report.is_empty() {
        println!("✗ '{}' has {} problem(s):", doc.name, report.len());
        for issue in &report {
            println!("  - {issue}");
        }
        return Err(CliError::Invalid {
            count: report.len(),
        });
    }
    println!(
        "✓ '{}' is valid ({} elements, {} connections, {} pipes)",
        doc.name,
        network.elements().len(),
        network.connections().len(),
        network.pipes().count()
    );
    Ok(())
}

fn cmd_discretize(path: &Path, tolerance: f64, max_reaches: u32) -> CliResult<()> {
    let (_, network) = load_network(path)?;
    let config = DiscretizationConfig {
        celerity_tolerance: tolerance,
        max_reaches,
    };
    let disc = sf_moc::discretize_with(&network, &config, None)?;

    println!("Global time step: {:.6} s", disc.global_dt);
    println!("Computational nodes: {}", disc.total_nodes());
    println!(
        "Largest wave speed adjustment: {:.2}%",
        disc.max_celerity_adjustment() * 100.0
    );
    println!("\nPipes:");
    for (id, grid) in &disc.pipes {
        println!(
            "  {:<12} reaches={:<3} dx={:>9.3} m  a={:>8.2} m/s  ({:+.2}%)",
            network.name_of(*id),
            grid.reaches,
            grid.dx,
            grid.celerity,
            grid.celerity_adjustment * 100.0
        );
    }
    Ok(())
}

fn cmd_run(path: &Path, options: &SolveOptions, use_cache: bool) -> CliResult<()> {
    let (doc, network) = load_network(path)?;
    println!("Running transient simulation for '{}'", doc.name);
    println!("  duration = {:.3} s", options.duration_s);

    let run_type = RunType::Transient {
        duration_s: options.duration_s,
        dt_override_s: options.dt_override,
        record_every: options.record_every,
    };
    let run_id = compute_run_id(&doc, &run_type, SOLVER_VERSION);
    let store = RunStore::for_document(path)?;

    if use_cache && store.has_run(&run_id) {
        let manifest = store.load_manifest(&run_id)?;
        if manifest.status.is_completed() {
            println!("✓ Loaded from cache: {run_id}");
            print_manifest_summary(&manifest);
            return Ok(());
        }
        info!(run_id = %run_id, "cached run did not complete, re-running");
    }

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nreceived ctrl+c - stopping after the current step");
        handler_token.cancel();
    })?;

    let started = Instant::now();
    let mut last_emit = Instant::now();
    let mut last_fraction = -1.0f64;
    let outcome = sf_moc::run_with(
        &network,
        options,
        &cancel,
        Some(&mut |p: SolveProgress| {
            let emit_now = (p.fraction - last_fraction).abs() >= 0.005
                || last_emit.elapsed().as_millis() >= 100
                || p.step == p.total_steps;
            if emit_now {
                render_progress(&p, started.elapsed().as_secs_f64());
                last_fraction = p.fraction;
                last_emit = Instant::now();
            }
        }),
    );
    clear_progress_line();
    let wall_s = started.elapsed().as_secs_f64();

    match outcome {
        Ok(result) => {
            let manifest = manifest_for(&run_id, &doc, run_type, &result);
            store.save_run(&manifest, &result)?;
            println!("✓ Simulation completed: {run_id}");
            println!("  Wall time: {wall_s:.3} s");
            print_manifest_summary(&manifest);
            Ok(())
        }
        Err(e) => {
            if let Some(partial) = e.partial() {
                let manifest = manifest_for(&run_id, &doc, run_type, partial);
                match store.save_run(&manifest, partial) {
                    Ok(()) => println!(
                        "Partial results ({} snapshots) saved as {run_id}",
                        partial.snapshots().len()
                    ),
                    Err(save_err) => warn!(error = %save_err, "could not save partial results"),
                }
            }
            Err(e.into())
        }
    }
}

fn manifest_for(
    run_id: &str,
    doc: &Document,
    run_type: RunType,
    result: &SimulationResult,
) -> RunManifest {
    RunManifest {
        run_id: run_id.to_string(),
        network_name: doc.name.clone(),
        timestamp: timestamp_now(),
        run_type,
        solver_version: SOLVER_VERSION.to_string(),
        dt_s: result.dt_s(),
        status: result.status().clone(),
        snapshot_count: result.snapshots().len(),
        layout: result.layout().clone(),
    }
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_progress(p: &SolveProgress, elapsed_s: f64) {
    let width = 28usize;
    let filled = ((p.fraction * width as f64).round() as usize).min(width);
    print!(
        "\r[{}{}] {:>6.2}%  t={:.3}s  step={}/{}  elapsed={:.1}s",
        "#".repeat(filled),
        "-".repeat(width.saturating_sub(filled)),
        p.fraction * 100.0,
        p.time_s,
        p.step,
        p.total_steps,
        elapsed_s
    );
    let _ = io::stdout().flush();
}

fn print_manifest_summary(manifest: &RunManifest) {
    println!("  Status: {:?}", manifest.status);
    println!("  Time step: {:.6} s", manifest.dt_s);
    println!("  Snapshots: {}", manifest.snapshot_count);
    println!("  Nodes: {}", manifest.layout.node_count());
}

fn cmd_runs(path: &Path) -> CliResult<()> {
    let doc = sf_document::load(path)?;
    let store = RunStore::for_document(path)?;
    let runs = store.list_runs(&doc.name)?;

    if runs.is_empty() {
        println!("No cached runs found for '{}'", doc.name);
    } else {
        println!("Cached runs for '{}':", doc.name);
        for manifest in runs {
            let RunType::Transient { duration_s, .. } = manifest.run_type;
            println!(
                "  {} ({})  duration={duration_s} s  {:?}",
                manifest.run_id, manifest.timestamp, manifest.status
            );
        }
    }
    Ok(())
}

fn cmd_show_run(path: &Path, run_id: &str) -> CliResult<()> {
    println!("Loading run: {run_id}");
    let store = RunStore::for_document(path)?;
    let (manifest, result) = store.load_run(run_id)?;

    println!("\nRun Summary:");
    println!("  Network: {}", manifest.network_name);
    println!("  Created: {}", manifest.timestamp);
    println!("  Solver: {}", manifest.solver_version);
    print_manifest_summary(&manifest);
    if let (Some(first), Some(last)) = (result.snapshots().first(), result.final_snapshot()) {
        println!("  Time range: {:.3} - {:.3} s", first.time_s, last.time_s);
    }

    println!("\nPipes:");
    for pipe in &result.layout().pipes {
        let last = (pipe.nodes - 1) as u32;
        let max = result.max_head(pipe.pipe, last)?.unwrap_or(f64::NAN);
        let min = result.min_head(pipe.pipe, last)?.unwrap_or(f64::NAN);
        println!(
            "  {:<12} nodes={:<3} outlet head {min:.2} .. {max:.2} m",
            pipe.name, pipe.nodes
        );
    }

    if let Some(last) = result.final_snapshot()
        && !last.elements.is_empty()
    {
        println!("\nElements at t = {:.3} s:", last.time_s);
        for e in &last.elements {
            let values: Vec<String> = e.values.iter().map(|(k, v)| format!("{k}={v:.4}")).collect();
            println!("  {:<12} {:<16} {}", e.name, e.kind, values.join("  "));
        }
    }
    Ok(())
}

fn cmd_export_series(
    path: &Path,
    run_id: &str,
    pipe: &str,
    index: u32,
    output: Option<&Path>,
) -> CliResult<()> {
    let store = RunStore::for_document(path)?;
    let (_, result) = store.load_run(run_id)?;
    let layout = result
        .layout()
        .pipe_by_name(pipe)
        .ok_or_else(|| CliError::UnknownPipe {
            name: pipe.to_string(),
            run_id: run_id.to_string(),
        })?;
    let samples = result.node_series(layout.pipe, index)?;
    let csv = series_csv(&samples);

    if let Some(out) = output {
        std::fs::write(out, csv)?;
        println!("✓ Exported {} data points to {}", samples.len(), out.display());
    } else {
        print!("{csv}");
    }
    Ok(())
}

fn cmd_export_element(
    path: &Path,
    run_id: &str,
    element: &str,
    field: &str,
    output: Option<&Path>,
) -> CliResult<()> {
    let store = RunStore::for_document(path)?;
    let (_, result) = store.load_run(run_id)?;
    let samples = result.element_series(element, field);
    if samples.is_empty() {
        return Err(CliError::UnknownElementField {
            element: element.to_string(),
            field: field.to_string(),
            run_id: run_id.to_string(),
        });
    }
    let csv = element_csv(field, &samples);

    if let Some(out) = output {
        std::fs::write(out, csv)?;
        println!("✓ Exported {} data points to {}", samples.len(), out.display());
    } else {
        print!("{csv}");
    }
    Ok(())
}
