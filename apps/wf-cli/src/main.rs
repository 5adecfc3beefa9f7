use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use wf_core::{days, to_bar, to_days, to_m3_per_day};
use wf_sim::StepReport;

#[derive(Parser)]
#[command(name = "wf-cli")]
#[command(about = "wellflow CLI - coupled well and reservoir simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate case file syntax and structure, then build its models
    Validate {
        /// Path to the case YAML file
        case_path: PathBuf,
    },
    /// Run a case
    Run {
        /// Path to the case YAML file
        case_path: PathBuf,
        /// Override the time step in days
        #[arg(long)]
        dt_days: Option<f64>,
        /// Override the simulated duration in days
        #[arg(long)]
        t_end_days: Option<f64>,
        /// Print step reports as JSON (SI units)
        #[arg(long)]
        json: bool,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Case(#[from] wf_case::CaseError),

    #[error(transparent)]
    Sim(#[from] wf_sim::SimError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

type CliResult<T> = Result<T, CliError>;

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { case_path } => cmd_validate(&case_path),
        Commands::Run {
            case_path,
            dt_days,
            t_end_days,
            json,
            output,
        } => cmd_run(&case_path, dt_days, t_end_days, json, output.as_deref()),
    }
}

fn cmd_validate(case_path: &Path) -> CliResult<()> {
    println!("Validating case: {}", case_path.display());
    let case = wf_case::load_yaml(case_path)?;
    let sim = case.build()?;
    println!("✓ Case '{}' is valid", case.name);
    println!("  Cells: {}", case.reservoir.cells.len());
    println!("  Wells: {}", sim.wells().len());
    Ok(())
}

fn cmd_run(
    case_path: &Path,
    dt_days: Option<f64>,
    t_end_days: Option<f64>,
    json: bool,
    output: Option<&Path>,
) -> CliResult<()> {
    let case = wf_case::load_yaml(case_path)?;
    let mut options = case.schedule.to_options();
    if let Some(dt) = dt_days {
        options.dt = days(dt).value;
        options.min_dt = options.min_dt.min(options.dt);
    }
    if let Some(t_end) = t_end_days {
        options.t_end = days(t_end).value;
    }

    let mut sim = case.build()?;
    let start = Instant::now();
    let reports = sim.run(&options)?;
    info!(
        steps = reports.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "run finished"
    );

    let text = if json {
        serde_json::to_string_pretty(&reports)?
    } else {
        render_table(&reports)
    };
    match output {
        Some(path) => std::fs::write(path, text)?,
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{text}")?;
        }
    }
    Ok(())
}

fn step_columns(r: &StepReport) -> String {
    format!(
        "{:>5} {:>9.3} {:>7.3} {:>4} {:>9.2}",
        r.step,
        to_days(r.time),
        to_days(r.dt),
        r.newton_iterations,
        to_bar(r.average_pressure)
    )
}

fn render_table(reports: &[StepReport]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>5} {:>9} {:>7} {:>4} {:>9}  {:<8} {:<5} {:>9} {:>10} {:>10} {:>10}\n",
        "step",
        "time[d]",
        "dt[d]",
        "it",
        "p[bar]",
        "well",
        "mode",
        "bhp[bar]",
        "qw[m3/d]",
        "qo[m3/d]",
        "qg[m3/d]"
    ));
    for r in reports {
        if r.wells.is_empty() {
            out.push_str(&step_columns(r));
            out.push('\n');
        }
        for (i, w) in r.wells.iter().enumerate() {
            let head = if i == 0 {
                step_columns(r)
            } else {
                " ".repeat(38)
            };
            let [qw, qo, qg] = w.surface_rates.map(to_m3_per_day);
            out.push_str(&format!(
                "{head}  {:<8} {:<5} {:>9.2} {:>10.2} {:>10.2} {:>10.2}\n",
                w.name,
                format!("{:?}", w.mode).to_lowercase(),
                to_bar(w.bhp),
                qw,
                qo,
                qg
            ));
        }
    }
    out
}
