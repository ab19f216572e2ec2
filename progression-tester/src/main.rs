mod reports;
mod rewrite;
mod scenarios;
mod seeds;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use progression_core::{ProgressionConfig, default_config};
use std::fs::{self, File};
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use scenarios::{LogicTester, ScenarioResult, expand_scenarios, get_scenario, list_scenarios};
use seeds::resolve_seed_inputs;
use util::split_csv;

#[derive(Debug, Parser)]
#[command(name = "progression-tester", version = "0.1.0")]
#[command(about = "QA harness for level/EV caps and seeded species substitution")]
struct Args {
    /// Scenarios to run (comma-separated; `smoke` and `all` expand)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated, decimal or 0x-prefixed hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Progression config JSON to use instead of the built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rewrite a wild-encounter JSON file instead of running scenarios
    #[arg(long, requires = "rewrite_output")]
    rewrite_encounters: Option<PathBuf>,

    /// Destination for the rewritten wild-encounter JSON
    #[arg(long, requires = "rewrite_encounters")]
    rewrite_output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    let seed_list = resolve_seed_inputs(&split_csv(&args.seeds))?;

    if let (Some(input), Some(output)) = (&args.rewrite_encounters, &args.rewrite_output) {
        let seed = seed_list.first().copied().unwrap_or(seeds::DEFAULT_SEED);
        let summary = rewrite::rewrite_encounter_file(input, output, seed)?;
        rewrite::print_summary(&summary, output);
        return Ok(());
    }

    let config = load_config(args.config.as_deref())?;

    if args.report == "console" {
        announce_banner();
    }

    let start_time = Instant::now();
    let scenario_names = expand_scenarios(&split_csv(&args.scenarios));
    let results = run_logic_scenarios(&args, &config, &scenario_names, &seed_list);

    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:25} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎮 Progression Core Tester".bright_cyan().bold());
    println!("{}", "==========================".cyan());
}

fn load_config(path: Option<&Path>) -> Result<ProgressionConfig> {
    let Some(path) = path else {
        return Ok(default_config().clone());
    };
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let config = ProgressionConfig::from_json(&raw)
        .with_context(|| format!("invalid progression config {}", path.display()))?;
    log::info!("loaded progression config from {}", path.display());
    Ok(config)
}

fn run_logic_scenarios(
    args: &Args,
    config: &ProgressionConfig,
    scenario_names: &[String],
    seed_list: &[u64],
) -> Vec<ScenarioResult> {
    let tester = LogicTester::new(config, args.verbose);
    let mut results = Vec::new();

    if args.report == "console" {
        println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
        println!("{}", "-".repeat(30).yellow());
    }

    for name in scenario_names {
        if let Some(scenario) = get_scenario(name) {
            results.push(tester.run_scenario(scenario, seed_list));
        } else {
            eprintln!("⚠️  Unknown scenario: {}", name.yellow());
        }
    }

    results
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut output_target, results)?,
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Progression Logic Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        _ => {
            let duration = start_time.elapsed();
            if results.is_empty() {
                writeln!(&mut output_target, "No logic scenarios executed.")?;
            } else {
                reports::generate_console_report(&mut output_target, results, duration)?;
            }
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
