// SPDX-License-Identifier: MIT OR Apache-2.0
//! Weave - command line runner for circuit packages
//!
//! Loads a saved package, drives its inputs and ticks it, printing the
//! package outputs and any node faults after every tick. Also lists the
//! element palette and summarizes a package's evaluation schedule.

use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use weave_graph::{Element, EngineConfig, Package, Registry, TickReport, Value, ValueType};

/// Run and inspect Weave packages
#[derive(Parser, Debug)]
#[command(name = "weave", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a package and tick it
    Run {
        /// Package file (RON)
        #[arg(value_name = "PACKAGE")]
        package: PathBuf,

        /// Number of ticks to run
        #[arg(short, long, default_value_t = 1)]
        ticks: usize,

        /// Engine settings file (RON)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Override the pass budget per tick
        #[arg(long)]
        max_passes: Option<usize>,

        /// Evaluate every layer on the calling thread
        #[arg(long)]
        sequential: bool,

        /// Set a package input before the first tick (format: index=value)
        #[arg(short = 's', long = "set", value_name = "INDEX=VALUE")]
        inputs: Vec<String>,

        /// Print reports as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// List the registered element types by category
    Catalog,

    /// Load a package and print its evaluation schedule
    Check {
        /// Package file (RON)
        #[arg(value_name = "PACKAGE")]
        package: PathBuf,
    },
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::debug!("weave v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli.command) {
        tracing::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), Box<dyn Error>> {
    let registry = Registry::with_builtins()?;
    match command {
        Command::Run {
            package,
            ticks,
            config,
            max_passes,
            sequential,
            inputs,
            json,
        } => {
            let mut settings = match config {
                Some(path) => EngineConfig::load(&path)?,
                None => EngineConfig::default(),
            };
            if let Some(max) = max_passes {
                settings.max_settle_passes = max;
            }
            if sequential {
                settings.parallel = false;
            }

            let mut package = load(&package, &registry)?.with_config(settings);
            for assignment in &inputs {
                let (index, value) = parse_assignment(&package, assignment)?;
                package.set_input(index, value)?;
            }

            for tick in 1..=ticks {
                let report = package.tick();
                if json {
                    print_json(tick, &package, &report)?;
                } else {
                    print_text(tick, &package, &report);
                }
            }
            Ok(())
        }
        Command::Catalog => {
            let mut current = String::new();
            for info in registry.list() {
                let category = info.category();
                if category != current {
                    println!("{category}");
                    current = category;
                }
                println!("  {:<24} {:<12} {}", info.type_name, info.name, info.description);
            }
            Ok(())
        }
        Command::Check { package } => {
            let mut package = load(&package, &registry)?;
            let schedule = package.schedule();
            println!(
                "{}: {} nodes, {} links, {} feedback",
                package.name,
                package.node_count(),
                package.link_count(),
                schedule.feedback_count()
            );
            for (depth, layer) in schedule.layers().iter().enumerate() {
                let names: Vec<String> = layer
                    .iter()
                    .filter_map(|id| package.node(*id))
                    .map(|node| format!("{} {}", node.id(), node.name()))
                    .collect();
                println!("  layer {depth}: {}", names.join(", "));
            }
            Ok(())
        }
    }
}

fn load(path: &Path, registry: &Registry) -> Result<Package, Box<dyn Error>> {
    let package = Package::load(path, registry).map_err(|e| format!("{}: {e}", path.display()))?;
    tracing::info!(package = %package.name, nodes = package.node_count(), "loaded {}", path.display());
    Ok(package)
}

/// Parse `index=value` against the declared type of that package input
fn parse_assignment(package: &Package, assignment: &str) -> Result<(usize, Value), String> {
    let (index, raw) = assignment
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=VALUE, got '{assignment}'"))?;
    let index: usize = index
        .trim()
        .parse()
        .map_err(|_| format!("invalid input index '{index}'"))?;
    let socket = package
        .sockets()
        .input(index)
        .ok_or_else(|| format!("package has no input {index}"))?;
    let raw = raw.trim();
    let value = match socket.value_type() {
        ValueType::Bool => raw.parse().map(Value::Bool).map_err(|e| e.to_string()),
        ValueType::Int => raw.parse().map(Value::Int).map_err(|e| e.to_string()),
        ValueType::Float => raw.parse().map(Value::Float).map_err(|e| e.to_string()),
        ValueType::String => Ok(Value::String(raw.to_string())),
    }
    .map_err(|e| format!("input {index} ({}): {e}", socket.value_type()))?;
    Ok((index, value))
}

fn print_text(tick: usize, package: &Package, report: &TickReport) {
    let status = if report.is_settled() { "settled" } else { "unstable" };
    println!("tick {tick}: {status} after {} passes", report.passes());
    for (index, socket) in package.sockets().outputs().iter().enumerate() {
        let value = socket.value().map_or_else(|| "-".to_string(), ToString::to_string);
        println!("  [{index}] {} = {value}", socket.name);
    }
    for fault in &report.faults {
        println!("  fault {} {}: {}", fault.node, fault.name, fault.error);
    }
}

fn print_json(tick: usize, package: &Package, report: &TickReport) -> Result<(), serde_json::Error> {
    let outputs: Vec<serde_json::Value> = package
        .sockets()
        .outputs()
        .iter()
        .map(|socket| serde_json::json!({ "name": socket.name, "value": socket.value() }))
        .collect();
    let faults: Vec<serde_json::Value> = report
        .faults
        .iter()
        .map(|fault| serde_json::json!({ "node": fault.node.0, "name": fault.name, "error": fault.error.to_string() }))
        .collect();
    let line = serde_json::json!({
        "tick": tick,
        "settled": report.is_settled(),
        "passes": report.passes(),
        "outputs": outputs,
        "faults": faults,
    });
    println!("{}", serde_json::to_string(&line)?);
    Ok(())
}
