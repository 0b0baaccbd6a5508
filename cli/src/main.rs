//! Coemploy CLI: run co-employment projections over saved affiliation graphs
//!
//! A partitioned run is either driven slice by slice (`project` once per
//! slice, possibly on different machines, then `merge`) or all at once with
//! `run`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use coemploy::graph::{GraphStore, NodeKind};
use coemploy::partition::{PartialStore, PartitionCoordinator};
use coemploy::persistence::{load_graph, save_graph};
use coemploy::{ProjectionStats, RunConfig};
use comfy_table::{ContentArrangement, Table};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type Graph = GraphStore<u64>;

#[derive(Parser)]
#[command(name = "coemploy", version, about = "Co-employment network projection")]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Project one slice of the worker universe and write its partial result
    Project {
        partition_index: usize,
        partition_count: usize,
        /// Last year considered (inclusive)
        max_year: i32,
        /// Minimum overlapping days, -1 for any shared employer
        #[arg(allow_negative_numbers = true)]
        min_days_together: i64,

        /// Affiliation graph
        #[arg(long)]
        input: PathBuf,

        /// Directory for partial results
        #[arg(long)]
        out_dir: PathBuf,

        #[arg(long)]
        min_year: Option<i32>,

        /// YAML run configuration; positional arguments take precedence
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Merge every partial result of a run into one graph
    Merge {
        #[arg(long)]
        out_dir: PathBuf,

        #[arg(long)]
        partition_count: usize,

        #[arg(long)]
        output: PathBuf,
    },
    /// Run every slice locally, then merge
    Run {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        /// Directory for partial results (default: next to the output)
        #[arg(long)]
        work_dir: Option<PathBuf>,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        partition_count: Option<usize>,

        #[arg(long)]
        max_year: Option<i32>,

        #[arg(long)]
        min_year: Option<i32>,

        #[arg(long, allow_negative_numbers = true)]
        min_days_together: Option<i64>,
    },
    /// Print node, edge and degree statistics for a saved graph
    Stats {
        graph: PathBuf,

        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Project {
            partition_index,
            partition_count,
            max_year,
            min_days_together,
            input,
            out_dir,
            min_year,
            config,
        } => {
            let overrides = Overrides {
                partition_count: Some(partition_count),
                max_year: Some(max_year),
                min_year,
                min_days_together: Some(min_days_together),
            };
            run_project(partition_index, &input, &out_dir, config.as_deref(), overrides)
        }
        Commands::Merge {
            out_dir,
            partition_count,
            output,
        } => run_merge(&out_dir, partition_count, &output),
        Commands::Run {
            input,
            output,
            work_dir,
            config,
            partition_count,
            max_year,
            min_year,
            min_days_together,
        } => {
            let overrides = Overrides {
                partition_count,
                max_year,
                min_year,
                min_days_together,
            };
            run_all(&input, &output, work_dir, config.as_deref(), overrides)
        }
        Commands::Stats { graph, format } => run_stats(&graph, &format),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Command-line values that replace their config file counterparts
struct Overrides {
    partition_count: Option<usize>,
    max_year: Option<i32>,
    min_year: Option<i32>,
    min_days_together: Option<i64>,
}

fn resolve_config(path: Option<&Path>, overrides: Overrides) -> Result<RunConfig> {
    let mut config = match path {
        Some(path) => RunConfig::from_file(path).with_context(|| format!("loading config {:?}", path))?,
        None => RunConfig::default(),
    };
    if let Some(count) = overrides.partition_count {
        config.partition_count = count;
    }
    if let Some(max_year) = overrides.max_year {
        config.max_year = max_year;
    }
    if overrides.min_year.is_some() {
        config.min_year = overrides.min_year;
    }
    if let Some(min_days) = overrides.min_days_together {
        config.min_days_together = min_days;
    }
    config.validate()?;
    Ok(config)
}

fn load_input(path: &Path) -> Result<Graph> {
    load_graph(path).with_context(|| format!("loading graph {:?}", path))
}

fn run_project(
    partition_index: usize,
    input: &Path,
    out_dir: &Path,
    config_path: Option<&Path>,
    overrides: Overrides,
) -> Result<()> {
    let config = resolve_config(config_path, overrides)?;
    if partition_index >= config.partition_count {
        bail!(
            "partition index {} out of range for {} partitions",
            partition_index,
            config.partition_count
        );
    }

    let source = load_input(input)?;
    let coordinator = PartitionCoordinator::new(&source, config.partition_count, config.projection()?)?;
    let store = PartialStore::new(out_dir);
    let (path, stats) = coordinator.run_and_save(partition_index, &store)?;

    info!("Partition {}/{} written to {:?}", partition_index, config.partition_count, path);
    print_run_summary(&stats);
    Ok(())
}

fn run_merge(out_dir: &Path, partition_count: usize, output: &Path) -> Result<()> {
    let store = PartialStore::new(out_dir);
    let mut merged = Graph::new();
    let stats = store
        .merge_all(partition_count, &mut merged)
        .with_context(|| format!("merging partial results in {:?}", out_dir))?;
    save_graph(output, &merged)?;

    print_run_summary(&stats);
    println!("Wrote {} nodes, {} edges to {:?}", merged.node_count(), merged.edge_count(), output);
    Ok(())
}

fn run_all(
    input: &Path,
    output: &Path,
    work_dir: Option<PathBuf>,
    config_path: Option<&Path>,
    overrides: Overrides,
) -> Result<()> {
    let config = resolve_config(config_path, overrides)?;
    let work_dir = work_dir.unwrap_or_else(|| output.with_extension("partials"));
    let source = load_input(input)?;

    let coordinator = PartitionCoordinator::new(&source, config.partition_count, config.projection()?)?;
    let store = PartialStore::new(&work_dir);
    let mut report = coordinator.run_all(&store);
    if !report.is_success() {
        let failed: Vec<usize> = report.failed.iter().map(|(index, _)| *index).collect();
        warn!("Partitions {:?} failed, retrying once", failed);
        report = coordinator.run_slices(&failed, &store);
        if !report.is_success() {
            let failed: Vec<usize> = report.failed.iter().map(|(index, _)| *index).collect();
            bail!("partitions {:?} failed; partial results kept in {:?}", failed, work_dir);
        }
    }

    run_merge(&work_dir, config.partition_count, output)
}

fn run_summary_table(stats: &ProjectionStats) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Workers visited".to_string(), stats.workers_visited.to_string()]);
    table.add_row(vec!["Pairs evaluated".to_string(), stats.pairs_evaluated.to_string()]);
    table.add_row(vec!["Edges created".to_string(), stats.edges_created.to_string()]);
    table.add_row(vec!["Interval loads".to_string(), stats.interval_loads.to_string()]);
    table.add_row(vec!["Intervals evicted".to_string(), stats.intervals_evicted.to_string()]);
    table.add_row(vec!["Interval issues".to_string(), stats.interval_issues.to_string()]);
    table
}

fn print_run_summary(stats: &ProjectionStats) {
    println!("{}", run_summary_table(stats));
}

struct GraphStats {
    nodes: usize,
    edges: usize,
    workers: usize,
    employers: usize,
    isolated: usize,
    min_degree: usize,
    max_degree: usize,
    mean_degree: f64,
}

fn graph_stats(graph: &Graph) -> Result<GraphStats> {
    let mut degrees = Vec::with_capacity(graph.node_count());
    for key in graph.keys() {
        degrees.push(graph.degree(key)?);
    }
    let total: usize = degrees.iter().sum();

    Ok(GraphStats {
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        workers: graph.keys_of_kind(NodeKind::Worker).count(),
        employers: graph.keys_of_kind(NodeKind::Employer).count(),
        isolated: degrees.iter().filter(|&&d| d == 0).count(),
        min_degree: degrees.iter().copied().min().unwrap_or(0),
        max_degree: degrees.iter().copied().max().unwrap_or(0),
        mean_degree: if degrees.is_empty() {
            0.0
        } else {
            total as f64 / degrees.len() as f64
        },
    })
}

fn run_stats(path: &Path, format: &OutputFormat) -> Result<()> {
    let graph = load_input(path)?;
    let stats = graph_stats(&graph)?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "nodes": stats.nodes,
                "edges": stats.edges,
                "workers": stats.workers,
                "employers": stats.employers,
                "isolated": stats.isolated,
                "min_degree": stats.min_degree,
                "max_degree": stats.max_degree,
                "mean_degree": stats.mean_degree,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Metric", "Value"]);
            table.add_row(vec!["Nodes".to_string(), stats.nodes.to_string()]);
            table.add_row(vec!["Edges".to_string(), stats.edges.to_string()]);
            table.add_row(vec!["Workers".to_string(), stats.workers.to_string()]);
            table.add_row(vec!["Employers".to_string(), stats.employers.to_string()]);
            table.add_row(vec!["Isolated nodes".to_string(), stats.isolated.to_string()]);
            table.add_row(vec!["Min degree".to_string(), stats.min_degree.to_string()]);
            table.add_row(vec!["Max degree".to_string(), stats.max_degree.to_string()]);
            table.add_row(vec!["Mean degree".to_string(), format!("{:.2}", stats.mean_degree)]);
            println!("{}", table);
        }
    }
    Ok(())
}
