use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use pipeline_workflow::compiler::Mode;
use pipeline_workflow::compiler::loader::load_graph_from_json;
use pipeline_workflow::config::{DEFAULT_MAX_CONCURRENCY, RuntimeConfig};
use pipeline_workflow::workflow::Workflow;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the schemas every node would produce
    Validate(RunArgs),
    /// Run every node on its data and produce schemas and instances
    Evaluate(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Path to the graph JSON file
    #[arg(long, short)]
    graph: PathBuf,

    /// Directory receiving state, schema and instance files (temporary if omitted)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Directory containing the installed block modules
    #[arg(long, default_value = "node_modules")]
    modules: PathBuf,

    /// Program used to start block scripts
    #[arg(long, default_value = "node")]
    interpreter: String,

    /// Shell used to run commands
    #[arg(long, default_value = "sh")]
    shell: String,

    /// Maximum number of tasks running at once
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    concurrency: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the result.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    let (mode, args) = match cli.command {
        Commands::Validate(args) => (Mode::Validate, args),
        Commands::Evaluate(args) => (Mode::Evaluate, args),
    };

    let graph = load_graph_from_json(&args.graph)?;
    info!("Loaded graph with {} nodes and {} edges", graph.nodes.len(), graph.edges.len());

    let modules = std::path::absolute(&args.modules)
        .with_context(|| format!("Invalid module directory {}", args.modules.display()))?;
    let config = RuntimeConfig::new(modules)
        .with_interpreter(&args.interpreter)
        .with_shell(&args.shell)
        .with_max_concurrency(args.concurrency);

    // Held until the end of main so a temporary directory outlives the run.
    let mut temporary = None;
    let output = match args.output {
        Some(output) => {
            if output.exists() && !output.is_dir() {
                bail!("Output path must be a directory: {}", output.display());
            }
            output
        }
        None => {
            let dir = tempfile::Builder::new()
                .prefix("workflow-")
                .tempdir()
                .context("Failed to create a temporary output directory")?;
            let path = dir.path().to_path_buf();
            temporary = Some(dir);
            path
        }
    };

    let workflow = Workflow::new(config);
    let report = workflow.run(mode, &graph, &output).await?;
    info!("Run {} finished: {} failed", report.run_id, report.failures.len());

    println!("{}", serde_json::to_string_pretty(&report.failures)?);

    drop(temporary);
    Ok(())
}
