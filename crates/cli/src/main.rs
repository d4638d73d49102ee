use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use synapse_engine::{ProjectEngine, RefreshStats};
use synapse_graph::{CompositeGraph, Mutation};

#[derive(Parser)]
#[command(name = "synapse")]
#[command(about = "Architecture graphs from specification documents and source scans", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory (defaults to current directory)
    #[arg(short = 'C', long, global = true, default_value = ".")]
    project: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Emit single-line JSON instead of pretty-printed JSON
    #[arg(long, global = true)]
    compact: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the durable graph from the specification document (or a directory walk)
    Seed,

    /// Print the composite graph: durable state plus derived edges and layout
    State(StateArgs),

    /// Print declared symbols and references of one file
    Scan(ScanArgs),

    /// Print the control flow of one file, or the architecture flow of the project
    Flow(FlowArgs),

    /// Report cycles, bottlenecks, dead ends and a completeness score
    Analyze,

    /// Parse a specification document and print the extracted structure
    #[command(name = "parse-spec")]
    ParseSpec(ParseSpecArgs),

    /// Apply one mutation to the durable graph
    Apply(ApplyArgs),
}

#[derive(Args)]
struct StateArgs {
    /// Include refresh statistics next to the graph
    #[arg(long)]
    stats: bool,
}

#[derive(Args)]
struct ScanArgs {
    /// File path relative to the project directory
    file: String,
}

#[derive(Args)]
struct FlowArgs {
    /// File path relative to the project directory; omit for the project flow
    file: Option<String>,
}

#[derive(Args)]
struct ParseSpecArgs {
    /// Specification document
    document: PathBuf,
}

#[derive(Args)]
#[command(after_help = r#"Example:
  synapse apply --json '{"op":"create_edge","source":"src/main.py","target":"src/db.py","kind":"call"}'"#)]
struct ApplyArgs {
    /// Inline JSON mutation (mutually exclusive with --file)
    #[arg(long, conflicts_with = "file")]
    json: Option<String>,

    /// Path to file containing the JSON mutation ("-" reads stdin)
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Serialize)]
struct StateWithStats {
    state: CompositeGraph,
    stats: RefreshStats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let root = cli
        .project
        .canonicalize()
        .with_context(|| format!("Invalid project path {}", cli.project.display()))?;
    let engine = ProjectEngine::new(&root).context("Failed to load project configuration")?;
    let output = Output {
        compact: cli.compact,
    };

    match cli.command {
        Commands::Seed => {
            let report = engine.seed().await.context("Seeding failed")?;
            output.emit(&report)?;
        }
        Commands::State(args) => {
            let (state, stats) = engine.refresh().await.context("Refresh failed")?;
            if args.stats {
                output.emit(&StateWithStats { state, stats })?;
            } else {
                output.emit(&state)?;
            }
        }
        Commands::Scan(args) => output.emit(&engine.scan_file(&args.file))?,
        Commands::Flow(args) => match args.file {
            Some(file) => output.emit(&engine.flow_for_file(&file).await)?,
            None => output.emit(&engine.flow_view().await.context("Refresh failed")?)?,
        },
        Commands::Analyze => {
            let report = engine.analyze().await.context("Analysis failed")?;
            output.emit(&report)?;
        }
        Commands::ParseSpec(args) => {
            if !args.document.is_file() {
                bail!("Specification document {} not found", args.document.display());
            }
            output.emit(&engine.parse_spec(&args.document))?;
        }
        Commands::Apply(args) => {
            let mutation = read_mutation(&args)?;
            let graph = engine
                .apply(&mutation)
                .await
                .with_context(|| format!("Mutation {} failed", mutation.name()))?;
            output.emit(&graph)?;
        }
    }

    Ok(())
}

struct Output {
    compact: bool,
}

impl Output {
    fn emit<T: Serialize>(&self, value: &T) -> Result<()> {
        let text = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        println!("{text}");
        Ok(())
    }
}

fn read_mutation(args: &ApplyArgs) -> Result<Mutation> {
    let raw = match (&args.json, &args.file) {
        (Some(json), _) => json.clone(),
        (None, Some(path)) if path.as_os_str() == "-" => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read mutation from stdin")?;
            buf
        }
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => bail!("Provide a mutation with --json or --file"),
    };
    serde_json::from_str(&raw).context("Invalid mutation JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn mutation_json_is_parsed() {
        let args = ApplyArgs {
            json: Some(r#"{"op":"delete_node","id":"src/old.py"}"#.to_string()),
            file: None,
        };
        let mutation = read_mutation(&args).unwrap();
        assert_eq!(
            mutation,
            Mutation::DeleteNode {
                id: "src/old.py".to_string()
            }
        );

        let missing = ApplyArgs {
            json: None,
            file: None,
        };
        assert!(read_mutation(&missing).is_err());
    }
}
