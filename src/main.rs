//! # sitedump CLI Application
//!
//! Command-line interface over the sitedump library.
//!
//! ## Subcommands
//!
//! - `process`: extract every configured site and write the corpus
//! - `inspect`: print the split structure of a single page
//! - `graph`: query a written relation graph
//!
//! Logs go to stderr, and optionally to a file in `--log-dir`.

mod telemetry;

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use sitedump::config::{load_config, LoadedConfig};
use sitedump::extract::DocExtractor;
use sitedump::graph::RelationGraph;
use sitedump::links::RedirectMap;
use sitedump::preprocess::ContentPreprocessor;
use sitedump::splitter::{outline, HierarchicalSplitter};
use sitedump::writer::{CorpusWriter, NeverRetry, RetryPrompt, StdinPrompt};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Parser)]
#[command(author, version, about = "Split crawled websites into a corpus of linked document extracts", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to sitedump.log in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract all configured sites and write the corpus
    Process(ProcessArgs),

    /// Print the split structure of one page
    Inspect(InspectArgs),

    /// Print documents related to a document in a written graph
    Graph(GraphArgs),
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// JSON config file
    #[arg(short, long)]
    config: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "processed")]
    out: PathBuf,

    /// Redirect map, overrides the config file
    #[arg(short, long)]
    redirects: Option<PathBuf>,

    /// Maximum extract length in characters, overrides the config file
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    max_len: Option<u64>,

    /// Give up on write failures instead of asking to retry
    #[arg(long)]
    no_prompt: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// JSON config file
    #[arg(short, long)]
    config: PathBuf,

    /// Name of the site the page belongs to
    #[arg(short, long)]
    site: String,

    /// Url the page was crawled from
    #[arg(short, long)]
    url: String,

    /// Page file
    #[arg(required = true)]
    page: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RelationQuery {
    Parent,
    Children,
    Siblings,
    Splits,
    Links,
}

#[derive(Args, Debug)]
struct GraphArgs {
    /// Graph file written by `process`
    #[arg(short, long)]
    graph: PathBuf,

    /// Document id
    id: usize,

    /// Relation to follow
    #[arg(short, long, value_enum, default_value = "children")]
    relation: RelationQuery,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _logs = telemetry::init_tracing_subscriber(cli.verbose, cli.log_dir.as_deref());

    match cli.command {
        Commands::Process(args) => process_command(args)?,
        Commands::Inspect(args) => inspect_command(args)?,
        Commands::Graph(args) => graph_command(args)?,
    }

    Ok(())
}

#[instrument]
fn process_command(args: ProcessArgs) -> anyhow::Result<()> {
    let LoadedConfig {
        mut extractor,
        sites,
    } = load_config(&args.config)?;
    if let Some(max_len) = args.max_len {
        extractor.max_len = usize::try_from(max_len)?;
    }
    let redirects_path = args.redirects.or_else(|| extractor.redirects_path.clone());
    let redirects = match redirects_path {
        Some(path) => RedirectMap::load(&path)?,
        None => {
            warn!("No redirect map given, links are resolved as written");
            RedirectMap::new()
        }
    };

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} [{elapsed_precise}] {pos} pages {msg}")
            .map_err(|e| anyhow!("Invalid progress template: {}", e))?,
    );
    progress.enable_steady_tick(Duration::from_millis(120));

    let mut doc_extractor = DocExtractor::new(&extractor).with_progress(progress);
    for site in &sites {
        doc_extractor.parse_folder(site);
    }
    let corpus = doc_extractor.finish(redirects);

    let mut prompt: Box<dyn RetryPrompt> = if args.no_prompt {
        Box::new(NeverRetry)
    } else {
        Box::new(StdinPrompt)
    };
    CorpusWriter::new(&args.out).write(&corpus, prompt.as_mut())?;

    println!(
        "Wrote {} extracts and {} edges to {}",
        corpus.extracts.len(),
        corpus.graph.edge_count(),
        args.out.display()
    );
    info!(
        resolved = corpus.links.resolved,
        unresolved = corpus.links.unresolved,
        unhandled_tables = corpus.tables.unhandled.values().map(Vec::len).sum::<usize>(),
        error_tables = corpus.tables.errors.values().map(Vec::len).sum::<usize>(),
        "Run summary"
    );
    Ok(())
}

#[instrument]
fn inspect_command(args: InspectArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let site = config
        .site(&args.site)
        .ok_or_else(|| anyhow!("No site named '{}' in {}", args.site, args.config.display()))?;
    let html = std::fs::read_to_string(&args.page)
        .with_context(|| format!("Failed to read {}", args.page.display()))?;

    let mut preprocessor = ContentPreprocessor::new();
    let mut page = preprocessor.process(&html, &args.url, site);
    let extracts = HierarchicalSplitter::new(site, config.extractor.max_len)
        .split(&mut page.tree, page.root);

    println!("{}", page.title);
    print!("{}", outline(&extracts));
    Ok(())
}

#[instrument]
fn graph_command(args: GraphArgs) -> anyhow::Result<()> {
    let graph = RelationGraph::load(&args.graph)?;
    let ids = match args.relation {
        RelationQuery::Parent => graph.parent(args.id).into_iter().collect(),
        RelationQuery::Children => graph.children(args.id),
        RelationQuery::Siblings => graph.siblings(args.id),
        RelationQuery::Splits => graph.split_chain(args.id),
        RelationQuery::Links => graph.links(args.id),
    };
    for id in ids {
        println!("{id}");
    }
    Ok(())
}
