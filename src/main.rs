//! wdtrie CLI - Command line interface for the wdtrie kernel forest
//!
//! Builds a weighted-degree kernel from a training file and evaluates
//! query sequences against it.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use wdtrie::dataset::{self, Example};
use wdtrie::kernel::WdKernel;
use wdtrie::{alphabet, TrieConfig, WeightFolding};

#[derive(Parser)]
#[command(name = "wdtrie")]
#[command(about = "Weighted-degree string kernel over a compact k-mer trie forest")]
#[command(version)]
struct Cli {
    /// JSON file with a forest configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Longest k-mer tracked (overrides the config file)
    #[arg(long)]
    degree: Option<usize>,

    /// When depth weights are applied (overrides the config file)
    #[arg(long, value_enum)]
    fold: Option<Fold>,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum Fold {
    AtInsert,
    AtQuery,
}

impl From<Fold> for WeightFolding {
    fn from(fold: Fold) -> Self {
        match fold {
            Fold::AtInsert => WeightFolding::AtInsert,
            Fold::AtQuery => WeightFolding::AtQuery,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Score query sequences against the training examples
    Score {
        /// Training file: `coefficient<TAB>sequence` per line
        #[arg(short, long)]
        train: PathBuf,
        /// Query file: one sequence per line
        #[arg(short, long)]
        query: PathBuf,
    },

    /// Split each query score into buckets of k-mer lengths
    Contrib {
        /// Training file: `coefficient<TAB>sequence` per line
        #[arg(short, long)]
        train: PathBuf,
        /// Query file: one sequence per line
        #[arg(short, long)]
        query: PathBuf,
        /// Number of depths per bucket
        #[arg(short, long, default_value = "1")]
        stride: usize,
    },

    /// Show absolute trie weight per depth and per position
    Weights {
        /// Training file: `coefficient<TAB>sequence` per line
        #[arg(short, long)]
        train: PathBuf,
    },

    /// List the weighted k-mers stored at one position
    Kmers {
        /// Training file: `coefficient<TAB>sequence` per line
        #[arg(short, long)]
        train: PathBuf,
        /// Sequence position whose trie is listed
        #[arg(short, long, default_value = "0")]
        position: usize,
        /// K-mer length
        #[arg(short, long, default_value = "3")]
        k: usize,
    },

    /// Show forest size after loading the training examples
    Stats {
        /// Training file: `coefficient<TAB>sequence` per line
        #[arg(short, long)]
        train: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Score { train, query } => {
            let kernel = build_kernel(&cli, train)?;
            let queries = dataset::load_queries(query)?;
            let mut items = Vec::with_capacity(queries.len());
            for q in &queries {
                items.push(serde_json::json!({
                    "sequence": alphabet::decode(q)?,
                    "score": kernel.output(q)?
                }));
            }
            output(
                &cli.format,
                &serde_json::json!({
                    "count": items.len(),
                    "scores": items
                }),
            );
        }

        Commands::Contrib {
            train,
            query,
            stride,
        } => {
            let kernel = build_kernel(&cli, train)?;
            let queries = dataset::load_queries(query)?;
            let mut items = Vec::with_capacity(queries.len());
            for q in &queries {
                items.push(serde_json::json!({
                    "sequence": alphabet::decode(q)?,
                    "buckets": kernel.contributions(q, *stride)?
                }));
            }
            output(
                &cli.format,
                &serde_json::json!({
                    "stride": stride,
                    "contributions": items
                }),
            );
        }

        Commands::Weights { train } => {
            let kernel = build_kernel(&cli, train)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "per_depth": kernel.abs_weights_per_depth()?,
                    "per_position": kernel.forest().abs_weights_per_position()
                }),
            );
        }

        Commands::Kmers { train, position, k } => {
            let kernel = build_kernel(&cli, train)?;
            let table = kernel.kmer_weights(*position, *k)?;
            let mut items = Vec::new();
            for (index, &weight) in table.iter().enumerate() {
                if weight != 0.0 {
                    items.push(serde_json::json!({
                        "kmer": alphabet::decode(&kmer_symbols(index, *k))?,
                        "weight": weight
                    }));
                }
            }
            output(
                &cli.format,
                &serde_json::json!({
                    "position": position,
                    "k": k,
                    "kmers": items
                }),
            );
        }

        Commands::Stats { train } => {
            let kernel = build_kernel(&cli, train)?;
            let forest = kernel.forest();
            output(
                &cli.format,
                &serde_json::json!({
                    "positions": forest.len(),
                    "degree": forest.degree(),
                    "nodes": forest.node_count(),
                    "capacity": forest.capacity(),
                    "folding": forest.config().folding
                }),
            );
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Resolve the config from file and flags, then load every training example
fn build_kernel(cli: &Cli, train: &Path) -> anyhow::Result<WdKernel> {
    let mut config = match &cli.config {
        Some(path) => TrieConfig::load(path)?,
        None => TrieConfig::default(),
    };
    if let Some(degree) = cli.degree {
        config.degree = degree;
    }
    if let Some(fold) = cli.fold {
        config.folding = fold.into();
    }

    let examples = dataset::load_examples(train)?;
    if config.length == 0 {
        config.length = shortest(&examples)
            .ok_or_else(|| anyhow::anyhow!("No training examples in {}", train.display()))?;
    }
    log::info!(
        "loading {} examples into {} positions (degree {})",
        examples.len(),
        config.length,
        config.degree
    );

    let mut kernel = WdKernel::new(config)?;
    for example in &examples {
        kernel.add_example(&example.symbols, example.alpha)?;
    }
    log::info!("forest holds {} nodes", kernel.forest().node_count());
    Ok(kernel)
}

/// Symbols of the k-mer at `index` in a base-4 table, first symbol most significant
fn kmer_symbols(mut index: usize, k: usize) -> Vec<u8> {
    let mut symbols = vec![0u8; k];
    for slot in symbols.iter_mut().rev() {
        *slot = (index % alphabet::ALPHABET_SIZE) as u8;
        index /= alphabet::ALPHABET_SIZE;
    }
    symbols
}

fn shortest(examples: &[Example]) -> Option<usize> {
    examples.iter().map(|e| e.symbols.len()).min()
}

fn output(format: &OutputFormat, value: &serde_json::Value) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(value).unwrap());
        }
        OutputFormat::Text => {
            println!("{}", serde_json::to_string_pretty(value).unwrap());
        }
    }
}
