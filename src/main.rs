
use glove_cooc::config::{self, Config, CooccurParams, VocabParams};
use glove_cooc::{logging, GloveError, OutputFormat, Pipeline};

use std::error::Error;
use std::path::PathBuf;
use std::process;
use clap::{ArgAction, Args, Parser, Subcommand};
use log::error;

#[derive(Parser, Debug)]
#[command(author, version, about = "Vocabulary and cooccurrence counts for GloVe training", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Count a corpus and write the frequency-sorted vocabulary
    Vocab(VocabArgs),
    /// Count weighted cooccurrences of the vocabulary words in a corpus
    Cooccur(CooccurArgs),
    /// Run both stages from a json configuration file
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct VocabArgs {
    /// Corpus text file
    #[arg(long, value_name = "PATH")]
    corpus: PathBuf,

    /// Where to write the vocabulary
    #[arg(long, value_name = "PATH", default_value = config::VOCAB_FILE)]
    output: PathBuf,

    /// Minimum number of occurrences for a word to be kept
    #[arg(long, value_name = "COUNT", default_value_t = config::DEFAULT_MIN_COUNT)]
    min_count: u64,

    /// Keep at most this many words
    #[arg(long, value_name = "SIZE")]
    max_vocab: Option<usize>,
}

#[derive(Args, Debug)]
struct CooccurArgs {
    /// Corpus text file
    #[arg(long, value_name = "PATH")]
    corpus: PathBuf,

    /// Vocabulary file written by `vocab`
    #[arg(long, value_name = "PATH")]
    vocab: PathBuf,

    /// Output file [default: cooccurrence.<format>[.gz]]
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Words of the vocabulary seen fewer times are ignored
    #[arg(long, value_name = "COUNT", default_value_t = config::DEFAULT_MIN_COUNT)]
    min_count: u64,

    /// Number of context words on each side of the center word
    #[arg(long, value_name = "SIZE", default_value_t = config::DEFAULT_WINDOW_SIZE)]
    window_size: usize,

    /// Output layout
    #[arg(long, value_enum, default_value_t = OutputFormat::Bin)]
    format: OutputFormat,

    /// Gzip the output
    #[arg(long)]
    compress: bool,

    /// Worker threads
    #[arg(long, value_name = "N", default_value_t = config::DEFAULT_NUM_THREADS)]
    threads: usize,

    /// Corpus shards [default: one per thread]
    #[arg(long, value_name = "N")]
    shards: Option<usize>,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Json configuration file
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
}

impl From<VocabArgs> for VocabParams {
    fn from(args: VocabArgs) -> Self {
        VocabParams {
            corpus_file: args.corpus,
            output: args.output,
            min_count: args.min_count,
            max_vocab: args.max_vocab,
        }
    }
}

impl From<CooccurArgs> for CooccurParams {
    fn from(args: CooccurArgs) -> Self {
        let output = args.output
            .unwrap_or_else(|| PathBuf::from(args.format.file_name(config::COOC_STEM, args.compress)));
        CooccurParams {
            corpus_file: args.corpus,
            vocab_file: args.vocab,
            output,
            min_count: args.min_count,
            window_size: args.window_size,
            format: args.format,
            compress: args.compress,
            num_threads: args.threads,
            num_shards: args.shards.unwrap_or(args.threads),
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Vocab(args) => {
            Pipeline::build_vocab(&args.into())?;
        }
        Commands::Cooccur(args) => {
            Pipeline::build_cooccurrences(&args.into())?;
        }
        Commands::Run(args) => {
            let params = Config::new(&args.config)?.get_params();
            Pipeline::run(&params)?;
        }
    }
    Ok(())
}

fn main() {

    // missing or malformed arguments exit here with clap's usage message
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        error!("{}", e);
        let code = match e.downcast_ref::<GloveError>() {
            Some(GloveError::Usage(_)) => 2,
            _ => 1,
        };
        process::exit(code);
    }
}
