
use glove_cooc::files_handling::read_matrix;
use glove_cooc::{logging, OutputFormat, Vocabulary};

use std::error::Error;
use std::path::PathBuf;
use std::process;
use clap::Parser;
use log::{error, warn};

// prints the strongest contexts of some words from a saved cooccurrence matrix,
// a quick check of a `cooccur` run before handing the counts to training.
// example: ... --vocab out/vocab.txt --matrix out/cooccurrence.bin king queen

#[derive(Parser, Debug)]
#[command(author, version, about = "Strongest contexts of words in a cooccurrence matrix", long_about = None)]
struct InspectArgs {
    /// Vocabulary the matrix was built with
    #[arg(long, value_name = "PATH")]
    vocab: PathBuf,

    /// Cooccurrence file
    #[arg(long, value_name = "PATH")]
    matrix: PathBuf,

    /// Layout of the cooccurrence file
    #[arg(long, value_enum, default_value_t = OutputFormat::Bin)]
    format: OutputFormat,

    /// The cooccurrence file is gzipped
    #[arg(long)]
    compress: bool,

    /// Number of contexts to print per word
    #[arg(short, long, default_value_t = 10)]
    k: usize,

    /// Words to look up
    #[arg(required = true)]
    words: Vec<String>,
}

fn run(args: &InspectArgs) -> Result<(), Box<dyn Error>> {

    let vocab = Vocabulary::load(&args.vocab)?;
    let matrix = read_matrix(&args.matrix, args.format, args.compress)?;

    for token in &args.words {
        let id = match vocab.id(token) {
            Some(id) => id,
            None => {
                warn!("'{}' is not in the vocabulary", token);
                continue;
            }
        };

        println!("{} strongest contexts of {} (id {})", args.k, token, id);
        for (i, (context, score)) in matrix.top_contexts(id, args.k).iter().enumerate() {
            let context_text = vocab.word(*context).map_or("<unknown id>", |w| w.text.as_str());
            println!("{}", context_line(i, token, context_text, *score, matrix.symmetric_weight(id, *context)));
        }
        println!();
    }
    Ok(())
}

fn context_line(rank: usize, token: &str, context: &str, score: f64, symmetric: f64) -> String {
    format!("{} : {} {} = {:.4} (symmetric {:.4})", rank, token, context, score, symmetric)
}

fn main() {
    let args = InspectArgs::parse();
    logging::init(0, 0);
    if let Err(e) = run(&args) {
        error!("{}", e);
        process::exit(1);
    }
}


#[cfg(test)]
mod tests {

    use super::context_line;

    #[test]
    fn context_line_layout() {
        assert_eq!(context_line(0, "king", "queen", 2.5, 3.25), "0 : king queen = 2.5000 (symmetric 3.2500)");
    }
}
