
// imports
use crate::config::{CooccurParams, JsonTypes, VocabParams};
use crate::cooccurrence::Counts;
use crate::corpus::Corpus;
use crate::error::Result;
use crate::config::files_handling;
use crate::matrix::CooccurrenceMatrix;
use crate::vocab::{Vocabulary, WordFrequencies};

use std::path::Path;
use std::time::Instant;
use log::{info, warn};

pub struct Pipeline {}

impl Pipeline {

    // runs the two stages -
    // -> vocabulary: count the corpus, sort, trim, save
    // -> cooccurrences: second pass over the corpus with the frozen vocabulary, save

    pub fn build_vocab(params: &VocabParams) -> Result<Vocabulary> {

        let timer = Instant::now();
        info!("{}", params);
        info!("starting vocab building...");

        let wf = WordFrequencies::from_corpus(&Corpus::new(&params.corpus_file))?;
        let mut vocab = wf.to_vocabulary().trim(params.min_count);
        if let Some(max_vocab) = params.max_vocab {
            vocab = vocab.truncate(max_vocab);
        }
        info!("using {} tokens out of {} (min count {})", vocab.len(), wf.len(), params.min_count);

        vocab.save(&params.output)?;
        info!("finished vocab creation, took {} seconds ...", timer.elapsed().as_secs());
        Ok(vocab)
    }

    pub fn build_cooccurrences(params: &CooccurParams) -> Result<CooccurrenceMatrix> {
        params.validate()?;
        let vocab = Pipeline::load_vocab(&params.vocab_file, params.min_count)?;
        Pipeline::count_and_save(params, &vocab)
    }

    pub fn run(params: &JsonTypes) -> Result<()> {

        info!("{}", params);

        // reuse the vocabulary of an earlier run if asked to
        let vocab = if params.saved_vocab {
            Pipeline::load_vocab(&params.vocab_file(), params.min_count)?
        } else {
            Pipeline::build_vocab(&params.vocab_params())?
        };

        let cooc_params = params.cooccur_params();
        cooc_params.validate()?;
        Pipeline::count_and_save(&cooc_params, &vocab)?;
        Ok(())
    }

    fn load_vocab(path: &Path, min_count: u64) -> Result<Vocabulary> {
        let vocab = Vocabulary::load(path)?;
        if !vocab.is_sorted() {
            warn!("{} is not sorted by frequency, trimming at {} may keep rare words", path.display(), min_count);
        }
        Ok(vocab.trim(min_count))
    }

    fn count_and_save(params: &CooccurParams, vocab: &Vocabulary) -> Result<CooccurrenceMatrix> {

        let timer = Instant::now();
        info!("{}", params);
        if vocab.is_empty() {
            warn!("the vocabulary is empty, no cooccurrence will be counted");
        }

        let corpus = Corpus::new(&params.corpus_file);
        let matrix = if params.num_shards == 1 {
            Counts::construct(&corpus, vocab, params.window_size)?
        } else {
            Counts::construct_parallel(&corpus, vocab, params.window_size, params.num_shards, params.num_threads)?
        };

        files_handling::save_matrix(&params.output, &matrix, params.format, params.compress)?;
        info!("finished cooccurrences, took {} seconds ...", timer.elapsed().as_secs());
        Ok(matrix)
    }
}
