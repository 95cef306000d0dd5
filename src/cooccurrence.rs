
// imports
use crate::corpus::{Corpus, Shard};
use crate::error::{GloveError, Result};
use crate::matrix::CooccurrenceMatrix;
use crate::vocab::{TokenId, Vocabulary};
use crate::window::ContextWindow;

use std::ops::Range;
use std::time::Instant;
use log::{debug, info};
use rayon::{prelude::*, ThreadPoolBuilder};


/// Streams token ids through a `ContextWindow` and adds `1 / distance` to
/// `(center, neighbor)` for every neighbor of every center.
///
/// Tokens missing from the vocabulary are dropped before reaching the window,
/// so distances count in-vocabulary tokens only.
pub struct Accumulator<'v> {
    vocab: &'v Vocabulary,
    window: ContextWindow,
    matrix: CooccurrenceMatrix,
    // ordinals (in feeding order) of the centers allowed to contribute
    emit_centers: Range<usize>,
    fed: usize,
    centers: usize,
}

impl<'v> Accumulator<'v> {

    pub fn new(vocab: &'v Vocabulary, window_size: usize) -> Result<Accumulator<'v>> {
        Ok(Self {
            vocab,
            window: ContextWindow::new(window_size)?,
            matrix: CooccurrenceMatrix::new(),
            emit_centers: 0..usize::MAX,
            fed: 0,
            centers: 0,
        })
    }

    /// Number of ids fed so far. The n-th id fed is the n-th center to leave the window.
    pub fn fed(&self) -> usize {
        self.fed
    }

    /// Restricts which centers contribute to the matrix. Ids outside of the range
    /// still act as neighbors.
    pub fn set_emit_range(&mut self, range: Range<usize>) {
        self.emit_centers = range;
    }

    // returns false for tokens out of the vocabulary
    pub fn push_token(&mut self, token: &str) -> bool {
        match self.vocab.id(token) {
            Some(id) => {
                self.push_id(id);
                true
            }
            None => false,
        }
    }

    pub fn push_id(&mut self, id: TokenId) {
        let Self { window, matrix, emit_centers, centers, .. } = &mut *self;
        window.slide(id, |w| Accumulator::record(w, matrix, emit_centers, centers));
        self.fed += 1;
    }

    fn record(window: &ContextWindow, matrix: &mut CooccurrenceMatrix, emit_centers: &Range<usize>, centers: &mut usize) {

        let ordinal = *centers;
        *centers += 1;
        if !emit_centers.contains(&ordinal) {
            return;
        }

        let center = match window.center() {
            Some(center) => center,
            None => return
        };
        for (neighbor, distance) in window.neighbors() {
            let dis_count = 1.0 / distance as f64;
            matrix.add(center, neighbor, dis_count);
        }
    }

    /// Drains the window and hands over the matrix.
    pub fn finish(mut self) -> CooccurrenceMatrix {
        let Self { window, matrix, emit_centers, centers, .. } = &mut self;
        window.drain(|w| Accumulator::record(w, matrix, emit_centers, centers));
        self.matrix
    }
}


pub struct Counts {}

impl Counts {

    /// Single pass over the whole corpus.
    pub fn construct(corpus: &Corpus, vocab: &Vocabulary, window_size: usize) -> Result<CooccurrenceMatrix> {

        let timer = Instant::now();
        let mut accumulator = Accumulator::new(vocab, window_size)?;
        let mut n_tokens: u64 = 0;
        let mut n_oov: u64 = 0;

        for token in corpus.tokens()? {
            let (_, tok) = token?;
            if !accumulator.push_token(&tok) {
                n_oov += 1;
            }
            n_tokens += 1;
            if n_tokens % 10_000_000 == 0 {
                debug!("streamed {} tokens", n_tokens);
            }
        }

        let matrix = accumulator.finish();
        info!("{} tokens ({} out of vocabulary) gave {} cooccurrence entries in {} seconds",
            n_tokens, n_oov, matrix.len(), timer.elapsed().as_secs());
        Ok(matrix)
    }

    /// Cooccurrences of the centers owned by `shard`. The window is primed with
    /// the `window_size` in-vocabulary ids before the shard and runs on past its
    /// end for another `window_size` ids, so pairs crossing a boundary are kept;
    /// only the shard's own tokens contribute as centers.
    pub fn run_shard(corpus: &Corpus, shard: &Shard, vocab: &Vocabulary, window_size: usize) -> Result<CooccurrenceMatrix> {

        let timer = Instant::now();
        let lookbehind = corpus.preceding(shard.start, window_size, |tok| vocab.id(tok))?;

        let mut accumulator = Accumulator::new(vocab, window_size)?;
        accumulator.set_emit_range(lookbehind.len()..usize::MAX);
        for id in lookbehind {
            accumulator.push_id(id);
        }

        let mut owned_end: Option<usize> = None;
        let mut lookahead = 0;
        for token in corpus.tokens_from(shard.start)? {
            let (offset, tok) = token?;
            if offset < shard.end {
                accumulator.push_token(&tok);
                continue;
            }
            if owned_end.is_none() {
                owned_end = Some(accumulator.fed());
            }
            // stop reading as soon as the lookahead is complete
            if accumulator.push_token(&tok) {
                lookahead += 1;
                if lookahead == window_size {
                    break;
                }
            }
        }

        let owned_end = owned_end.unwrap_or_else(|| accumulator.fed());
        let owned_start = accumulator.emit_centers.start;
        accumulator.set_emit_range(owned_start..owned_end);

        let matrix = accumulator.finish();
        debug!("shard {} [{}, {}) gave {} entries in {} ms",
            shard.index, shard.start, shard.end, matrix.len(), timer.elapsed().as_millis());
        Ok(matrix)
    }

    /// Splits the corpus into `num_shards` byte ranges, counts them on a pool of
    /// `num_threads` threads and sums the partial matrices. A failing shard fails
    /// the whole construction.
    pub fn construct_parallel(corpus: &Corpus,
        vocab: &Vocabulary,
        window_size: usize,
        num_shards: usize,
        num_threads: usize) -> Result<CooccurrenceMatrix> {

        if window_size == 0 {
            return Err(GloveError::Usage("window size must be at least 1".to_string()));
        }
        if num_threads == 0 {
            return Err(GloveError::Usage("number of threads must be at least 1".to_string()));
        }

        let timer = Instant::now();
        let shards = corpus.plan_shards(num_shards)?;
        info!("counting {} shards on {} threads", shards.len(), num_threads);

        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| GloveError::Usage(format!("cannot build thread pool: {}", e)))?;

        // the vocabulary is frozen at this point and only read by the workers
        let matrix = pool.install(|| -> Result<CooccurrenceMatrix> {
            let partials: Vec<CooccurrenceMatrix> = shards
                .par_iter()
                .map(|shard| Counts::run_shard(corpus, shard, vocab, window_size))
                .collect::<Result<Vec<CooccurrenceMatrix>>>()?;
            Ok(partials.into_par_iter().reduce(CooccurrenceMatrix::new, CooccurrenceMatrix::merge))
        })?;

        info!("merged {} cooccurrence entries in {} seconds", matrix.len(), timer.elapsed().as_secs());
        Ok(matrix)
    }
}


#[cfg(test)]
mod tests {

    use super::{Accumulator, Counts};
    use crate::corpus::Corpus;
    use crate::matrix::CooccurrenceMatrix;
    use crate::vocab::{TokenId, Vocabulary, WordFrequencies};
    use crate::GloveError;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn vocab_of(lines: &str) -> Vocabulary {
        Vocabulary::read(Cursor::new(lines)).unwrap()
    }

    fn corpus_file(text: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(text.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    fn accumulate(text: &str, vocab: &Vocabulary, window_size: usize) -> CooccurrenceMatrix {
        let mut accumulator = Accumulator::new(vocab, window_size).unwrap();
        for tok in text.split_whitespace() {
            accumulator.push_token(tok);
        }
        accumulator.finish()
    }

    // straightforward double loop over the in-vocabulary ids
    fn brute_force(text: &str, vocab: &Vocabulary, window_size: usize) -> CooccurrenceMatrix {
        let ids: Vec<TokenId> = text.split_whitespace().filter_map(|t| vocab.id(t)).collect();
        let mut matrix = CooccurrenceMatrix::new();
        for i in 0..ids.len() {
            for j in i + 1..=(i + window_size).min(ids.len() - 1) {
                let dis_count = 1.0 / (j - i) as f64;
                matrix.add(ids[i], ids[j], dis_count);
                matrix.add(ids[j], ids[i], dis_count);
            }
        }
        matrix
    }

    fn assert_same_matrix(a: &CooccurrenceMatrix, b: &CooccurrenceMatrix) {
        let (ta, tb) = (a.triplets(), b.triplets());
        assert_eq!(ta.len(), tb.len());
        for (x, y) in ta.iter().zip(tb.iter()) {
            assert_eq!((x.0, x.1), (y.0, y.1));
            assert_relative_eq!(x.2, y.2, max_relative = 1e-9);
        }
    }

    #[test]
    fn alternating_pair_by_hand() {

        // a b a b with a window of one: three adjacent pairs, each seen from both sides
        let vocab = vocab_of("a 2\nb 2\n");
        let matrix = accumulate("a b a b", &vocab, 1);
        assert_eq!(matrix.triplets(), vec![(0, 1, 3.0), (1, 0, 3.0)]);
    }

    #[test]
    fn cooc_test() {

        // the cat sat on the mat, window of 2
        // ids: the=0 cat=1 mat=2 on=3 sat=4, sequence 0 1 4 3 0 2
        let wf = WordFrequencies::count("the cat sat on the mat".split_whitespace());
        let vocab = wf.to_vocabulary();
        assert_eq!(vocab.id("the"), Some(0));
        assert_eq!(vocab.id("sat"), Some(4));

        let mut golden: HashMap<(usize, usize), f64> = HashMap::new();
        golden.insert((0, 1), 1.0);
        golden.insert((1, 0), 1.0);
        golden.insert((0, 4), 1.0 / 2.0 + 1.0 / 2.0);
        golden.insert((4, 0), 1.0 / 2.0 + 1.0 / 2.0);
        golden.insert((1, 4), 1.0);
        golden.insert((4, 1), 1.0);
        golden.insert((1, 3), 1.0 / 2.0);
        golden.insert((3, 1), 1.0 / 2.0);
        golden.insert((4, 3), 1.0);
        golden.insert((3, 4), 1.0);
        golden.insert((3, 0), 1.0);
        golden.insert((0, 3), 1.0);
        golden.insert((3, 2), 1.0 / 2.0);
        golden.insert((2, 3), 1.0 / 2.0);
        golden.insert((0, 2), 1.0);
        golden.insert((2, 0), 1.0);

        let matrix = accumulate("the cat sat on the mat", &vocab, 2);
        let found: HashMap<(usize, usize), f64> = matrix.triplets().into_iter().map(|(i, j, v)| ((i, j), v)).collect();
        assert_eq!(found, golden);
    }

    #[test]
    fn out_of_vocabulary_tokens_are_skipped() {

        let vocab = vocab_of("a 3\nb 1\n");
        // x and y close the gap: a and b end up adjacent
        let matrix = accumulate("a x y b", &vocab, 1);
        assert_eq!(matrix.triplets(), vec![(0, 1, 1.0), (1, 0, 1.0)]);

        let matrix = accumulate("x y z", &vocab, 3);
        assert!(matrix.is_empty());

        let matrix = accumulate("a z a q b a", &vocab, 2);
        for (i, j, _) in matrix.triplets() {
            assert!(i < vocab.len() && j < vocab.len());
        }
    }

    #[test]
    fn matches_brute_force_on_random_text() {
        let words = ["the", "of", "and", "a", "in", "to", "is", "was", "it", "for", "rare"];
        let mut rng = StdRng::seed_from_u64(11);
        let text: Vec<&str> = (0..500).map(|_| words[rng.gen_range(0..words.len())]).collect();
        let text = text.join(" ");

        let vocab = WordFrequencies::count(text.split_whitespace()).to_vocabulary().truncate(8);
        for window_size in 1..=6 {
            assert_same_matrix(&accumulate(&text, &vocab, window_size), &brute_force(&text, &vocab, window_size));
        }
    }

    #[test]
    fn construct_reads_the_corpus_file() {
        let f = corpus_file("a b\na\n\nb\n");
        let vocab = vocab_of("a 2\nb 2\n");
        let matrix = Counts::construct(&Corpus::new(f.path()), &vocab, 1).unwrap();
        assert_eq!(matrix.triplets(), vec![(0, 1, 3.0), (1, 0, 3.0)]);
    }

    #[test]
    fn missing_corpus_is_an_io_error() {
        let vocab = vocab_of("a 2\n");
        let corpus = Corpus::new("/no/such/corpus.txt");
        assert!(matches!(Counts::construct(&corpus, &vocab, 2), Err(GloveError::Io(_))));
        assert!(matches!(Counts::construct_parallel(&corpus, &vocab, 2, 2, 2), Err(GloveError::Io(_))));
    }

    #[test]
    fn shards_merge_to_the_single_pass_matrix() {

        let words = ["river", "bank", "money", "water", "loan", "fish", "oov1", "oov2"];
        let mut rng = StdRng::seed_from_u64(3);
        let mut text = String::new();
        for i in 0..3000 {
            text.push_str(words[rng.gen_range(0..words.len())]);
            text.push_str(if i % 17 == 16 { "\n" } else { " " });
        }
        let f = corpus_file(&text);
        let corpus = Corpus::new(f.path());

        let vocab = WordFrequencies::count(text.split_whitespace())
            .to_vocabulary()
            .truncate(6);
        let oov: Vec<&str> = words.iter().copied().filter(|w| vocab.id(w).is_none()).collect();
        assert_eq!(oov.len(), 2);

        for window_size in [1, 3, 10] {
            let single = Counts::construct(&corpus, &vocab, window_size).unwrap();
            assert_same_matrix(&single, &brute_force(&text, &vocab, window_size));
            for num_shards in [1, 2, 5, 16, 200] {
                let sharded = Counts::construct_parallel(&corpus, &vocab, window_size, num_shards, 4).unwrap();
                assert_same_matrix(&sharded, &single);
            }
        }
    }

    #[test]
    fn single_line_corpus_shards_match() {
        // no newline at all, several read chunks long
        let words = ["one", "two", "three", "four", "skip"];
        let mut rng = StdRng::seed_from_u64(5);
        let text: Vec<&str> = (0..20_000).map(|_| words[rng.gen_range(0..words.len())]).collect();
        let text = text.join(" ");
        let f = corpus_file(&text);
        let corpus = Corpus::new(f.path());
        let vocab = vocab_of("one 10\ntwo 9\nthree 8\nfour 7\n");

        let single = Counts::construct(&corpus, &vocab, 4).unwrap();
        assert_same_matrix(&single, &brute_force(&text, &vocab, 4));
        let sharded = Counts::construct_parallel(&corpus, &vocab, 4, 12, 3).unwrap();
        assert_same_matrix(&sharded, &single);
    }

    #[test]
    fn shard_merge_order_does_not_matter() {
        let text = "a b c a b c c b a a";
        let f = corpus_file(text);
        let corpus = Corpus::new(f.path());
        let vocab = WordFrequencies::count(text.split_whitespace()).to_vocabulary();

        let partials: Vec<CooccurrenceMatrix> = corpus.plan_shards(3).unwrap()
            .iter()
            .map(|shard| Counts::run_shard(&corpus, shard, &vocab, 2).unwrap())
            .collect();
        assert!(partials.len() > 1);

        let forward = partials.iter().cloned().fold(CooccurrenceMatrix::new(), CooccurrenceMatrix::merge);
        let backward = partials.iter().rev().cloned().fold(CooccurrenceMatrix::new(), CooccurrenceMatrix::merge);
        assert_same_matrix(&forward, &backward);
        assert_same_matrix(&forward, &brute_force(text, &vocab, 2));
    }

    #[test]
    fn bad_parallel_settings_are_usage_errors() {
        let f = corpus_file("a b");
        let corpus = Corpus::new(f.path());
        let vocab = vocab_of("a 1\nb 1\n");
        assert!(matches!(Counts::construct_parallel(&corpus, &vocab, 0, 2, 2), Err(GloveError::Usage(_))));
        assert!(matches!(Counts::construct_parallel(&corpus, &vocab, 2, 0, 2), Err(GloveError::Usage(_))));
        assert!(matches!(Counts::construct_parallel(&corpus, &vocab, 2, 2, 0), Err(GloveError::Usage(_))));
    }
}
