
// imports
use crate::corpus::Corpus;
use crate::error::{GloveError, Result};

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use log::{debug, info};

/// Position of a word in a `Vocabulary`.
pub type TokenId = usize;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub frequency: u64,
}

impl Word {
    pub fn new(text: &str, frequency: u64) -> Word {
        Self { text: text.to_owned(), frequency }
    }
}

// descending frequency, ties broken by ascending text
fn vocab_order(a: &Word, b: &Word) -> Ordering {
    b.frequency.cmp(&a.frequency).then_with(|| a.text.cmp(&b.text))
}


/// Occurrence counts of every distinct token of a corpus, in no particular order.
#[derive(Clone, Debug, Default)]
pub struct WordFrequencies {
    words: HashMap<String, u64>,
}

impl WordFrequencies {

    pub fn new() -> WordFrequencies {
        Self::default()
    }

    pub fn add(&mut self, token: &str) {
        // avoids allocating a key for tokens that were already seen
        match self.words.get_mut(token) {
            Some(count) => *count += 1,
            None => { self.words.insert(token.to_owned(), 1); }
        }
    }

    pub fn count<I, S>(tokens: I) -> WordFrequencies
    where I: IntoIterator<Item = S>, S: AsRef<str> {
        let mut wf = WordFrequencies::new();
        for tok in tokens {
            wf.add(tok.as_ref());
        }
        wf
    }

    pub fn from_corpus(corpus: &Corpus) -> Result<WordFrequencies> {

        // one pass over the corpus, counting how many times each token appears
        let mut wf = WordFrequencies::new();
        let mut n_tokens: u64 = 0;
        for token in corpus.tokens()? {
            let (_, tok) = token?;
            wf.add(&tok);
            n_tokens += 1;
            if n_tokens % 10_000_000 == 0 {
                debug!("counted {} tokens, {} distinct so far", n_tokens, wf.len());
            }
        }

        info!("counted {} tokens, {} distinct, in {}", n_tokens, wf.len(), corpus.path().display());
        Ok(wf)
    }

    pub fn get(&self, token: &str) -> Option<u64> {
        self.words.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn to_vocabulary(&self) -> Vocabulary {
        // the map has no stable order, ids come from the explicit sort only
        let mut words: Vec<Word> = self.words
            .iter()
            .map(|(text, frequency)| Word { text: text.to_owned(), frequency: *frequency })
            .collect();
        words.sort_by(vocab_order);
        Vocabulary::from_sorted(words)
    }
}


/// Words sorted by descending frequency then ascending text. The id of a word
/// is its position in that order.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Vocabulary {
    words: Vec<Word>,
    t2i: HashMap<String, TokenId>,
}

impl Vocabulary {

    fn from_sorted(words: Vec<Word>) -> Vocabulary {
        let t2i = words
            .iter()
            .enumerate()
            .map(|(i, w)| (w.text.to_owned(), i))
            .collect();
        Self { words, t2i }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn id(&self, token: &str) -> Option<TokenId> {
        self.t2i.get(token).copied()
    }

    pub fn word(&self, id: TokenId) -> Option<&Word> {
        self.words.get(id)
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Word> {
        self.words.iter()
    }

    pub fn is_sorted(&self) -> bool {
        self.words.windows(2).all(|w| vocab_order(&w[0], &w[1]) == Ordering::Less)
    }

    /// Drops every word seen fewer than `min_frequency` times. Relies on the
    /// frequency order: the cut point is found by binary search and everything
    /// after it is truncated.
    pub fn trim(self, min_frequency: u64) -> Vocabulary {
        let cut = self.words.partition_point(|w| w.frequency >= min_frequency);
        self.keep_first(cut)
    }

    /// Keeps the `max_size` most frequent words.
    pub fn truncate(self, max_size: usize) -> Vocabulary {
        let cut = max_size.min(self.words.len());
        self.keep_first(cut)
    }

    fn keep_first(mut self, cut: usize) -> Vocabulary {
        if cut < self.words.len() {
            self.words.truncate(cut);
            self.t2i.retain(|_, id| *id < cut);
        }
        self
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        for w in &self.words {
            writeln!(writer, "{} {}", w.text, w.frequency)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.write(BufWriter::new(File::create(path)?))?;
        info!("saved {} words to {}", self.len(), path.display());
        Ok(())
    }

    /// Parses "<token> <frequency>" lines. The order of the lines is kept as is,
    /// a file written by anything else than `write` must already be sorted.
    pub fn read<R: BufRead>(reader: R) -> Result<Vocabulary> {

        let mut words = Vec::new();
        let mut t2i = HashMap::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = i + 1;

            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 2 {
                return Err(GloveError::malformed(line_no, format!("expected a token and a frequency, found {} fields", fields.len())));
            }
            let frequency: u64 = fields[1]
                .parse()
                .map_err(|e| GloveError::malformed(line_no, format!("bad frequency {:?}: {}", fields[1], e)))?;
            if frequency == 0 {
                return Err(GloveError::malformed(line_no, "frequency must be at least 1"));
            }
            if t2i.insert(fields[0].to_owned(), words.len()).is_some() {
                return Err(GloveError::malformed(line_no, format!("duplicate token {:?}", fields[0])));
            }
            words.push(Word::new(fields[0], frequency));
        }

        Ok(Self { words, t2i })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Vocabulary> {
        let path = path.as_ref();
        let vocab = Vocabulary::read(BufReader::new(File::open(path)?))?;
        info!("loaded {} words from {}", vocab.len(), path.display());
        Ok(vocab)
    }
}

impl<'a> IntoIterator for &'a Vocabulary {
    type Item = &'a Word;
    type IntoIter = std::slice::Iter<'a, Word>;

    fn into_iter(self) -> Self::IntoIter {
        self.words.iter()
    }
}
