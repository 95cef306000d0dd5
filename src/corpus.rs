
// imports
use crate::error::{GloveError, Result};

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use log::debug;

// size of each backwards read when collecting the context that precedes a shard
const LOOKBEHIND_CHUNK: u64 = 4096;

// upper bound on the bytes tokenized at once by a token stream
const READ_CHUNK: usize = 16 * 1024;


// defines the behavior needed for tokenizing a corpus
pub trait Tokenizer {
    // returns every token of `sequence` together with its byte offset in `sequence`
    fn tokenize(sequence: &str) -> Vec<(usize, &str)>;
}

pub struct Whitespace {}

impl Tokenizer for Whitespace {
    // tokens are maximal runs of non-whitespace characters, nothing is normalized
    fn tokenize(sequence: &str) -> Vec<(usize, &str)> {
        let mut tokens = Vec::new();
        let mut start: Option<usize> = None;
        for (i, c) in sequence.char_indices() {
            if c.is_whitespace() {
                if let Some(s) = start.take() {
                    tokens.push((s, &sequence[s..i]));
                }
            } else if start.is_none() {
                start = Some(i);
            }
        }
        if let Some(s) = start {
            tokens.push((s, &sequence[s..]));
        }
        tokens
    }
}


/// A byte range of a corpus file. Both ends sit on whitespace (or on the ends
/// of the file) so a token always belongs to exactly one shard: the one its
/// first byte falls in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shard {
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl Shard {
    pub fn contains(&self, offset: u64) -> bool {
        self.start <= offset && offset < self.end
    }
}


/// A corpus text file. Every call to `tokens` re-opens the file, so a corpus
/// can be scanned as many times as needed (once for counting, once for
/// cooccurrences).
#[derive(Clone, Debug)]
pub struct Corpus {
    path: PathBuf,
}

impl Corpus {

    pub fn new<P: AsRef<Path>>(path: P) -> Corpus {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    pub fn tokens(&self) -> Result<Tokens<BufReader<File>>> {
        self.tokens_from(0)
    }

    // tokens starting at byte `offset`, which must not fall inside a token
    pub fn tokens_from(&self, offset: u64) -> Result<Tokens<BufReader<File>>> {
        let mut f = File::open(&self.path)?;
        if offset > 0 {
            f.seek(SeekFrom::Start(offset))?;
        }
        Ok(Tokens::new(BufReader::new(f), offset))
    }

    pub fn plan_shards(&self, n_shards: usize) -> Result<Vec<Shard>> {

        // nominal boundaries are evenly spaced, each one is then pushed forward to
        // the next whitespace byte so that no token is split between two shards.
        if n_shards == 0 {
            return Err(GloveError::Usage("number of shards must be at least 1".to_string()));
        }

        let size = self.size()?;
        let mut f = BufReader::new(File::open(&self.path)?);
        let mut shards = Vec::new();
        let mut start = 0;

        for i in 1..=n_shards {
            let nominal = if i == n_shards { size } else { size * i as u64 / n_shards as u64 };
            let end = if nominal <= start || nominal >= size {
                nominal.max(start).min(size)
            } else {
                Corpus::align_to_whitespace(&mut f, nominal, size)?
            };
            if end > start {
                shards.push(Shard { index: shards.len(), start, end });
                start = end;
            }
        }

        debug!("planned {} shards over {} bytes of {}", shards.len(), size, self.path.display());
        Ok(shards)
    }

    fn align_to_whitespace<R: BufRead + Seek>(reader: &mut R, from: u64, size: u64) -> io::Result<u64> {
        reader.seek(SeekFrom::Start(from))?;
        let mut position = from;
        loop {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                return Ok(size);
            }
            if let Some(i) = buf.iter().position(|b| b.is_ascii_whitespace()) {
                return Ok(position + i as u64);
            }
            let n = buf.len();
            reader.consume(n);
            position += n as u64;
        }
    }

    pub fn preceding<T, F>(&self, offset: u64, count: usize, mut resolve: F) -> Result<Vec<T>>
    where F: FnMut(&str) -> Option<T> {

        // collects the last `count` tokens before `offset` that `resolve` accepts.
        // the file is scanned backwards one chunk at a time; the bytes before the
        // first whitespace of a chunk may be the tail of a token, they are carried
        // over and completed by the next (earlier) chunk.
        if count == 0 || offset == 0 {
            return Ok(Vec::new());
        }

        let mut f = File::open(&self.path)?;
        let mut found: Vec<T> = Vec::with_capacity(count);
        let mut carry: Vec<u8> = Vec::new();
        let mut end = offset;

        while end > 0 && found.len() < count {
            let start = end.saturating_sub(LOOKBEHIND_CHUNK);
            let mut buf = vec![0u8; (end - start) as usize];
            f.seek(SeekFrom::Start(start))?;
            f.read_exact(&mut buf)?;
            buf.append(&mut carry);

            let split = if start == 0 { Some(0) } else { buf.iter().position(|b| b.is_ascii_whitespace()) };
            match split {
                Some(split) => {
                    let text = std::str::from_utf8(&buf[split..])
                        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                    for (_, tok) in Whitespace::tokenize(text).into_iter().rev() {
                        if let Some(t) = resolve(tok) {
                            found.push(t);
                            if found.len() == count {
                                break;
                            }
                        }
                    }
                    buf.truncate(split);
                    carry = buf;
                }
                // one token longer than the whole chunk
                None => carry = buf,
            }
            end = start;
        }

        found.reverse();
        Ok(found)
    }

}


/// Lazy token stream over a reader, yielding each token with its absolute byte
/// offset in the corpus.
///
/// The reader is consumed in chunks of at most `READ_CHUNK` bytes, cut after
/// their last ASCII whitespace byte; an unfinished token is carried over to
/// the next read. Memory stays bounded whatever the line length of the corpus.
pub struct Tokens<R> {
    reader: R,
    carry: Vec<u8>,
    pending: VecDeque<(u64, String)>,
    // offset of the first byte of `carry`
    offset: u64,
    done: bool,
}

impl<R: BufRead> Tokens<R> {

    pub fn new(reader: R, offset: u64) -> Tokens<R> {
        Self {
            reader,
            carry: Vec::new(),
            pending: VecDeque::new(),
            offset,
            done: false,
        }
    }

    // reads chunks until at least one token is pending, false on eof
    fn fill(&mut self) -> io::Result<bool> {
        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                // eof, whatever is carried is the last token
                if self.carry.is_empty() {
                    return Ok(false);
                }
                let segment = std::mem::take(&mut self.carry);
                self.push_segment(&segment)?;
                return Ok(!self.pending.is_empty());
            }

            let take = buf.len().min(READ_CHUNK);
            match buf[..take].iter().rposition(|b| b.is_ascii_whitespace()) {
                Some(i) => {
                    self.carry.extend_from_slice(&buf[..=i]);
                    self.reader.consume(i + 1);
                    let segment = std::mem::take(&mut self.carry);
                    self.push_segment(&segment)?;
                    if !self.pending.is_empty() {
                        return Ok(true);
                    }
                }
                None => {
                    self.carry.extend_from_slice(&buf[..take]);
                    self.reader.consume(take);
                }
            }
        }
    }

    // `segment` starts at `self.offset` and ends on whitespace or at eof
    fn push_segment(&mut self, segment: &[u8]) -> io::Result<()> {
        let text = std::str::from_utf8(segment)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        for (i, tok) in Whitespace::tokenize(text) {
            self.pending.push_back((self.offset + i as u64, tok.to_owned()));
        }
        self.offset += segment.len() as u64;
        Ok(())
    }
}

impl<R: BufRead> Iterator for Tokens<R> {
    type Item = io::Result<(u64, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(tok) = self.pending.pop_front() {
            return Some(Ok(tok));
        }
        if self.done {
            return None;
        }
        match self.fill() {
            Ok(true) => self.pending.pop_front().map(Ok),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
