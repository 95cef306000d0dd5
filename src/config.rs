
// imports
use crate::error::{GloveError, Result};
use self::files_handling::OutputFormat;

use std::fmt::Display;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use serde::Deserialize;

pub mod files_handling;

pub const DEFAULT_MIN_COUNT: u64 = 5;
pub const DEFAULT_WINDOW_SIZE: usize = 10;
pub const DEFAULT_NUM_THREADS: usize = 4;
pub const VOCAB_FILE: &str = "vocab.txt";
pub const COOC_STEM: &str = "cooccurrence";


#[derive(Clone, Debug, PartialEq)]
pub struct VocabParams {
    pub corpus_file: PathBuf,
    pub output: PathBuf,
    pub min_count: u64,
    pub max_vocab: Option<usize>,
}

impl Display for VocabParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vocabulary params:
        corpus_file: {}
        output: {}
        min_count: {}
        max_vocab: {:?}",
        self.corpus_file.display(), self.output.display(), self.min_count, self.max_vocab)
    }
}


#[derive(Clone, Debug, PartialEq)]
pub struct CooccurParams {
    pub corpus_file: PathBuf,
    pub vocab_file: PathBuf,
    pub output: PathBuf,
    pub min_count: u64,
    pub window_size: usize,
    pub format: OutputFormat,
    pub compress: bool,
    pub num_threads: usize,
    pub num_shards: usize,
}

impl CooccurParams {
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(GloveError::Usage("window_size must be at least 1".to_string()));
        }
        if self.num_threads == 0 {
            return Err(GloveError::Usage("num_threads must be at least 1".to_string()));
        }
        if self.num_shards == 0 {
            return Err(GloveError::Usage("num_shards must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Display for CooccurParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cooccurrence params:
        corpus_file: {}
        vocab_file: {}
        output: {}
        min_count: {}
        window_size: {}
        format: {}
        compress: {}
        num_threads: {}
        num_shards: {}",
        self.corpus_file.display(), self.vocab_file.display(), self.output.display(), self.min_count,
        self.window_size, self.format, self.compress, self.num_threads, self.num_shards)
    }
}


fn default_min_count() -> u64 { DEFAULT_MIN_COUNT }
fn default_window_size() -> usize { DEFAULT_WINDOW_SIZE }
fn default_num_threads() -> usize { DEFAULT_NUM_THREADS }

/// Layout of the json file given to `run --config`. Only `corpus_file` and
/// `output_dir` are required.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct JsonTypes {
    pub corpus_file: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default = "default_min_count")]
    pub min_count: u64,
    #[serde(default)]
    pub max_vocab: Option<usize>,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    // defaults to num_threads
    #[serde(default)]
    pub num_shards: Option<usize>,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub compress: bool,
    // reuse <output_dir>/vocab.txt instead of counting the corpus again
    #[serde(default)]
    pub saved_vocab: bool,
}

impl Display for JsonTypes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "using params:
        corpus_file: {}
        output_dir: {}
        min_count: {}
        max_vocab: {:?}
        window_size: {}
        num_threads: {}
        num_shards: {:?}
        format: {}
        compress: {}
        saved_vocab: {}",
        self.corpus_file.display(), self.output_dir.display(), self.min_count, self.max_vocab, self.window_size,
        self.num_threads, self.num_shards, self.format, self.compress, self.saved_vocab)
    }
}

impl JsonTypes {

    pub fn vocab_file(&self) -> PathBuf {
        self.output_dir.join(VOCAB_FILE)
    }

    pub fn vocab_params(&self) -> VocabParams {
        VocabParams {
            corpus_file: self.corpus_file.clone(),
            output: self.vocab_file(),
            min_count: self.min_count,
            max_vocab: self.max_vocab,
        }
    }

    pub fn cooccur_params(&self) -> CooccurParams {
        CooccurParams {
            corpus_file: self.corpus_file.clone(),
            vocab_file: self.vocab_file(),
            output: self.output_dir.join(self.format.file_name(COOC_STEM, self.compress)),
            min_count: self.min_count,
            window_size: self.window_size,
            format: self.format,
            compress: self.compress,
            num_threads: self.num_threads,
            num_shards: self.num_shards.unwrap_or(self.num_threads),
        }
    }
}


pub struct Config {
    params: JsonTypes
}

impl Config {

    pub fn get_params(&self) -> JsonTypes {
        self.params.clone()
    }

    pub fn from_json_str(json: &str) -> Result<Config> {
        let params: JsonTypes = serde_json::from_str(json)
            .map_err(|e| GloveError::Usage(format!("bad configuration: {}", e)))?;
        Config::checked(params)
    }

    pub fn new<P: AsRef<Path>>(json_file: P) -> Result<Config> {
        // a missing file is an io error, a bad field is a usage error
        let f = BufReader::new(File::open(json_file.as_ref())?);
        let params: JsonTypes = serde_json::from_reader(f)
            .map_err(|e| GloveError::Usage(format!("bad configuration in {}: {}", json_file.as_ref().display(), e)))?;
        Config::checked(params)
    }

    fn checked(params: JsonTypes) -> Result<Config> {
        params.cooccur_params().validate()?;
        Ok(Self { params })
    }
}
