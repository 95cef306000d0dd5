
mod error;
pub mod config;
pub mod corpus;
pub mod vocab;
pub mod window;
pub mod matrix;
pub mod cooccurrence;
pub mod logging;
mod pipeline;

pub use error::{GloveError, Result};
pub use corpus::{Corpus, Shard};
pub use vocab::{TokenId, Vocabulary, Word, WordFrequencies};
pub use window::ContextWindow;
pub use matrix::CooccurrenceMatrix;
pub use cooccurrence::{Accumulator, Counts};
pub use config::files_handling;
pub use config::files_handling::OutputFormat;
pub use pipeline::Pipeline;
