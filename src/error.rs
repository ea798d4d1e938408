//! Error types for wdtrie

use thiserror::Error;

/// Result type alias for wdtrie operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in wdtrie operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Symbol {symbol} at index {index} is outside the alphabet [0, 4)")]
    InvalidSymbol { index: usize, symbol: u8 },

    #[error("Character {character:?} at index {index} is not a nucleotide")]
    InvalidCharacter { index: usize, character: char },

    #[error("Position {position} is out of range for a forest of length {length}")]
    PositionOutOfRange { position: usize, length: usize },

    #[error("Weight vector too short: need {needed} entries, got {got}")]
    WeightsTooShort { needed: usize, got: usize },

    #[error("Depth weight {got} at depth {depth} differs from {expected} already folded into the forest")]
    InconsistentWeights {
        depth: usize,
        expected: f64,
        got: f64,
    },

    #[error("Bucket index {index} is out of range for {available} accumulators")]
    BucketOutOfRange { index: usize, available: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Out of memory: cannot grow node arena beyond {capacity} nodes")]
    OutOfMemory { capacity: usize },

    #[error("Parse error: {0}")]
    Parse(String),
}
