pub mod error;
pub mod modulo_calculator;
pub mod word_ranker;

pub use error::ModulusError;
pub use modulo_calculator::ModuloCalculator;
pub use word_ranker::{WordRanker, rank, ranks};

/// Prime commonly used to keep combinatorial counts bounded.
pub const DEFAULT_MODULUS: u64 = 1_000_000_007;
