use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ModulusError {
    #[error("modulus must be at least 2, got {0}")]
    TooSmall(u64),

    #[error("modulus {0} is not prime, so some factorials have no inverse")]
    NotPrime(u64),
}
