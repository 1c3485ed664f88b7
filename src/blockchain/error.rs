use thiserror::Error;

/// Invalid digest/puzzle parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("moduli must be non-zero")]
    ZeroModulus,
    #[error("target modulus {target} exceeds digest modulus {digest}; no hash could ever solve it")]
    TargetExceedsDigest { target: u64, digest: u64 },
}

/// Why a puzzle search stopped without a solution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiningError {
    #[error("puzzle unsolved after {attempts} attempts")]
    Unsolved { attempts: u64 },
    #[error("mining cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },
    #[error("puzzle value counter exhausted")]
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("no block at position {position} (chain length {len})")]
    OutOfRange { position: usize, len: usize },
    #[error("block was mined on {mined_on} but the tail is now {tail}")]
    StaleTail { mined_on: u64, tail: u64 },
    #[error(transparent)]
    Mining(#[from] MiningError),
}
