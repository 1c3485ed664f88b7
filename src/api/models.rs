use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::blockchain::{Block, Blockchain, LinkCheck, MiningLimits, PowParams};

/// Shared application state with a single in-memory chain.
pub struct AppState {
    pub blockchain: Mutex<Blockchain>,
    pub limits: MiningLimits,
    pub mining_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(
        blockchain: Blockchain,
        limits: MiningLimits,
        mining_timeout: Option<Duration>,
    ) -> Self {
        Self {
            blockchain: Mutex::new(blockchain),
            limits,
            mining_timeout,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            Blockchain::new(PowParams::default()),
            MiningLimits::default(),
            None,
        )
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse<'a> {
    pub length: usize,
    pub params: PowParams,
    pub chain: &'a [Block],
}

#[derive(Serialize)]
pub struct TailResponse {
    pub tail_hash: u64,
    pub next_id: u64,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub length: usize,
    pub links: Vec<LinkCheck>,
    /// Ids of blocks failing the puzzle condition.
    pub unsolved: Vec<u64>,
}

/* ---------- Mining API Models ---------- */

#[derive(Deserialize)]
pub struct MineRequest {
    pub payload: String,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub block: Block,
    pub elapsed_ms: u64,
}
