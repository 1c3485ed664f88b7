use std::fmt;

use serde::Serialize;

use super::GENESIS_PAYLOAD;
use super::error::MiningError;
use super::pow::{MiningLimits, MiningObserver, PowParams, search};

/// Previous-hash sentinel recorded by the genesis block.
pub const GENESIS_PREVIOUS_HASH: u64 = 0;

/// Canonical string fed to the digest. Every field is labelled and the
/// payload is length-prefixed, so no two tuples share a preimage.
pub fn preimage(puzzle_value: u64, previous_hash: u64, payload: &str, id: u64) -> String {
    format!(
        "puzzle={};prev={};len={};payload={};id={}",
        puzzle_value,
        previous_hash,
        payload.len(),
        payload,
        id
    )
}

/// An immutable ledger entry. Built only by mining or by `from_parts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    id: u64,
    payload: String,
    previous_hash: u64,
    puzzle_value: u64, // Proof-of-Work solution
    hash: u64,         // Cached; every input above is immutable
}

impl Block {
    /// Mine a block: blocks the caller until a puzzle value is found or the
    /// search gives up.
    pub fn mine<O>(
        id: u64,
        payload: impl Into<String>,
        previous_hash: u64,
        params: &PowParams,
        limits: &MiningLimits,
        observer: &mut O,
    ) -> Result<Self, MiningError>
    where
        O: MiningObserver + ?Sized,
    {
        let payload = payload.into();
        let (puzzle_value, hash) = search(params, limits, observer, |candidate| {
            preimage(candidate, previous_hash, &payload, id)
        })?;
        let block = Self::from_parts(id, payload, previous_hash, puzzle_value, params);
        debug_assert_eq!(block.hash, hash);
        Ok(block)
    }

    /// Mine the first block of a chain.
    pub fn genesis<O>(
        params: &PowParams,
        limits: &MiningLimits,
        observer: &mut O,
    ) -> Result<Self, MiningError>
    where
        O: MiningObserver + ?Sized,
    {
        Self::mine(
            0,
            GENESIS_PAYLOAD,
            GENESIS_PREVIOUS_HASH,
            params,
            limits,
            observer,
        )
    }

    /// Rebuild a block from stored fields without mining. The puzzle value is
    /// taken as given; check it with `is_solved`.
    pub fn from_parts(
        id: u64,
        payload: impl Into<String>,
        previous_hash: u64,
        puzzle_value: u64,
        params: &PowParams,
    ) -> Self {
        let mut block = Self {
            id,
            payload: payload.into(),
            previous_hash,
            puzzle_value,
            hash: 0,
        };
        block.hash = block.compute_hash(params);
        block
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn previous_hash(&self) -> u64 {
        self.previous_hash
    }

    pub fn puzzle_value(&self) -> u64 {
        self.puzzle_value
    }

    /// Hash captured when the block was built.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Re-digest the block from its fields.
    pub fn compute_hash(&self, params: &PowParams) -> u64 {
        params.digest(
            preimage(
                self.puzzle_value,
                self.previous_hash,
                &self.payload,
                self.id,
            )
            .as_bytes(),
        )
    }

    /// `true` when the stored puzzle value solves the puzzle under `params`.
    pub fn is_solved(&self, params: &PowParams) -> bool {
        params.is_solution(self.compute_hash(params))
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-----------------------------------------")?;
        writeln!(f, "prevHash: {}", self.previous_hash)?;
        writeln!(f, "block id: {}", self.id)?;
        writeln!(f, "    data: {}", self.payload())?;
        writeln!(f, "  puzzle: {}", self.puzzle_value)?;
        writeln!(f, "    hash: {}", self.hash)?;
        write!(f, "-----------------------------------------")
    }
}
