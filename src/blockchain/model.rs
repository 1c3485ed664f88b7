use std::fmt::Write as _;

use log::{info, warn};
use serde::Serialize;

use super::EMPTY_TAIL_HASH;
use super::block::Block;
use super::error::{ChainError, MiningError};
use super::pow::{MiningLimits, MiningObserver, PowParams};

/// Outcome of one adjacency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkStatus {
    Good,
    Bad,
}

/// Result of checking `blocks[index - 1]` against `blocks[index]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkCheck {
    pub index: usize,
    pub status: LinkStatus,
    /// Re-digested hash of the predecessor.
    pub expected: u64,
    /// `previous_hash` stored in the block at `index`.
    pub recorded: u64,
}

/// Append-only in-memory chain. Linkage is not checked on append; run
/// `verify` to audit.
#[derive(Debug)]
pub struct Blockchain {
    blocks: Vec<Block>,
    next_id: u64,
    params: PowParams,
}

impl Blockchain {
    /// Create an empty chain.
    pub fn new(params: PowParams) -> Self {
        Self {
            blocks: Vec::new(),
            next_id: 0,
            params,
        }
    }

    /// Create a chain seeded with a mined genesis block.
    pub fn with_genesis<O>(
        params: PowParams,
        limits: &MiningLimits,
        observer: &mut O,
    ) -> Result<Self, MiningError>
    where
        O: MiningObserver + ?Sized,
    {
        let mut bc = Self::new(params);
        let genesis = Block::genesis(&bc.params, limits, observer)?;
        bc.append(genesis);
        Ok(bc)
    }

    pub fn params(&self) -> &PowParams {
        &self.params
    }

    /// Id the next mined block will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Add `block` at the end. No validation is performed.
    pub fn append(&mut self, block: Block) {
        self.blocks.push(block);
        self.next_id += 1;
    }

    /// Append a block mined away from the chain, provided the tail has not
    /// moved since it was mined.
    pub fn append_mined(&mut self, block: Block) -> Result<&Block, ChainError> {
        let tail = self.tail_hash();
        if block.previous_hash() != tail || block.id() != self.next_id {
            return Err(ChainError::StaleTail {
                mined_on: block.previous_hash(),
                tail,
            });
        }
        self.append(block);
        self.get(self.blocks.len() - 1)
    }

    /// Mine a block carrying `payload` on top of the current tail and append it.
    pub fn mine_block<O>(
        &mut self,
        payload: impl Into<String>,
        limits: &MiningLimits,
        observer: &mut O,
    ) -> Result<&Block, ChainError>
    where
        O: MiningObserver + ?Sized,
    {
        let id = self.next_id;
        let previous_hash = self.tail_hash();
        let block = Block::mine(id, payload, previous_hash, &self.params, limits, observer)?;
        info!(
            "MINER - sealed block #{} (hash={}, puzzle={})",
            block.id(),
            block.hash(),
            block.puzzle_value()
        );
        self.append(block);
        self.get(self.blocks.len() - 1)
    }

    /// Block at 0-based `position`.
    pub fn get(&self, position: usize) -> Result<&Block, ChainError> {
        self.blocks.get(position).ok_or(ChainError::OutOfRange {
            position,
            len: self.blocks.len(),
        })
    }

    /// Hash of the last block under this chain's params, or `EMPTY_TAIL_HASH`
    /// when the chain is empty. Digested the same way `verify` does, so a
    /// block seeded from it always links.
    pub fn tail_hash(&self) -> u64 {
        self.blocks
            .last()
            .map(|b| b.compute_hash(&self.params))
            .unwrap_or(EMPTY_TAIL_HASH)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Check every adjacent pair. Predecessors are re-digested, never re-mined,
    /// and the pass reports all links instead of stopping at the first bad one.
    pub fn verify(&self) -> Vec<LinkCheck> {
        self.blocks
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let expected = pair[0].compute_hash(&self.params);
                let recorded = pair[1].previous_hash();
                let status = if expected == recorded {
                    LinkStatus::Good
                } else {
                    warn!(
                        "broken link at #{}: expected prev={} recorded={}",
                        i + 1,
                        expected,
                        recorded
                    );
                    LinkStatus::Bad
                };
                LinkCheck {
                    index: i + 1,
                    status,
                    expected,
                    recorded,
                }
            })
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.verify()
            .iter()
            .all(|link| link.status == LinkStatus::Good)
    }

    /// Ids of blocks whose stored puzzle value does not solve the puzzle.
    pub fn unsolved_blocks(&self) -> Vec<u64> {
        self.blocks
            .iter()
            .filter(|b| !b.is_solved(&self.params))
            .map(Block::id)
            .collect()
    }

    /// Human-readable dump: each checked predecessor followed by the status of
    /// its link.
    pub fn report(&self) -> String {
        let mut out = String::from("Verifying Blockchain:\n\n");
        for link in self.verify() {
            let tag = match link.status {
                LinkStatus::Good => "<GOOD>",
                LinkStatus::Bad => "<BAD>",
            };
            let _ = writeln!(out, "{}  {}", self.blocks[link.index - 1], tag);
        }
        out
    }
}
