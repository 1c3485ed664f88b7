use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::Serialize;

use super::digest::{COMPACT_DIGEST_MODULUS, digest};
use super::error::{MiningError, ParamsError};

/// Default puzzle target modulus: a hash solves the puzzle when its last five
/// decimal digits are all nines.
pub const DEFAULT_TARGET_MODULUS: u64 = 100_000;

/// Default number of attempts between two progress notifications.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000;

/// How many expected solve times (`target_modulus` attempts each) a search may
/// burn before giving up, when no explicit budget is configured.
pub const DEFAULT_BUDGET_FACTOR: u64 = 100;

/// Numeric parameters shared by the digest and the puzzle condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PowParams {
    digest_modulus: u64,
    target_modulus: u64,
    search_offset: u64,
}

impl PowParams {
    /// Build parameters whose search starts just above `target_modulus`.
    pub fn new(digest_modulus: u64, target_modulus: u64) -> Result<Self, ParamsError> {
        Self::with_offset(digest_modulus, target_modulus, target_modulus)
    }

    pub fn with_offset(
        digest_modulus: u64,
        target_modulus: u64,
        search_offset: u64,
    ) -> Result<Self, ParamsError> {
        if digest_modulus == 0 || target_modulus == 0 {
            return Err(ParamsError::ZeroModulus);
        }
        if target_modulus > digest_modulus {
            return Err(ParamsError::TargetExceedsDigest {
                target: target_modulus,
                digest: digest_modulus,
            });
        }
        Ok(Self {
            digest_modulus,
            target_modulus,
            search_offset,
        })
    }

    pub fn digest_modulus(&self) -> u64 {
        self.digest_modulus
    }

    pub fn target_modulus(&self) -> u64 {
        self.target_modulus
    }

    pub fn search_offset(&self) -> u64 {
        self.search_offset
    }

    pub fn digest(&self, data: &[u8]) -> u64 {
        digest(data, self.digest_modulus)
    }

    /// `true` when `hash` satisfies the puzzle condition.
    pub fn is_solution(&self, hash: u64) -> bool {
        hash % self.target_modulus == self.target_modulus - 1
    }
}

impl Default for PowParams {
    fn default() -> Self {
        Self {
            digest_modulus: COMPACT_DIGEST_MODULUS,
            target_modulus: DEFAULT_TARGET_MODULUS,
            search_offset: DEFAULT_TARGET_MODULUS,
        }
    }
}

/// Bounds placed on a single search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningLimits {
    /// `None` searches forever.
    pub max_attempts: Option<u64>,
    pub progress_interval: u64,
}

impl MiningLimits {
    pub fn for_params(params: &PowParams) -> Self {
        Self {
            max_attempts: Some(params.target_modulus().saturating_mul(DEFAULT_BUDGET_FACTOR)),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl Default for MiningLimits {
    fn default() -> Self {
        Self::for_params(&PowParams::default())
    }
}

/// Receives a callback every `progress_interval` attempts. Returning
/// `ControlFlow::Break` cancels the search.
pub trait MiningObserver {
    fn on_progress(&mut self, attempts: u64, candidate: u64) -> ControlFlow<()>;
}

impl MiningObserver for () {
    fn on_progress(&mut self, _attempts: u64, _candidate: u64) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

impl<F> MiningObserver for F
where
    F: FnMut(u64, u64) -> ControlFlow<()>,
{
    fn on_progress(&mut self, attempts: u64, candidate: u64) -> ControlFlow<()> {
        self(attempts, candidate)
    }
}

impl<A: MiningObserver, B: MiningObserver> MiningObserver for (A, B) {
    fn on_progress(&mut self, attempts: u64, candidate: u64) -> ControlFlow<()> {
        if self.0.on_progress(attempts, candidate).is_break() {
            return ControlFlow::Break(());
        }
        self.1.on_progress(attempts, candidate)
    }
}

impl<O: MiningObserver> MiningObserver for Option<O> {
    fn on_progress(&mut self, attempts: u64, candidate: u64) -> ControlFlow<()> {
        match self {
            Some(inner) => inner.on_progress(attempts, candidate),
            None => ControlFlow::Continue(()),
        }
    }
}

/// Logs a progress line at debug level for each milestone.
#[derive(Debug, Clone, Copy)]
pub struct LogProgress {
    pub block_id: u64,
}

impl MiningObserver for LogProgress {
    fn on_progress(&mut self, attempts: u64, candidate: u64) -> ControlFlow<()> {
        debug!(
            "MINER - block #{} still searching (attempts={}, candidate={})",
            self.block_id, attempts, candidate
        );
        ControlFlow::Continue(())
    }
}

/// Cancels the search once a wall-clock budget is spent. Only checked at
/// progress milestones.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    until: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            until: Instant::now() + budget,
        }
    }
}

impl MiningObserver for Deadline {
    fn on_progress(&mut self, attempts: u64, _candidate: u64) -> ControlFlow<()> {
        if Instant::now() >= self.until {
            warn!("MINER - time budget spent after {} attempts", attempts);
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }
}

/// Linear scan for the first puzzle value above the search offset whose
/// preimage digest solves the puzzle. Returns `(puzzle_value, hash)`.
pub fn search<P, O>(
    params: &PowParams,
    limits: &MiningLimits,
    observer: &mut O,
    preimage: P,
) -> Result<(u64, u64), MiningError>
where
    P: Fn(u64) -> String,
    O: MiningObserver + ?Sized,
{
    // a zero interval would silence the observer, and with it cancellation
    let interval = limits.progress_interval.max(1);
    let mut candidate = params.search_offset();
    let mut attempts: u64 = 0;
    loop {
        if limits.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(MiningError::Unsolved { attempts });
        }
        candidate = candidate.checked_add(1).ok_or(MiningError::Exhausted)?;
        attempts += 1;

        let hash = params.digest(preimage(candidate).as_bytes());
        if params.is_solution(hash) {
            return Ok((candidate, hash));
        }

        if attempts % interval == 0
            && observer.on_progress(attempts, candidate).is_break()
        {
            return Err(MiningError::Cancelled { attempts });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::block::preimage;

    fn small_params() -> PowParams {
        PowParams::new(COMPACT_DIGEST_MODULUS, 100).unwrap()
    }

    #[test]
    fn rejects_degenerate_moduli() {
        assert_eq!(PowParams::new(0, 10), Err(ParamsError::ZeroModulus));
        assert_eq!(PowParams::new(10, 0), Err(ParamsError::ZeroModulus));
        assert!(matches!(
            PowParams::new(10, 11),
            Err(ParamsError::TargetExceedsDigest { .. })
        ));
    }

    #[test]
    fn default_search_starts_above_target() {
        let params = PowParams::default();
        assert_eq!(params.search_offset(), DEFAULT_TARGET_MODULUS);
        assert_eq!(params.digest_modulus(), COMPACT_DIGEST_MODULUS);
    }

    #[test]
    fn solution_condition() {
        let params = small_params();
        assert!(params.is_solution(99));
        assert!(params.is_solution(12_399));
        assert!(!params.is_solution(100));
        assert!(!params.is_solution(98));
    }

    #[test]
    fn finds_first_solution_above_offset() {
        let params = small_params();
        let image = |n: u64| preimage(n, 0, "search", 0);
        let (value, hash) =
            search(&params, &MiningLimits::for_params(&params), &mut (), image).unwrap();

        assert!(value > params.search_offset());
        assert!(params.is_solution(hash));
        assert_eq!(hash, params.digest(image(value).as_bytes()));
        for earlier in (params.search_offset() + 1)..value {
            assert!(!params.is_solution(params.digest(image(earlier).as_bytes())));
        }
    }

    #[test]
    fn attempt_budget_surfaces_unsolved() {
        let params = PowParams::new(COMPACT_DIGEST_MODULUS, 1_000_000).unwrap();
        let limits = MiningLimits {
            max_attempts: Some(3),
            progress_interval: 1,
        };
        // constant preimage: the digest never changes, so it never solves
        let result = search(&params, &limits, &mut (), |_| String::from("xyz"));
        assert_eq!(result, Err(MiningError::Unsolved { attempts: 3 }));
    }

    #[test]
    fn observer_can_cancel() {
        let params = PowParams::new(COMPACT_DIGEST_MODULUS, 1_000_000).unwrap();
        let limits = MiningLimits {
            max_attempts: None,
            progress_interval: 5,
        };
        let mut seen = Vec::new();
        let mut observer = |attempts: u64, _candidate: u64| {
            seen.push(attempts);
            if attempts >= 10 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        };
        let result = search(&params, &limits, &mut observer, |_| String::from("xyz"));
        assert_eq!(result, Err(MiningError::Cancelled { attempts: 10 }));
        assert_eq!(seen, vec![5, 10]);
    }

    #[test]
    fn expired_deadline_cancels_at_first_milestone() {
        let params = PowParams::new(COMPACT_DIGEST_MODULUS, 1_000_000).unwrap();
        let limits = MiningLimits {
            max_attempts: None,
            progress_interval: 2,
        };
        let mut observer = (LogProgress { block_id: 0 }, Deadline::after(Duration::ZERO));
        let result = search(&params, &limits, &mut observer, |_| String::from("xyz"));
        assert_eq!(result, Err(MiningError::Cancelled { attempts: 2 }));
    }

    #[test]
    fn zero_interval_still_honours_deadline() {
        let params = PowParams::new(COMPACT_DIGEST_MODULUS, 1_000_000).unwrap();
        let limits = MiningLimits {
            max_attempts: Some(50_000),
            progress_interval: 0,
        };
        let mut observer = Deadline::after(Duration::ZERO);
        let result = search(&params, &limits, &mut observer, |_| String::from("xyz"));
        assert_eq!(result, Err(MiningError::Cancelled { attempts: 1 }));
    }

    #[test]
    fn counter_overflow_is_exhausted() {
        let params =
            PowParams::with_offset(COMPACT_DIGEST_MODULUS, 1_000_000, u64::MAX - 2).unwrap();
        let limits = MiningLimits {
            max_attempts: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        };
        let result = search(&params, &limits, &mut (), |_| String::from("xyz"));
        assert_eq!(result, Err(MiningError::Exhausted));
    }
}
