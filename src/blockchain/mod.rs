pub mod block;
pub mod digest;
pub mod error;
pub mod model;
pub mod pow;

pub use block::Block;
pub use error::{ChainError, ParamsError};
pub use model::{Blockchain, LinkCheck, LinkStatus};
pub use pow::{Deadline, LogProgress, MiningLimits, PowParams};

/// Tail hash reported by an empty chain; seeds the first block's `previous_hash`.
pub const EMPTY_TAIL_HASH: u64 = 0;

/// Marker payload of the genesis block.
pub const GENESIS_PAYLOAD: &str = "Genesis Block";

/// Payloads mined on startup when demo seeding is enabled.
pub const DEMO_PAYLOADS: [&str; 11] = [
    "Tomorrow, and tomorrow, and tomorrow,",
    "Creeps in this petty pace from day to day,",
    "To the last syllable of recorded time;",
    "And all our yesterdays have lighted fools",
    "The way to dusty death. Out, out, brief candle!",
    "Life's but a walking shadow, a poor player,",
    "That struts and frets his hour upon the stage,",
    "And then is heard no more. It is a tale",
    "Told by an idiot, full of sound and fury,",
    "Signifying nothing.",
    "------ The End ------",
];
