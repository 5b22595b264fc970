//! Time-ordered 64-bit unique identifiers minted without a central authority
//!
//! ```rust
//! use flakeid::Minter;
//!
//! let mut minter = Minter::new(42)?;
//! let id = minter.generate()?;
//! println!("{}", id); // e.g. "1630544123462524928"
//!
//! let parts = minter.parse(id.as_u64());
//! assert_eq!(parts.worker_id, 42);
//! # Ok::<(), flakeid::Error>(())
//! ```
//!
//! # Field and bit layout
//!
//! Each identifier is a 64-bit unsigned integer with the following bit layout:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |0|                   timestamp_delta                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! | timestamp_delta |      node_id      |       sequence          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Where:
//!
//! - The most significant bit is always zero so that the value stays non-negative when stored as
//!   a signed 64-bit integer.
//! - The 41-bit `timestamp_delta` field holds the milliseconds elapsed since [`EPOCH`]
//!   (2018-03-01T00:00:00Z by default).
//! - The 10-bit `node_id` field identifies the minting instance and is assigned by the operator.
//! - The 12-bit `sequence` field distinguishes identifiers minted within the same millisecond. It
//!   restarts at zero on every new millisecond and is incremented by one for each identifier
//!   minted within the same millisecond.
//!
//! When all 4096 sequence values of a millisecond have been used, the minter waits for the system
//! clock to move on to the next millisecond before it issues another identifier. If the system
//! clock moves backwards, the minter refuses to issue identifiers until the clock catches up with
//! the last recorded timestamp.
//!
//! Global uniqueness relies entirely on every concurrently running minter having a distinct node
//! ID; minters never coordinate with each other.
//!
//! # Concurrent use
//!
//! [`Minter::generate`] takes `&mut self`. Wrap a minter in a [`SharedMinter`] to serialize calls
//! from multiple threads:
//!
//! ```rust
//! use flakeid::SharedMinter;
//! use std::thread;
//!
//! let minter = SharedMinter::new(7)?;
//! thread::scope(|s| {
//!     for _ in 0..4 {
//!         let minter = minter.clone();
//!         s.spawn(move || println!("{}", minter.generate().unwrap()));
//!     }
//! });
//! # Ok::<(), flakeid::Error>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

mod config;
pub use config::{Builder, Config, ENV_EPOCH_MS, ENV_NODE_ID};

mod error;
pub use error::Error;

pub mod generator;
pub use generator::{Minter, StdSystemTime, TimeSource};

mod id;
pub use id::{Components, FlakeId, ParseError};

mod shared;
pub use shared::SharedMinter;

mod global_gen;
#[cfg(feature = "global_gen")]
pub use global_gen::flakeid;

/// The default epoch, 2018-03-01T00:00:00Z, in milliseconds since the Unix epoch.
pub const EPOCH: u64 = 1_519_837_200_000;

/// The width of the `timestamp_delta` field.
pub const TIMESTAMP_BITS: u32 = 41;

/// The width of the `node_id` field.
pub const NODE_ID_BITS: u32 = 10;

/// The width of the `sequence` field.
pub const SEQUENCE_BITS: u32 = 12;

/// The largest node ID a minter accepts (1023).
pub const MAX_NODE_ID: u16 = (1 << NODE_ID_BITS) - 1;

/// The largest sequence value within a millisecond (4095).
pub const MAX_SEQUENCE: u16 = (1 << SEQUENCE_BITS) - 1;

/// The largest representable `timestamp_delta`.
pub const MAX_TIMESTAMP_DELTA: u64 = (1 << TIMESTAMP_BITS) - 1;

/// Decomposes an identifier into its fields, measuring time from the default [`EPOCH`].
///
/// Any 64-bit value decodes, whether or not a minter ever produced it.
///
/// # Examples
///
/// ```rust
/// let parts = flakeid::parse(4_194_308_096);
/// assert_eq!(parts.time, 1_519_837_201_000);
/// assert_eq!(parts.worker_id, 1);
/// assert_eq!(parts.sequence, 0);
/// ```
pub fn parse(id: u64) -> Components {
    Components::from_id(FlakeId::from(id), EPOCH)
}
