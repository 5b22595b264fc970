//! Identifier minter and related types.

use std::{thread, time};

use log::{debug, trace, warn};

use crate::{Builder, Components, Config, Error, FlakeId, MAX_SEQUENCE, MAX_TIMESTAMP_DELTA};


/// A trait that defines the minimum system clock interface for [`Minter`].
///
/// Any `FnMut() -> u64` closure is a time source, which is convenient for simulated clocks.
pub trait TimeSource {
    /// Returns the current Unix timestamp in milliseconds.
    fn unix_ts_ms(&mut self) -> u64;
}

/// The default [`TimeSource`] that uses [`std::time::SystemTime`].
///
/// A system clock set before the Unix epoch reads as zero.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default)]
pub struct StdSystemTime;

impl TimeSource for StdSystemTime {
    fn unix_ts_ms(&mut self) -> u64 {
        time::SystemTime::now()
            .duration_since(time::UNIX_EPOCH)
            .map_or(0, saturating_millis)
    }
}

/// Converts to whole milliseconds, saturating readings beyond `u64` so that they are reported as
/// [`Error::TimestampOutOfRange`] instead of wrapping around.
fn saturating_millis(d: time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl<F: FnMut() -> u64> TimeSource for F {
    fn unix_ts_ms(&mut self) -> u64 {
        self()
    }
}

/// Represents an identifier minter that encapsulates a node ID, the last issued timestamp, and a
/// sequence counter, and guarantees the monotonic order of identifiers it issues.
///
/// The minter owns its state exclusively; `generate` takes `&mut self`. Minters are not
/// `Clone`; two copies would carry the same node ID and state and issue the same identifiers. Use
/// [`SharedMinter`](crate::SharedMinter), whose clones share one minter, to mint from several
/// places.
///
/// # Examples
///
/// ```rust
/// use flakeid::Minter;
///
/// let mut g = Minter::new(1)?;
/// let a = g.generate()?;
/// let b = g.generate()?;
/// assert!(a < b);
/// assert_eq!(g.parse(b.as_u64()).worker_id, 1);
/// # Ok::<(), flakeid::Error>(())
/// ```
///
/// # Clock handling
///
/// | Situation                             | Outcome                                        |
/// | ------------------------------------- | ---------------------------------------------- |
/// | New millisecond                       | Sequence restarts at zero                      |
/// | Same millisecond                      | Sequence is incremented                        |
/// | Same millisecond, sequence exhausted  | Waits for the next millisecond                 |
/// | Clock did not advance in time         | [`Error::ClockStalled`]                        |
/// | Clock earlier than last issued        | [`Error::ClockRewind`]                         |
/// | Clock earlier than epoch or too late  | [`Error::TimestampOutOfRange`]                 |
///
/// No failing call changes the minter state.
#[derive(Debug)]
pub struct Minter<T> {
    node_id: u16,
    epoch_ms: u64,
    poll_interval: time::Duration,
    stall_timeout: Option<time::Duration>,

    /// `None` until the first identifier is issued.
    last_timestamp: Option<u64>,
    last_sequence: u16,

    /// The system clock used by the minter.
    time_source: T,
}

impl Minter<StdSystemTime> {
    /// Creates a minter with the default configuration and the system clock.
    ///
    /// Fails with [`Error::InvalidNodeId`] unless `0 <= node_id <= 1023`.
    pub fn new(node_id: i64) -> Result<Self, Error> {
        Self::with_time_source(node_id, StdSystemTime)
    }

    /// Returns a builder to customize the epoch and the overflow wait.
    pub fn builder() -> Builder {
        Builder::default()
    }
}

impl<T: TimeSource> Minter<T> {
    /// Creates a minter with the default configuration and the specified clock.
    pub fn with_time_source(node_id: i64, time_source: T) -> Result<Self, Error> {
        Self::from_config(
            &Config {
                node_id,
                ..Default::default()
            },
            time_source,
        )
    }

    /// Creates a minter from a configuration and the specified clock.
    pub fn from_config(config: &Config, time_source: T) -> Result<Self, Error> {
        let node_id = config.validate()?;
        debug!(
            "flakeid: minter created for node {} with epoch {}",
            node_id, config.epoch_ms
        );
        Ok(Self {
            node_id,
            epoch_ms: config.epoch_ms,
            poll_interval: config.poll_interval,
            stall_timeout: config.stall_timeout,
            last_timestamp: None,
            last_sequence: 0,
            time_source,
        })
    }

    /// Generates a new identifier from the current timestamp.
    ///
    /// See the [`Minter`] type documentation for the failure modes. A failure leaves the state
    /// untouched, so a [`Error::ClockRewind`] keeps being reported until the clock catches up.
    pub fn generate(&mut self) -> Result<FlakeId, Error> {
        let now_ms = self.time_source.unix_ts_ms();
        let (timestamp, sequence) = match self.last_timestamp {
            Some(last_ms) if now_ms < last_ms => {
                warn!(
                    "flakeid: clock moved backwards by {} ms on node {}",
                    last_ms - now_ms,
                    self.node_id
                );
                return Err(Error::ClockRewind { now_ms, last_ms });
            }
            Some(last_ms) if now_ms == last_ms => {
                let sequence = (self.last_sequence + 1) & MAX_SEQUENCE;
                if sequence == 0 {
                    trace!(
                        "flakeid: sequence exhausted at {} ms on node {}",
                        last_ms,
                        self.node_id
                    );
                    (self.wait_next_millis(last_ms)?, 0)
                } else {
                    (now_ms, sequence)
                }
            }
            _ => (now_ms, 0),
        };

        let id = self.encode(timestamp, sequence)?;
        self.last_timestamp = Some(timestamp);
        self.last_sequence = sequence;
        Ok(id)
    }

    /// Re-samples the clock until it reads later than `last_ms`, sleeping between samples.
    fn wait_next_millis(&mut self, last_ms: u64) -> Result<u64, Error> {
        let started = time::Instant::now();
        loop {
            thread::sleep(self.poll_interval);
            let now_ms = self.time_source.unix_ts_ms();
            if now_ms > last_ms {
                return Ok(now_ms);
            } else if now_ms < last_ms {
                warn!(
                    "flakeid: clock moved backwards by {} ms on node {} while waiting",
                    last_ms - now_ms,
                    self.node_id
                );
                return Err(Error::ClockRewind { now_ms, last_ms });
            }

            let waited = started.elapsed();
            if self.stall_timeout.is_some_and(|limit| waited >= limit) {
                warn!(
                    "flakeid: clock stuck at {} ms for {:?} on node {}",
                    last_ms, waited, self.node_id
                );
                return Err(Error::ClockStalled { last_ms, waited });
            }
        }
    }

    /// Packs a timestamp and a sequence with the node ID of this minter.
    fn encode(&self, unix_ts_ms: u64, sequence: u16) -> Result<FlakeId, Error> {
        match unix_ts_ms.checked_sub(self.epoch_ms) {
            Some(delta) if delta <= MAX_TIMESTAMP_DELTA => {
                Ok(FlakeId::from_fields(delta, self.node_id, sequence))
            }
            _ => Err(Error::TimestampOutOfRange {
                unix_ts_ms,
                epoch_ms: self.epoch_ms,
            }),
        }
    }

    /// Decomposes an identifier, measuring time from the epoch of this minter.
    ///
    /// Any 64-bit value decodes, whether or not this minter produced it.
    pub fn parse(&self, id: u64) -> Components {
        Components::from_id(FlakeId::from(id), self.epoch_ms)
    }
}

impl<T> Minter<T> {
    /// Returns the node ID.
    pub fn node_id(&self) -> u16 {
        self.node_id
    }

    /// Returns the epoch in milliseconds since the Unix epoch.
    pub fn epoch_ms(&self) -> u64 {
        self.epoch_ms
    }

    /// Returns the timestamp of the last issued identifier, or `None` if none has been issued.
    pub fn last_timestamp(&self) -> Option<u64> {
        self.last_timestamp
    }

    /// Returns the sequence of the last issued identifier.
    pub fn last_sequence(&self) -> u16 {
        self.last_sequence
    }
}

/// Supports operations as an infinite iterator that calls [`Minter::generate`] for each call of
/// `next()`.
///
/// # Examples
///
/// ```rust
/// use flakeid::Minter;
///
/// let ids = Minter::new(3)?.take(4).collect::<Result<Vec<_>, _>>()?;
/// assert!(ids.windows(2).all(|w| w[0] < w[1]));
/// # Ok::<(), flakeid::Error>(())
/// ```
impl<T: TimeSource> Iterator for Minter<T> {
    type Item = Result<FlakeId, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.generate())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

impl<T: TimeSource> std::iter::FusedIterator for Minter<T> {}
