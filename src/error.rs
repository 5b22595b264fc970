use std::time::Duration;

use thiserror::Error;

/// Errors reported while configuring a minter or minting an identifier.
///
/// Every variant carries the values that triggered it rather than a preformatted message.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum Error {
    /// The node ID is outside `0..=max`.
    #[error("node id {node_id} out of range 0..={max}")]
    InvalidNodeId { node_id: i64, max: u16 },

    /// A required environment variable is not set.
    #[error("environment variable {var} not set")]
    MissingEnv { var: &'static str },

    /// An environment variable could not be interpreted.
    #[error("invalid value {value:?} for environment variable {var}")]
    InvalidEnv { var: &'static str, value: String },

    /// The system clock reads earlier than the timestamp of the last issued identifier.
    ///
    /// The minter should be considered unsafe until the clock has been confirmed sane; it does
    /// not retry on its own.
    #[error("clock moved backwards: now {now_ms} ms, last issued at {last_ms} ms")]
    ClockRewind { now_ms: u64, last_ms: u64 },

    /// The sequence of the current millisecond is exhausted and the system clock did not advance
    /// within the configured stall timeout.
    #[error("clock stuck at {last_ms} ms for {waited:?} while waiting for the next millisecond")]
    ClockStalled { last_ms: u64, waited: Duration },

    /// The clock reading cannot be encoded relative to the epoch, either because it is earlier
    /// than the epoch or because the elapsed time does not fit the timestamp field.
    #[error("timestamp {unix_ts_ms} ms not representable relative to epoch {epoch_ms} ms")]
    TimestampOutOfRange { unix_ts_ms: u64, epoch_ms: u64 },
}

impl Error {
    /// Returns true if the error stems from the configuration rather than the clock.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidNodeId { .. } | Self::MissingEnv { .. } | Self::InvalidEnv { .. }
        )
    }
}
