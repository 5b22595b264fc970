use std::{env, time::Duration};

use crate::{Error, Minter, StdSystemTime, TimeSource, EPOCH, MAX_NODE_ID};

/// The environment variable holding the node ID.
pub const ENV_NODE_ID: &str = "FLAKEID_NODE_ID";

/// The environment variable holding a custom epoch in milliseconds since the Unix epoch.
pub const ENV_EPOCH_MS: &str = "FLAKEID_EPOCH_MS";

/// Settings of a [`Minter`].
///
/// Every minter of a deployment must share the same epoch, and each concurrently running minter
/// needs a distinct node ID.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct Config {
    /// The node ID, `0..=1023`. Required when deserialized.
    pub node_id: i64,

    /// The epoch in milliseconds since the Unix epoch. Defaults to [`EPOCH`].
    #[cfg_attr(feature = "serde", serde(default = "default_epoch_ms"))]
    pub epoch_ms: u64,

    /// The sleep between clock samples while waiting for the next millisecond after the sequence
    /// is exhausted.
    #[cfg_attr(feature = "serde", serde(default = "default_poll_interval"))]
    pub poll_interval: Duration,

    /// How long to wait for the next millisecond before giving up with
    /// [`Error::ClockStalled`]. `None` waits forever.
    #[cfg_attr(feature = "serde", serde(default = "default_stall_timeout"))]
    pub stall_timeout: Option<Duration>,
}

fn default_epoch_ms() -> u64 {
    EPOCH
}

fn default_poll_interval() -> Duration {
    Duration::from_micros(100)
}

fn default_stall_timeout() -> Option<Duration> {
    Some(Duration::from_secs(1))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: 0,
            epoch_ms: default_epoch_ms(),
            poll_interval: default_poll_interval(),
            stall_timeout: default_stall_timeout(),
        }
    }
}

impl Config {
    /// Reads the configuration from `FLAKEID_NODE_ID` and `FLAKEID_EPOCH_MS`.
    ///
    /// The node ID is required and its absence fails with [`Error::MissingEnv`]. An unset epoch
    /// keeps the default; malformed values fail with [`Error::InvalidEnv`].
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let value = lookup(ENV_NODE_ID).ok_or(Error::MissingEnv { var: ENV_NODE_ID })?;
        let mut config = Self {
            node_id: parse_var(ENV_NODE_ID, value)?,
            ..Default::default()
        };
        if let Some(value) = lookup(ENV_EPOCH_MS) {
            config.epoch_ms = parse_var(ENV_EPOCH_MS, value)?;
        }
        Ok(config)
    }

    /// Checks the node ID range and returns the node ID narrowed to its field type.
    pub fn validate(&self) -> Result<u16, Error> {
        u16::try_from(self.node_id)
            .ok()
            .filter(|&n| n <= MAX_NODE_ID)
            .ok_or(Error::InvalidNodeId {
                node_id: self.node_id,
                max: MAX_NODE_ID,
            })
    }
}

fn parse_var<N: std::str::FromStr>(var: &'static str, value: String) -> Result<N, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidEnv { var, value })
}

/// Builds a [`Minter`] step by step.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// let mut g = flakeid::Minter::builder()
///     .node_id(12)
///     .stall_timeout(Some(Duration::from_millis(50)))
///     .build()?;
/// assert_eq!(g.generate()?.node_id(), 12);
/// # Ok::<(), flakeid::Error>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    /// Starts from an existing configuration.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Sets the node ID.
    pub fn node_id(mut self, node_id: i64) -> Self {
        self.config.node_id = node_id;
        self
    }

    /// Sets the epoch in milliseconds since the Unix epoch.
    pub fn epoch_ms(mut self, epoch_ms: u64) -> Self {
        self.config.epoch_ms = epoch_ms;
        self
    }

    /// Sets the sleep between clock samples during the overflow wait.
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.config.poll_interval = poll_interval;
        self
    }

    /// Sets the limit of the overflow wait.
    pub fn stall_timeout(mut self, stall_timeout: Option<Duration>) -> Self {
        self.config.stall_timeout = stall_timeout;
        self
    }

    /// Creates a minter driven by the system clock.
    pub fn build(self) -> Result<Minter<StdSystemTime>, Error> {
        self.build_with_time_source(StdSystemTime)
    }

    /// Creates a minter driven by the specified clock.
    pub fn build_with_time_source<T: TimeSource>(self, time_source: T) -> Result<Minter<T>, Error> {
        Minter::from_config(&self.config, time_source)
    }
}

#[cfg(test)]
mod tests {
    use super::{Builder, Config, ENV_EPOCH_MS, ENV_NODE_ID};
    use crate::{Error, EPOCH};
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    /// Accepts node IDs within range only
    #[test]
    fn accepts_node_ids_within_range_only() {
        for node_id in 0..=1023 {
            let config = Config {
                node_id,
                ..Default::default()
            };
            assert_eq!(config.validate(), Ok(node_id as u16));
        }

        for node_id in [-1, 1024, i64::MIN, i64::MAX, 65_536] {
            let config = Config {
                node_id,
                ..Default::default()
            };
            assert_eq!(
                config.validate(),
                Err(Error::InvalidNodeId { node_id, max: 1023 })
            );
        }
    }

    /// Reads settings from environment variables
    #[test]
    fn reads_settings_from_environment_variables() {
        let config =
            Config::from_lookup(lookup(&[(ENV_NODE_ID, " 17 "), (ENV_EPOCH_MS, "1000")])).unwrap();
        assert_eq!(config.node_id, 17);
        assert_eq!(config.epoch_ms, 1000);

        let config = Config::from_lookup(lookup(&[(ENV_NODE_ID, "0")])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.epoch_ms, EPOCH);
    }

    /// Requires the node ID variable
    #[test]
    fn requires_the_node_id_variable() {
        for pairs in [&[][..], &[(ENV_EPOCH_MS, "1000")][..]] {
            let err = Config::from_lookup(lookup(pairs)).unwrap_err();
            assert_eq!(err, Error::MissingEnv { var: ENV_NODE_ID });
            assert!(err.is_configuration());
        }
    }

    /// Rejects malformed environment variables
    #[test]
    fn rejects_malformed_environment_variables() {
        assert_eq!(
            Config::from_lookup(lookup(&[(ENV_NODE_ID, "seven")])),
            Err(Error::InvalidEnv {
                var: ENV_NODE_ID,
                value: "seven".to_owned()
            })
        );
        assert_eq!(
            Config::from_lookup(lookup(&[(ENV_NODE_ID, "1"), (ENV_EPOCH_MS, "-5")])),
            Err(Error::InvalidEnv {
                var: ENV_EPOCH_MS,
                value: "-5".to_owned()
            })
        );
    }

    /// Builds minters from settings
    #[test]
    fn builds_minters_from_settings() {
        let g = Builder::default()
            .node_id(9)
            .epoch_ms(42)
            .build_with_time_source(|| 1042u64)
            .unwrap();
        assert_eq!(g.node_id(), 9);
        assert_eq!(g.epoch_ms(), 42);
        assert_eq!(g.last_timestamp(), None);

        assert!(Builder::default().node_id(-1).build().is_err());
    }

    /// Deserializes partial settings
    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_partial_settings() {
        use serde_test::{assert_de_tokens, Token};

        let expected = Config {
            node_id: 3,
            ..Default::default()
        };
        assert_de_tokens(
            &expected,
            &[
                Token::Struct {
                    name: "Config",
                    len: 1,
                },
                Token::Str("node_id"),
                Token::I64(3),
                Token::StructEnd,
            ],
        );
    }

    /// Requires the node ID when deserialized
    #[cfg(feature = "serde")]
    #[test]
    fn requires_the_node_id_when_deserialized() {
        use serde_test::{assert_de_tokens_error, Token};

        assert_de_tokens_error::<Config>(
            &[
                Token::Struct {
                    name: "Config",
                    len: 1,
                },
                Token::Str("epoch_ms"),
                Token::U64(1000),
                Token::StructEnd,
            ],
            "missing field `node_id`",
        );
    }
}
