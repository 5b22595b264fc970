use std::{fmt, str};

use fstr::FStr;

use crate::{MAX_NODE_ID, MAX_SEQUENCE, MAX_TIMESTAMP_DELTA, NODE_ID_BITS, SEQUENCE_BITS};

const NODE_ID_SHIFT: u32 = SEQUENCE_BITS;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + NODE_ID_BITS;

/// Represents a 64-bit time-ordered identifier.
///
/// The derived ordering is the numeric ordering, which for identifiers from a single minter is
/// the order in which they were issued.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct FlakeId(u64);

impl FlakeId {
    /// Creates an identifier from field values.
    ///
    /// # Panics
    ///
    /// Panics if any field exceeds its bit width.
    pub const fn from_fields(timestamp_delta: u64, node_id: u16, sequence: u16) -> Self {
        if timestamp_delta > MAX_TIMESTAMP_DELTA
            || node_id > MAX_NODE_ID
            || sequence > MAX_SEQUENCE
        {
            panic!("invalid field value");
        }

        Self(
            (timestamp_delta << TIMESTAMP_SHIFT)
                | ((node_id as u64) << NODE_ID_SHIFT)
                | sequence as u64,
        )
    }

    /// Returns the underlying integer.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the milliseconds elapsed since the epoch, i.e. every bit above the node ID.
    pub const fn timestamp_delta(&self) -> u64 {
        self.0 >> TIMESTAMP_SHIFT
    }

    /// Returns the node ID field.
    pub const fn node_id(&self) -> u16 {
        ((self.0 >> NODE_ID_SHIFT) & MAX_NODE_ID as u64) as u16
    }

    /// Returns the sequence field.
    pub const fn sequence(&self) -> u16 {
        (self.0 & MAX_SEQUENCE as u64) as u16
    }

    /// Returns the Unix timestamp in milliseconds, given the epoch the identifier was minted with.
    pub const fn unix_ts_ms(&self, epoch_ms: u64) -> u64 {
        epoch_ms.saturating_add(self.timestamp_delta())
    }

    /// Decomposes the identifier, measuring time from `epoch_ms`.
    pub const fn components(&self, epoch_ms: u64) -> Components {
        Components::from_id(*self, epoch_ms)
    }

    /// Returns the zero-padded 20-digit decimal representation stored in a stack-allocated
    /// string.
    ///
    /// Unlike [`fmt::Display`], the padded form sorts lexicographically in the same order as the
    /// numeric values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flakeid::FlakeId;
    ///
    /// let x = FlakeId::from(4_194_308_096);
    /// assert_eq!(x.encode().as_str(), "00000000004194308096");
    /// assert_eq!(x.to_string(), "4194308096");
    /// ```
    pub fn encode(&self) -> FStr<20> {
        let mut buffer = [b'0'; 20];
        let mut n = self.0;
        for e in buffer.iter_mut().rev() {
            *e = b'0' + (n % 10) as u8;
            n /= 10;
        }
        debug_assert!(buffer.is_ascii());
        // SAFETY: the buffer consists solely of ASCII digits
        unsafe { FStr::from_inner_unchecked(buffer) }
    }
}

impl fmt::Display for FlakeId {
    /// Returns the decimal representation without padding.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::LowerHex for FlakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::UpperHex for FlakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}

impl str::FromStr for FlakeId {
    type Err = ParseError;

    /// Creates an object from a decimal representation of 1 to 20 digits, padded or not.
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        const ERR: ParseError = ParseError {};
        if src.is_empty() || src.len() > 20 || !src.bytes().all(|c| c.is_ascii_digit()) {
            return Err(ERR);
        }
        src.parse::<u64>().map(Self).map_err(|_| ERR)
    }
}

impl From<FlakeId> for u64 {
    fn from(src: FlakeId) -> Self {
        src.0
    }
}

impl From<u64> for FlakeId {
    fn from(src: u64) -> Self {
        Self(src)
    }
}

impl From<FlakeId> for i64 {
    /// Reinterprets the bits as a signed integer, which is non-negative for minted identifiers.
    fn from(src: FlakeId) -> Self {
        src.0 as i64
    }
}

impl TryFrom<i64> for FlakeId {
    type Error = ParseError;

    fn try_from(src: i64) -> Result<Self, Self::Error> {
        u64::try_from(src).map(Self).map_err(|_| ParseError {})
    }
}

impl From<FlakeId> for String {
    fn from(src: FlakeId) -> Self {
        src.to_string()
    }
}

impl TryFrom<String> for FlakeId {
    type Error = ParseError;

    fn try_from(src: String) -> Result<Self, Self::Error> {
        src.parse()
    }
}

/// The decomposed fields of an identifier.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Components {
    /// The Unix timestamp in milliseconds.
    pub time: u64,
    /// The node ID of the minter.
    pub worker_id: u16,
    /// The intra-millisecond sequence.
    pub sequence: u16,
}

impl Components {
    /// Decomposes `id`, adding its `timestamp_delta` back to `epoch_ms`.
    pub const fn from_id(id: FlakeId, epoch_ms: u64) -> Self {
        Self {
            time: id.unix_ts_ms(epoch_ms),
            worker_id: id.node_id(),
            sequence: id.sequence(),
        }
    }
}

/// Error parsing an invalid string representation of an identifier.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid string representation")
    }
}

impl std::error::Error for ParseError {}

#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
mod serde_support {
    use super::{fmt, FlakeId};
    use serde::{de, Deserializer, Serializer};

    impl serde::Serialize for FlakeId {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            if serializer.is_human_readable() {
                serializer.collect_str(self)
            } else {
                serializer.serialize_u64(self.0)
            }
        }
    }

    impl<'de> serde::Deserialize<'de> for FlakeId {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            if deserializer.is_human_readable() {
                deserializer.deserialize_str(VisitorImpl)
            } else {
                deserializer.deserialize_u64(VisitorImpl)
            }
        }
    }

    struct VisitorImpl;

    impl<'de> de::Visitor<'de> for VisitorImpl {
        type Value = FlakeId;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(formatter, "a 64-bit identifier as integer or decimal string")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            value.parse::<Self::Value>().map_err(de::Error::custom)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(FlakeId(value))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            FlakeId::try_from(value).map_err(de::Error::custom)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::FlakeId;
        use crate::Components;
        use serde_test::{assert_de_tokens, assert_tokens, Configure, Token};

        /// Serializes and deserializes prepared cases correctly
        #[test]
        fn serializes_and_deserializes_prepared_cases_correctly() {
            let cases = [
                ("0", 0u64),
                ("4194308096", 4_194_308_096),
                ("1630544123462524928", 1_630_544_123_462_524_928),
                ("9223372036854775807", i64::MAX as u64),
            ];

            for (text, value) in cases {
                let e = FlakeId::from(value);
                assert_tokens(&e.readable(), &[Token::Str(text)]);
                assert_tokens(&e.compact(), &[Token::U64(value)]);
            }
        }

        /// Accepts padded strings and signed integers
        #[test]
        fn accepts_padded_strings_and_signed_integers() {
            let e = FlakeId::from(4_194_308_096);
            assert_de_tokens(&e.readable(), &[Token::Str("00000000004194308096")]);
            assert_de_tokens(&e.compact(), &[Token::I64(4_194_308_096)]);
        }

        /// Serializes components as a struct
        #[test]
        fn serializes_components_as_a_struct() {
            let parts = Components {
                time: 1_519_837_201_000,
                worker_id: 1,
                sequence: 0,
            };
            assert_tokens(
                &parts,
                &[
                    Token::Struct {
                        name: "Components",
                        len: 3,
                    },
                    Token::Str("time"),
                    Token::U64(1_519_837_201_000),
                    Token::Str("worker_id"),
                    Token::U16(1),
                    Token::Str("sequence"),
                    Token::U16(0),
                    Token::StructEnd,
                ],
            );
        }
    }
}
