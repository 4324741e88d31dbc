use crate::base36;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// A short code identifying a stored link.
///
/// The code is a sequence position rendered in base 36. It is held as the
/// numeric identifier so ordering and comparisons follow sequence order; the
/// textual form is produced on demand via [`Display`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShortCode(u64);

impl ShortCode {
    /// Creates a code from its numeric identifier.
    pub const fn from_id(id: u64) -> Self {
        Self(id)
    }

    /// Parses a canonical base-36 code.
    pub fn parse(code: &str) -> std::result::Result<Self, CoreError> {
        base36::decode(code).map(Self)
    }

    /// Returns the numeric identifier behind this code.
    pub const fn id(&self) -> u64 {
        self.0
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&base36::encode(self.0))
    }
}

impl FromStr for ShortCode {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ShortCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ShortCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_base36() {
        assert_eq!(ShortCode::from_id(1).to_string(), "1");
        assert_eq!(ShortCode::from_id(35).to_string(), "z");
        assert_eq!(ShortCode::from_id(1269).to_string(), "z9");
    }

    #[test]
    fn parse_round_trips() {
        let code: ShortCode = "z9".parse().unwrap();
        assert_eq!(code.id(), 1269);
        assert_eq!(code.to_string(), "z9");
    }

    #[test]
    fn ordering_follows_sequence_not_text() {
        let z = ShortCode::parse("z").unwrap();
        let ten = ShortCode::parse("10").unwrap();
        assert!(z < ten);
        assert!("z" > "10");
    }

    #[test]
    fn serde_uses_text_form() {
        let json = serde_json::to_string(&ShortCode::from_id(36)).unwrap();
        assert_eq!(json, "\"10\"");

        let code: ShortCode = serde_json::from_str("\"z9\"").unwrap();
        assert_eq!(code.id(), 1269);

        assert!(serde_json::from_str::<ShortCode>("\"Z9\"").is_err());
    }
}
