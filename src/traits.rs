use nom::{
    bytes::complete::{tag, take_till},
    combinator::rest,
    sequence::separated_pair,
    IResult,
};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::GetError;

/// One `key=value` trait from the command line.
///
/// Serializes as a single-key object, so a list of traits becomes
/// `[{"k1":"v1"},{"k2":"v2"}]` and duplicate keys survive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitPair {
    pub key: String,
    pub value: String,
}

impl TraitPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        TraitPair {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Serialize for TraitPair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.key, &self.value)?;
        map.end()
    }
}

/// Splits on the first `=`; everything after it is the value.
fn parse_pair(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(take_till(|c: char| c == '='), tag("="), rest)(input)
}

/// Parses repeated `--trait key=value` arguments in command-line order.
///
/// Traits require an identity. An empty list is always accepted.
pub fn parse_traits<S: AsRef<str>>(
    raw: &[S],
    identity_present: bool,
) -> Result<Vec<TraitPair>, GetError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    if !identity_present {
        return Err(GetError::validation(
            "Traits can only be used when an identity is specified. Use -i/--identity option.",
        ));
    }

    let mut traits = Vec::with_capacity(raw.len());
    for t in raw {
        let t = t.as_ref();
        match parse_pair(t) {
            Ok((_, (key, value))) => traits.push(TraitPair::new(key, value)),
            Err(_) => {
                return Err(GetError::validation(format!(
                    "Invalid trait format: {}. Must be in the format key=value",
                    t
                )))
            }
        }
    }
    Ok(traits)
}
