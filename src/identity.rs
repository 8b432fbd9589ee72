use std::io::Write;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GetError;
use crate::traits::TraitPair;
use crate::transport::{Request, Transport};
use crate::ENVIRONMENT_KEY_HEADER;

/// Normalized flags and traits for one identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityResult {
    pub api: String,
    #[serde(rename = "environmentID")]
    pub environment_id: String,
    pub flags: Vec<Flag>,
    pub identity: String,
    /// Always null.
    pub ts: Option<Value>,
    pub traits: Map<String, Value>,
    /// Always null.
    #[serde(rename = "evaluationEvent")]
    pub evaluation_event: Option<Value>,
}

/// One feature, serialized as `{"<key>": {"id": .., "enabled": .., "value": ..}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Flag {
    pub key: String,
    pub state: FlagState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagState {
    pub id: Value,
    pub enabled: Value,
    pub value: Value,
}

impl Serialize for Flag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.key, &self.state)?;
        map.end()
    }
}

// Upstream shapes. Every field is optional: a missing piece becomes null or
// empty instead of failing the whole response.

#[derive(Debug, Default, Deserialize)]
struct RawIdentity {
    #[serde(default)]
    flags: Option<Vec<RawFlag>>,
    #[serde(default)]
    traits: Option<Vec<RawTrait>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawFlag {
    #[serde(default)]
    feature: Option<RawFeature>,
    #[serde(default)]
    enabled: Value,
}

#[derive(Debug, Default, Deserialize)]
struct RawFeature {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    initial_value: Value,
}

#[derive(Debug, Default, Deserialize)]
struct RawTrait {
    #[serde(default)]
    trait_key: Option<String>,
    #[serde(default)]
    trait_value: Value,
}

/// `"Flag Name"` -> `"flag_name"`
pub fn normalize_flag_key(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// `"Preferred Language"` -> `"preferredlanguage"`
pub fn normalize_trait_key(key: &str) -> String {
    key.to_lowercase().replace(' ', "")
}

/// Builds the `identities/` request. Traits travel as one JSON-encoded `traits` parameter.
pub fn identity_request(
    base_url: &str,
    environment_key: &str,
    identity: &str,
    traits: &[TraitPair],
) -> Result<Request, GetError> {
    let mut request =
        Request::get(format!("{}identities/", base_url)).query("identifier", identity);
    if !traits.is_empty() {
        let encoded = serde_json::to_string(traits).map_err(GetError::Serialize)?;
        request = request.query("traits", encoded);
    }
    Ok(request
        .header(ENVIRONMENT_KEY_HEADER, environment_key)
        .header("Content-Type", "application/json"))
}

/// Fetches flags and traits for `identity` and reshapes them into an [`IdentityResult`].
///
/// A missing identity is sent as the empty string. Any status other than 200 is an
/// [`GetError::Upstream`].
pub fn fetch_identity(
    transport: &dyn Transport,
    status: &mut dyn Write,
    base_url: &str,
    environment_key: &str,
    identity: Option<&str>,
    traits: &[TraitPair],
) -> Result<IdentityResult, GetError> {
    let identity = identity.unwrap_or_default();
    writeln!(status, "Fetching flags and traits for identity: {}", identity).ok();

    let request = identity_request(base_url, environment_key, identity, traits)?;
    let response = transport.get(&request)?;
    if response.status != 200 {
        return Err(GetError::Upstream {
            context: "Error initializing flagsmith",
            status: response.status,
            body: response.body,
        });
    }

    let raw: RawIdentity = serde_json::from_str(&response.body).map_err(GetError::Decode)?;
    Ok(normalize(base_url, environment_key, identity, raw))
}

fn normalize(
    api: &str,
    environment_key: &str,
    identity: &str,
    raw: RawIdentity,
) -> IdentityResult {
    let flags = raw
        .flags
        .unwrap_or_default()
        .into_iter()
        .map(|flag| {
            let feature = flag.feature.unwrap_or_default();
            Flag {
                key: normalize_flag_key(feature.name.as_deref().unwrap_or_default()),
                state: FlagState {
                    id: feature.id,
                    enabled: flag.enabled,
                    value: feature.initial_value,
                },
            }
        })
        .collect();

    let mut traits = Map::new();
    for t in raw.traits.unwrap_or_default() {
        traits.insert(
            normalize_trait_key(t.trait_key.as_deref().unwrap_or_default()),
            t.trait_value,
        );
    }

    IdentityResult {
        api: api.to_string(),
        environment_id: environment_key.to_string(),
        flags,
        identity: identity.to_string(),
        ts: None,
        traits,
        evaluation_event: None,
    }
}
