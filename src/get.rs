use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use crate::environment::fetch_environment;
use crate::error::GetError;
use crate::identity::fetch_identity;
use crate::traits::{parse_traits, TraitPair};
use crate::transport::Transport;

/// Keys with this prefix are server-side SDK keys. Only a naming convention,
/// the service still decides whether the key is valid.
pub const SERVER_SIDE_KEY_PREFIX: &str = "ser.";

pub const NO_ENVIRONMENT_MSG: &str =
    "In order to fetch the environment document you need to provide a server-side SDK token.";

pub const NO_ENVIRONMENT_KEY_MSG: &str =
    "A flagsmith environment was not specified, run smith get --help for more usage.";

/// What to fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Entity {
    /// Flags and traits for an identity.
    #[default]
    Flags,
    /// The environment document for local evaluation.
    Environment,
}

impl FromStr for Entity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flags" => Ok(Entity::Flags),
            "environment" => Ok(Entity::Environment),
            other => Err(format!(
                "invalid entity '{}', expected 'flags' or 'environment'",
                other
            )),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Flags => write!(f, "flags"),
            Entity::Environment => write!(f, "environment"),
        }
    }
}

/// Fully resolved inputs for one `get` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOptions {
    pub environment_key: String,
    /// Base API URL, ending in `/`.
    pub api: String,
    pub identity: Option<String>,
    /// Raw `key=value` strings, parsed during validation.
    pub traits: Vec<String>,
    pub entity: Entity,
    pub compact: bool,
    pub output: Option<PathBuf>,
}

impl GetOptions {
    fn identity_present(&self) -> bool {
        self.identity.as_deref().is_some_and(|i| !i.is_empty())
    }
}

/// Checks the options without touching the network and returns the parsed traits.
pub fn validate(opts: &GetOptions) -> Result<Vec<TraitPair>, GetError> {
    let traits = parse_traits(&opts.traits, opts.identity_present())?;

    if opts.environment_key.is_empty() {
        return Err(GetError::validation(NO_ENVIRONMENT_KEY_MSG));
    }
    if opts.entity == Entity::Environment
        && !opts.environment_key.starts_with(SERVER_SIDE_KEY_PREFIX)
    {
        return Err(GetError::validation(NO_ENVIRONMENT_MSG));
    }
    Ok(traits)
}

/// JSON text of `value`, indented by two spaces unless `compact`.
pub fn render<T: Serialize + ?Sized>(value: &T, compact: bool) -> Result<String, GetError> {
    if compact {
        serde_json::to_string(value).map_err(GetError::Serialize)
    } else {
        serde_json::to_string_pretty(value).map_err(GetError::Serialize)
    }
}

/// Validates, fetches and writes the result.
///
/// The document goes to `out` first, then to `opts.output` when set, so a failed
/// file write never hides what was already printed. Progress lines go to `status`.
pub fn run(
    opts: &GetOptions,
    transport: &dyn Transport,
    out: &mut dyn Write,
    status: &mut dyn Write,
) -> Result<(), GetError> {
    let traits = validate(opts)?;

    let mut banner = format!(
        "Retrieving flags by environment id {}",
        opts.environment_key
    );
    if let Some(identity) = opts.identity.as_deref().filter(|i| !i.is_empty()) {
        banner.push_str(&format!(" for identity {}", identity));
    }
    if let Some(path) = &opts.output {
        banner.push_str(&format!(", outputting to {}", path.display()));
    }
    writeln!(status, "{}...", banner).ok();
    writeln!(status, "API endpoint: {}", opts.api).ok();

    let mut document = match opts.entity {
        Entity::Environment => {
            let doc = fetch_environment(transport, &opts.api, &opts.environment_key)?;
            render(&doc, opts.compact)?
        }
        Entity::Flags => {
            let result = fetch_identity(
                transport,
                status,
                &opts.api,
                &opts.environment_key,
                opts.identity.as_deref(),
                &traits,
            )?;
            render(&result, opts.compact)?
        }
    };
    document.push('\n');

    out.write_all(document.as_bytes())
        .and_then(|_| out.flush())
        .map_err(GetError::Output)?;

    if let Some(path) = &opts.output {
        std::fs::write(path, document.as_bytes()).map_err(|source| GetError::Io {
            path: path.clone(),
            source,
        })?;
        writeln!(status, "Output saved to {}", path.display()).ok();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::fake::FakeTransport;

    const IDENTITY_BODY: &str = r#"{"flags":[{"feature":{"id":1,"name":"Flag Name","initial_value":"v"},"enabled":true}],"traits":[{"trait_key":"Logins","trait_value":2}]}"#;

    fn opts(key: &str) -> GetOptions {
        GetOptions {
            environment_key: key.to_string(),
            api: "https://example.com/api/v1/".to_string(),
            ..GetOptions::default()
        }
    }

    fn run_capture(
        opts: &GetOptions,
        transport: &FakeTransport,
    ) -> (Result<(), GetError>, String, String) {
        let mut out = Vec::new();
        let mut status = Vec::new();
        let res = run(opts, transport, &mut out, &mut status);
        (
            res,
            String::from_utf8(out).unwrap(),
            String::from_utf8(status).unwrap(),
        )
    }

    #[test]
    fn test_entity_from_str() {
        assert_eq!("flags".parse::<Entity>(), Ok(Entity::Flags));
        assert_eq!("Environment".parse::<Entity>(), Ok(Entity::Environment));
        assert!("segments".parse::<Entity>().is_err());
        assert_eq!(Entity::Environment.to_string(), "environment");
    }

    #[test]
    fn test_empty_environment_key() {
        let transport = FakeTransport::new(200, "{}");
        let (res, out, _) = run_capture(&opts(""), &transport);
        assert_eq!(res.unwrap_err().to_string(), NO_ENVIRONMENT_KEY_MSG);
        assert!(out.is_empty());
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn test_environment_entity_requires_server_key() {
        let transport = FakeTransport::new(200, "{}");
        let mut o = opts("test");
        o.entity = Entity::Environment;
        let (res, _, _) = run_capture(&o, &transport);
        let err = res.unwrap_err();
        assert!(matches!(err, GetError::Validation(_)));
        assert_eq!(err.to_string(), NO_ENVIRONMENT_MSG);
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn test_traits_without_identity_rejected_before_request() {
        let transport = FakeTransport::new(200, "{}");
        let mut o = opts("test_env");
        o.traits = vec!["key=value".into()];
        let (res, _, _) = run_capture(&o, &transport);
        assert!(matches!(res, Err(GetError::Validation(_))));

        o.identity = Some(String::new());
        let (res, _, _) = run_capture(&o, &transport);
        assert!(matches!(res, Err(GetError::Validation(_))));
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn test_invalid_trait_rejected_before_request() {
        let transport = FakeTransport::new(200, "{}");
        let mut o = opts("test_env");
        o.identity = Some("test_id".into());
        o.traits = vec!["invalid_trait".into()];
        let (res, _, _) = run_capture(&o, &transport);
        assert_eq!(
            res.unwrap_err().to_string(),
            "Invalid trait format: invalid_trait. Must be in the format key=value"
        );
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn test_identity_dispatch_with_traits() {
        let transport = FakeTransport::new(200, IDENTITY_BODY);
        let mut o = opts("test_env");
        o.identity = Some("test_id".into());
        o.traits = vec!["key1=value1".into(), "key2=value2".into()];
        let (res, _, status) = run_capture(&o, &transport);
        res.unwrap();

        let req = transport.last();
        assert_eq!(req.url, "https://example.com/api/v1/identities/");
        assert_eq!(req.query_value("identifier"), Some("test_id"));
        assert_eq!(
            req.query_value("traits"),
            Some(r#"[{"key1":"value1"},{"key2":"value2"}]"#)
        );
        assert!(status
            .contains("Retrieving flags by environment id test_env for identity test_id..."));
        assert!(status.contains("API endpoint: https://example.com/api/v1/"));
        assert!(status.contains("Fetching flags and traits for identity: test_id"));
    }

    #[test]
    fn test_environment_dispatch() {
        let transport = FakeTransport::new(200, r#"{"test":"data"}"#);
        let mut o = opts("ser.test-environment");
        o.entity = Entity::Environment;
        let (res, out, status) = run_capture(&o, &transport);
        res.unwrap();

        assert_eq!(transport.calls(), 1);
        assert_eq!(
            transport.last().url,
            "https://example.com/api/v1/environment-document/"
        );
        assert_eq!(out, "{\n  \"test\": \"data\"\n}\n");
        assert!(status.contains("Retrieving flags by environment id ser.test-environment..."));
    }

    #[test]
    fn test_pretty_output_by_default() {
        let transport = FakeTransport::new(200, IDENTITY_BODY);
        let (res, out, _) = run_capture(&opts("env-key"), &transport);
        res.unwrap();
        assert!(out.starts_with("{\n  \"api\": "));
        assert!(out.contains("\n  \"flags\": [\n    {\n      \"flag_name\": {"));
    }

    #[test]
    fn test_compact_output() {
        let transport = FakeTransport::new(200, IDENTITY_BODY);
        let mut o = opts("env-key");
        o.compact = true;
        let (res, out, _) = run_capture(&o, &transport);
        res.unwrap();
        assert_eq!(
            out,
            concat!(
                r#"{"api":"https://example.com/api/v1/","environmentID":"env-key","#,
                r#""flags":[{"flag_name":{"id":1,"enabled":true,"value":"v"}}],"#,
                r#""identity":"","ts":null,"traits":{"logins":2},"evaluationEvent":null}"#,
                "\n"
            )
        );
    }

    #[test]
    fn test_upstream_error_writes_nothing() {
        let transport = FakeTransport::new(404, "Not Found");
        let (res, out, _) = run_capture(&opts("env-key"), &transport);
        assert_eq!(res.unwrap_err().status(), Some(404));
        assert!(out.is_empty());
    }

    #[test]
    fn test_render_modes() {
        let value = serde_json::json!({"a": [1, 2]});
        assert_eq!(render(&value, true).unwrap(), r#"{"a":[1,2]}"#);
        assert_eq!(
            render(&value, false).unwrap(),
            "{\n  \"a\": [\n    1,\n    2\n  ]\n}"
        );
    }
}
