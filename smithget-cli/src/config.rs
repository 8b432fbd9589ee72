use std::path::PathBuf;

use serde::Deserialize;
use smithget_lib::{default_api_url, normalize_api_url, GetOptions};

use crate::GetArgs;

/// Defaults for `get` (from the `[get]` section of flagsmith.toml)
#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct GetConfig {
    pub environment: Option<String>,
    pub api: Option<String>,
    pub output: Option<PathBuf>,
    /// HTTP client timeout. No timeout when absent.
    pub timeout_secs: Option<u64>,
}

/// Parse the `[get]` section. Anything unparsable counts as an empty config.
pub fn parse_get_config(content: &str) -> GetConfig {
    #[derive(Deserialize)]
    struct FlagsmithToml {
        get: Option<GetConfig>,
    }
    toml::from_str::<FlagsmithToml>(content)
        .ok()
        .and_then(|c| c.get)
        .unwrap_or_default()
}

/// Load get config from flagsmith.toml. A missing file is not an error.
pub fn load_get_config(config_path: &str) -> GetConfig {
    match std::fs::read_to_string(config_path) {
        Ok(content) => {
            log::debug!("loaded config from {}", config_path);
            parse_get_config(&content)
        }
        Err(_) => GetConfig::default(),
    }
}

/// Resolve the API URL from: --api > FLAGSMITH_HOST > flagsmith.toml > built-in host
fn resolve_api(api_arg: Option<&str>, host_env: Option<&str>, config: &GetConfig) -> String {
    match (api_arg, host_env, config.api.as_deref()) {
        (Some(api), _, _) => normalize_api_url(api),
        (None, Some(host), _) => default_api_url(Some(host)),
        (None, None, Some(api)) => normalize_api_url(api),
        (None, None, None) => default_api_url(None),
    }
}

/// Turn parsed arguments into the options the library runs with.
///
/// The environment key comes from: positional arg / FLAGSMITH_ENVIRONMENT > flagsmith.toml.
pub(crate) fn resolve_options(
    args: &GetArgs,
    host_env: Option<&str>,
    config: &GetConfig,
) -> GetOptions {
    let environment_key = args
        .environment
        .clone()
        .or_else(|| config.environment.clone())
        .unwrap_or_default();

    GetOptions {
        environment_key,
        api: resolve_api(args.api.as_deref(), host_env, config),
        identity: args.identity.clone(),
        traits: args.traits.clone(),
        entity: args.entity,
        compact: args.no_pretty,
        output: args.output.clone().or_else(|| config.output.clone()),
    }
}
