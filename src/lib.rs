//! Fetches feature flags from a Flagsmith-compatible API.
//!
//! Two modes are supported: flags and traits for an identity
//! ([`identity::fetch_identity`]) and the raw environment document used for local
//! evaluation ([`environment::fetch_environment`]). [`get::run`] ties validation,
//! fetching and output together for the command-line tool.
//!
//! ```no_run
//! use smithget_lib::{get, transport::HttpTransport, GetOptions};
//!
//! let opts = GetOptions {
//!     environment_key: "my-env-key".into(),
//!     api: smithget_lib::default_api_url(None),
//!     identity: Some("user-42".into()),
//!     traits: vec!["plan=premium".into()],
//!     ..GetOptions::default()
//! };
//! let transport = HttpTransport::new(None).unwrap();
//! get::run(&opts, &transport, &mut std::io::stdout(), &mut std::io::stderr()).unwrap();
//! ```

pub mod environment;
pub mod error;
pub mod get;
pub mod identity;
pub mod traits;
pub mod transport;

pub use error::GetError;
pub use get::{Entity, GetOptions};
pub use identity::{Flag, FlagState, IdentityResult};
pub use traits::TraitPair;

pub const DEFAULT_HOST: &str = "https://edge.api.flagsmith.com";

/// Header carrying the environment key on every request.
pub const ENVIRONMENT_KEY_HEADER: &str = "x-environment-key";

/// `<host>/api/v1/`, using [`DEFAULT_HOST`] when no host is given.
pub fn default_api_url(host: Option<&str>) -> String {
    let host = host.unwrap_or(DEFAULT_HOST);
    format!("{}/api/v1/", host.trim_end_matches('/'))
}

/// Appends the trailing `/` the endpoint paths are joined onto.
pub fn normalize_api_url(api: &str) -> String {
    if api.ends_with('/') {
        api.to_string()
    } else {
        format!("{}/", api)
    }
}
