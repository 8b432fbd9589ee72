use serde_json::Value;

use crate::error::GetError;
use crate::transport::{Request, Transport};
use crate::ENVIRONMENT_KEY_HEADER;

pub fn environment_request(base_url: &str, environment_key: &str) -> Request {
    Request::get(format!("{}environment-document/", base_url))
        .header(ENVIRONMENT_KEY_HEADER, environment_key)
        .header("Content-Type", "application/json")
}

/// Fetches the environment document used for local evaluation. The body is
/// returned exactly as parsed, key order included.
pub fn fetch_environment(
    transport: &dyn Transport,
    base_url: &str,
    environment_key: &str,
) -> Result<Value, GetError> {
    let response = transport.get(&environment_request(base_url, environment_key))?;
    if response.status != 200 {
        return Err(GetError::Upstream {
            context: "Error fetching environment document",
            status: response.status,
            body: response.body,
        });
    }
    serde_json::from_str(&response.body).map_err(GetError::Decode)
}
