use std::time::Duration;

use crate::error::GetError;

/// A fully described GET request. Built by the fetchers, executed by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub query: Vec<(&'static str, String)>,
    pub headers: Vec<(&'static str, String)>,
}

impl Request {
    pub fn get(url: String) -> Self {
        Request {
            url,
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn query(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.query.push((name, value.into()));
        self
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Value of the first query parameter called `name`.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value of the first header called `name` (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status code and raw body text of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

/// The HTTP GET capability the fetchers call into.
pub trait Transport {
    fn get(&self, request: &Request) -> Result<Response, GetError>;
}

/// Blocking `reqwest` transport used by the command-line tool.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// `None` disables the client timeout entirely.
    pub fn new(timeout: Option<Duration>) -> Result<Self, GetError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, request: &Request) -> Result<Response, GetError> {
        log::debug!("GET {} query={:?}", request.url, request.query);

        let mut builder = self.client.get(&request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        log::debug!("{} answered {} ({} bytes)", request.url, status, body.len());

        Ok(Response { status, body })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder_keeps_order() {
        let req = Request::get("https://example.com/api/v1/identities/".into())
            .query("identifier", "bob")
            .query("traits", "[]")
            .header("x-environment-key", "env");

        assert_eq!(
            req.query,
            vec![("identifier", "bob".to_string()), ("traits", "[]".to_string())]
        );
        assert_eq!(req.query_value("traits"), Some("[]"));
        assert_eq!(req.header_value("X-Environment-Key"), Some("env"));
        assert_eq!(req.header_value("authorization"), None);
    }
}
