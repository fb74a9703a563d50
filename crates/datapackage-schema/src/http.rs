//! Blocking HTTP(S) fetches shared by schema loading and remote data sources.
//!
//! One `ureq::Agent` is built lazily and reused. No timeout is configured: a
//! hanging server blocks the caller until the host intervenes.

use crate::SchemaError;
use std::io::Read;
use std::sync::OnceLock;
use tracing::debug;

fn agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(ureq::Agent::new_with_defaults)
}

/// Open a streaming reader over the body of `GET url`.
pub fn open_url(url: &str) -> Result<Box<dyn Read>, SchemaError> {
    debug!("GET {url}");
    let resp = match agent().get(url).call() {
        Ok(r) => r,
        Err(ureq::Error::StatusCode(code)) => {
            return Err(SchemaError::Fetch {
                url: url.to_owned(),
                reason: format!("HTTP {code}"),
            });
        }
        Err(e) => {
            return Err(SchemaError::Fetch {
                url: url.to_owned(),
                reason: e.to_string(),
            });
        }
    };

    let code = resp.status().as_u16();
    if code >= 400 {
        return Err(SchemaError::Fetch {
            url: url.to_owned(),
            reason: format!("HTTP {code}"),
        });
    }

    Ok(Box::new(resp.into_body().into_reader()))
}

/// Fetch the whole body of `GET url`.
pub fn fetch_bytes(url: &str) -> Result<Vec<u8>, SchemaError> {
    let mut reader = open_url(url)?;
    let mut body = Vec::new();
    reader
        .read_to_end(&mut body)
        .map_err(|e| SchemaError::Fetch {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
    Ok(body)
}

/// Fetch and parse a JSON document.
pub fn fetch_json(url: &str) -> Result<serde_json::Value, SchemaError> {
    let body = fetch_bytes(url)?;
    serde_json::from_slice(&body).map_err(|e| SchemaError::Parse {
        location: url.to_owned(),
        reason: e.to_string(),
    })
}
