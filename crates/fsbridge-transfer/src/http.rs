//! Thin helpers around `reqwest` shared by both engines.

use std::time::Duration;

use fsbridge_types::Headers;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode, redirect};

use crate::config::TransferConfig;
use crate::error::{Result, TransferError};

/// Build a client for one job. Redirects are never followed automatically;
/// the download engine handles them itself.
pub fn build_client(
    config: &TransferConfig,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
) -> Result<Client> {
    let mut builder = Client::builder().redirect(redirect::Policy::none());
    if let Some(timeout) = connect_timeout {
        builder = builder.connect_timeout(timeout);
    }
    if let Some(timeout) = read_timeout {
        builder = builder.read_timeout(timeout);
    }
    if let Some(agent) = &config.user_agent {
        builder = builder.user_agent(agent.as_str());
    }
    Ok(builder.build()?)
}

/// Convert host headers, rejecting names or values HTTP cannot carry.
pub fn to_header_map(headers: &Headers) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| TransferError::invalid(format!("invalid header name: {:?}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| TransferError::invalid(format!("invalid value for header {}", name)))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// One value per header name; the first one received wins.
pub fn first_values(headers: &HeaderMap) -> Headers {
    headers
        .keys()
        .filter_map(|name| {
            let value = headers.get(name)?.to_str().ok()?;
            Some((name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

/// One entry per header name; repeated values joined with `", "`.
pub fn joined_values(headers: &HeaderMap) -> Headers {
    headers
        .keys()
        .map(|name| {
            let values: Vec<&str> = headers
                .get_all(name)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .collect();
            (name.as_str().to_string(), values.join(", "))
        })
        .collect()
}

/// Statuses the download engine follows.
pub fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}
