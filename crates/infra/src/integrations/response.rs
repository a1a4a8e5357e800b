//! Response classification shared by the provider clients

use clout_domain::FetchFailure;
use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::errors::fetch_failure_for_status;

/// Check the status and decode a JSON body.
///
/// Non-success statuses are classified with [`fetch_failure_for_status`]; an
/// undecodable body is a malformed response.
pub(crate) async fn decode_json<T: DeserializeOwned>(
    provider: &str,
    response: Response,
) -> Result<T, FetchFailure> {
    let status = response.status();
    if !status.is_success() {
        return Err(fetch_failure_for_status(provider, status));
    }
    let body = response
        .bytes()
        .await
        .map_err(|err| FetchFailure::transport(format!("{provider}: failed to read body: {err}")))?;
    serde_json::from_slice(&body)
        .map_err(|err| FetchFailure::malformed(format!("{provider}: unexpected response: {err}")))
}

/// Join a base URL and a path without doubling slashes.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_cleanly() {
        assert_eq!(endpoint("https://api.github.com/", "/user/repos"), "https://api.github.com/user/repos");
        assert_eq!(endpoint("http://127.0.0.1:9000", "xrpc/x"), "http://127.0.0.1:9000/xrpc/x");
    }
}
