//! Shared HTTP agent.

use std::time::Duration;

/// Build the blocking agent used for every remote call in a run.
///
/// HTTP error statuses are returned as normal responses so callers can read
/// the catalog's JSON error envelope.
pub fn agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    config.into()
}
