//! Record fetch boundary: one HTTP lookup per voter id.
//!
//! [`VoterFetcher`] wraps a shared [`reqwest::Client`] (connection pooling,
//! gzip, timeouts) and turns a voter id into a [`FetchOutcome`]: a parsed
//! record, or the service's explicit not-found answer. Anything else is a
//! [`FetchError`], which the scheduler treats as fatal for the whole run.

mod headers;
pub mod record;

use thiserror::Error;
use url::Url;

use record::RecordError;
pub use record::{ID_COLUMN, VoterRecord, columns, parse_elector_response};

/// Production lookup endpoint.
pub const CEEPUR_VOTER_INFO_URL: &str =
    "https://consulta.ceepur.org/ElectorService.asmx/ConsultaElectorById";

/// Form field carrying the voter id in the request body.
const ID_FORM_FIELD: &str = "numeroElectoral";

/// HTTP connect timeout (30 seconds).
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Overall per-request timeout; responses are small XML documents.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Result of one fetch attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The service returned a voter record.
    Found(VoterRecord),
    /// The service returned the not-found sentinel; nothing to persist.
    NotFound,
}

/// Errors that can occur while fetching a single voter record.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure (DNS, connect, TLS, timeout, body read).
    #[error("network error fetching voter {id}: {source}")]
    Network {
        /// The voter id being fetched.
        id: u32,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("HTTP {status} fetching voter {id}")]
    HttpStatus {
        /// The voter id being fetched.
        id: u32,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body did not decode into a voter record.
    #[error("malformed response for voter {id}: {source}")]
    Malformed {
        /// The voter id being fetched.
        id: u32,
        /// The underlying decode error.
        #[source]
        source: RecordError,
    },
}

/// HTTP fetcher for voter records.
///
/// Cheap to clone; all clones share the underlying connection pool, so one
/// fetcher serves every concurrent lookup in a run.
#[derive(Debug, Clone)]
pub struct VoterFetcher {
    client: reqwest::Client,
    endpoint: Url,
}

impl Default for VoterFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl VoterFetcher {
    /// Creates a fetcher against the production endpoint.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static configuration
    /// or the endpoint constant does not parse. Neither happens in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let endpoint =
            Url::parse(CEEPUR_VOTER_INFO_URL).expect("static endpoint constant must parse");
        Self::with_endpoint(endpoint)
    }

    /// Creates a fetcher against an explicit endpoint (used by tests).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_endpoint(endpoint: Url) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client, endpoint }
    }

    /// Returns the configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Looks up a single voter id.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, non-success status, or a
    /// body that does not decode into an `<Elector>` document.
    pub async fn fetch(&self, voter_id: u32) -> Result<FetchOutcome, FetchError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(headers::request_headers(&self.endpoint))
            .form(&[(ID_FORM_FIELD, voter_id.to_string())])
            .send()
            .await
            .map_err(|source| FetchError::Network {
                id: voter_id,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                id: voter_id,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Network {
            id: voter_id,
            source,
        })?;

        match record::parse_elector_response(&body).map_err(|source| FetchError::Malformed {
            id: voter_id,
            source,
        })? {
            Some(record) => Ok(FetchOutcome::Found(record)),
            None => Ok(FetchOutcome::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fetcher_targets_production_endpoint() {
        let fetcher = VoterFetcher::new();
        assert_eq!(fetcher.endpoint().as_str(), CEEPUR_VOTER_INFO_URL);
    }

    #[test]
    fn fetch_error_display_carries_voter_id() {
        let error = FetchError::HttpStatus {
            id: 12345,
            status: 503,
        };
        let msg = error.to_string();
        assert!(msg.contains("503"), "expected status in: {msg}");
        assert!(msg.contains("12345"), "expected voter id in: {msg}");
    }
}
