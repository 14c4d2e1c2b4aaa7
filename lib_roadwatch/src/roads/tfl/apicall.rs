use std::time::Duration;

use thiserror::Error;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{error, info, warn};
use url::Url;

use crate::configs::{ConfigError, Credentials, PipelineConfig, ENV_APP_KEY};
use crate::retrieve::ky_http::{ApiClient, HttpTransport, TransportError};
use crate::roads::model::DisruptionRecord;

const TOO_MANY_REQUESTS: u16 = 429;

/// Failures that abort the fetch outright. Transient network and HTTP failures
/// are never reported here: once retries run out the fetch yields an empty
/// collection instead.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

enum Attempt {
    RateLimited,
    Failed(String),
}

/// Fetches the live disruption list.
pub struct DisruptionFetcher<T = ApiClient> {
    transport: T,
    credentials: Credentials,
    endpoint: Url,
    max_retries: u32,
    rate_limit_cooldown: Duration,
}

impl DisruptionFetcher<ApiClient> {
    /// Builds the production fetcher with a `reqwest` client bounded by the
    /// configured request timeout.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, FetchError> {
        let client = ApiClient::new(config.request_timeout)?;
        Ok(Self::with_transport(client, config))
    }
}

impl<T: HttpTransport> DisruptionFetcher<T> {
    pub fn with_transport(transport: T, config: &PipelineConfig) -> Self {
        Self {
            transport,
            credentials: config.credentials.clone(),
            endpoint: config.endpoint.clone(),
            max_retries: config.max_retries.max(1),
            rate_limit_cooldown: config.rate_limit_cooldown,
        }
    }

    /// Endpoint with `app_id` / `app_key` appended as query parameters.
    fn request_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            if let Some(app_id) = &self.credentials.app_id {
                query.append_pair("app_id", app_id);
            }
            query.append_pair("app_key", &self.credentials.app_key);
        }
        url
    }

    /// Performs the GET with retries.
    ///
    /// * HTTP 429: wait the fixed cooldown and retry. This does not consume an
    ///   exponential-backoff attempt; rate-limited responses have their own
    ///   budget of `max_retries`.
    /// * Any other failure (non-2xx status, transport error, undecodable body):
    ///   wait `2^attempt` seconds (0-indexed) and retry, unless it was the last
    ///   of `max_retries` attempts.
    ///
    /// Running out of either budget returns `Ok(vec![])`.
    pub async fn fetch(&self) -> Result<Vec<DisruptionRecord>, FetchError> {
        if self.credentials.app_key.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar(ENV_APP_KEY.to_string()).into());
        }

        let url = self.request_url();
        let max_attempts = self.max_retries;
        let mut failures: u32 = 0;
        let mut rate_limited: u32 = 0;
        let mut requests: u32 = 0;

        loop {
            requests += 1;

            // 1. Execute Network Request
            let attempt = match self.transport.get(&url).await {
                Ok(response) if response.status == TOO_MANY_REQUESTS => Attempt::RateLimited,
                Ok(response) if response.success => {
                    match serde_json::from_str::<Vec<Value>>(&response.body) {
                        Ok(raw) => {
                            let records = decode_records(raw);
                            if records.is_empty() {
                                warn!(requests, "Disruption API returned an empty collection");
                            } else {
                                info!(
                                    requests,
                                    records = records.len(),
                                    "Fetched disruptions from the API"
                                );
                            }
                            return Ok(records);
                        }
                        Err(e) => Attempt::Failed(format!("undecodable response body: {}", e)),
                    }
                }
                Ok(response) => Attempt::Failed(format!("HTTP status {}", response.status)),
                Err(e) => Attempt::Failed(e.to_string()),
            };

            // 2. Retry Logic
            match attempt {
                Attempt::RateLimited => {
                    rate_limited += 1;
                    if rate_limited >= max_attempts {
                        error!(
                            requests,
                            rate_limited,
                            "Still rate limited after {} cooldowns; giving up with an empty result",
                            max_attempts - 1
                        );
                        return Ok(Vec::new());
                    }
                    warn!(
                        requests,
                        rate_limited,
                        max_attempts,
                        cooldown_secs = self.rate_limit_cooldown.as_secs(),
                        "Rate limited (HTTP 429); cooling down before retrying"
                    );
                    sleep(self.rate_limit_cooldown).await;
                }
                Attempt::Failed(reason) => {
                    let attempt = failures;
                    failures += 1;
                    if failures >= max_attempts {
                        error!(
                            requests,
                            attempt = failures,
                            max_attempts,
                            reason = %reason,
                            "Disruption fetch failed on the final attempt; giving up with an empty result"
                        );
                        return Ok(Vec::new());
                    }
                    let delay = backoff_delay(attempt);
                    warn!(
                        requests,
                        attempt = failures,
                        max_attempts,
                        delay_secs = delay.as_secs(),
                        reason = %reason,
                        "Disruption fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Decodes each element on its own so one badly typed record does not cost
/// the whole batch. Rejected records are logged with whatever id they carry.
fn decode_records(raw: Vec<Value>) -> Vec<DisruptionRecord> {
    let total = raw.len();
    let records: Vec<DisruptionRecord> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| {
            let id = value.get("id").cloned();
            match serde_json::from_value::<DisruptionRecord>(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    let label = DisruptionRecord { id, ..Default::default() }.label();
                    warn!(index, id = %label, error = %e, "Skipping malformed disruption record");
                    None
                }
            }
        })
        .collect();

    if records.len() < total {
        warn!(kept = records.len(), total, "Some disruption records were rejected");
    }
    records
}

/// `2^attempt` seconds, saturating well before overflow.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(16))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_one_second() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(40), Duration::from_secs(65_536));
    }

    #[test]
    fn badly_typed_record_is_dropped_alone() {
        let raw: Vec<Value> = serde_json::from_str(
            r#"[{"id": "TIMS-1", "severityLevel": 3}, {"id": "TIMS-2", "severityLevel": "7"}, {}]"#,
        )
        .unwrap();

        let records = decode_records(raw);

        let ids: Vec<String> = records.iter().map(DisruptionRecord::label).collect();
        assert_eq!(ids, vec!["TIMS-1", "<unidentified>"]);
    }

    #[test]
    fn credentials_travel_as_query_parameters() {
        let creds = Credentials::new(Some("my-app".into()), "k&y").unwrap();
        let config = PipelineConfig::new(creds, ".");
        let fetcher =
            DisruptionFetcher::with_transport(ApiClient::new(Duration::from_secs(1)).unwrap(), &config);

        let url = fetcher.request_url();
        assert_eq!(url.path(), "/Road/all/Disruption");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("app_id".to_string(), "my-app".to_string()),
                ("app_key".to_string(), "k&y".to_string()),
            ]
        );
    }
}
