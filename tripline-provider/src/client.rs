use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use tracing::{info, warn};

use tripline_core::search::TripType;

use crate::payload::ProviderResponse;

/// Upstream failures are tagged so callers retry only what is worth
/// retrying: transport-level trouble is transient, a rejected request is
/// terminal.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("transient provider failure: {0}")]
    Transient(String),
    #[error("provider rejected request: {0}")]
    Terminal(String),
}

/// One search call against the upstream provider. Round-trip return
/// fetches reuse the same call with the outbound candidate's
/// `departure_token` attached.
#[derive(Debug, Clone)]
pub struct ProviderQuery {
    pub origin: String,
    pub destination: String,
    pub outbound_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub trip_type: TripType,
    pub adults: u32,
    pub cabin_class: Option<String>,
    pub currency: String,
    pub departure_token: Option<String>,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &ProviderQuery) -> Result<ProviderResponse, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    /// Retries after the first attempt, transient failures only.
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

pub struct HttpSearchProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl HttpSearchProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Terminal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn query_params(&self, query: &ProviderQuery) -> Vec<(String, String)> {
        let mut params = vec![
            ("engine".to_string(), "google_flights".to_string()),
            ("departure_id".to_string(), query.origin.clone()),
            ("arrival_id".to_string(), query.destination.clone()),
            ("outbound_date".to_string(), query.outbound_date.to_string()),
            ("type".to_string(), query.trip_type.provider_code().to_string()),
            ("hl".to_string(), "en".to_string()),
            ("currency".to_string(), query.currency.clone()),
            ("adults".to_string(), query.adults.to_string()),
            ("api_key".to_string(), self.config.api_key.clone()),
        ];
        if let Some(date) = query.return_date {
            params.push(("return_date".to_string(), date.to_string()));
        }
        if let Some(cabin) = &query.cabin_class {
            params.push(("travel_class".to_string(), cabin.clone()));
        }
        if let Some(token) = &query.departure_token {
            params.push(("departure_token".to_string(), token.clone()));
        }
        params
    }

    async fn fetch_once(&self, query: &ProviderQuery) -> Result<ProviderResponse, ProviderError> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&self.query_params(query))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ProviderError::Transient(format!("transport failure: {e}"))
                } else {
                    ProviderError::Terminal(format!("request failure: {e}"))
                }
            })?;

        match classify_status(response.status()) {
            StatusClass::Ok => {}
            StatusClass::Transient => {
                return Err(ProviderError::Transient(format!(
                    "provider returned {}",
                    response.status()
                )))
            }
            StatusClass::Terminal => {
                return Err(ProviderError::Terminal(format!(
                    "provider returned {}",
                    response.status()
                )))
            }
        }

        response
            .json::<ProviderResponse>()
            .await
            .map_err(|e| ProviderError::Terminal(format!("malformed provider payload: {e}")))
    }
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    async fn search(&self, query: &ProviderQuery) -> Result<ProviderResponse, ProviderError> {
        let response = with_retries(self.config.max_retries, self.config.retry_base_delay, |_| {
            self.fetch_once(query)
        })
        .await?;
        info!(
            origin = %query.origin,
            destination = %query.destination,
            "Provider search succeeded"
        );
        Ok(response)
    }
}

/// Drive a fetch with bounded retries. Only transient failures retry,
/// with exponential backoff between attempts; a terminal failure ends the
/// loop immediately and exhaustion returns the last transient error
/// unchanged.
async fn with_retries<T, F, Fut>(
    max_retries: u32,
    base_delay: Duration,
    mut fetch: F,
) -> Result<T, ProviderError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        match fetch(attempt).await {
            Ok(value) => return Ok(value),
            Err(ProviderError::Transient(msg)) if attempt < max_retries => {
                let delay = backoff_delay(base_delay, attempt);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Transient provider failure, retrying: {msg}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[derive(Debug, PartialEq)]
enum StatusClass {
    Ok,
    Transient,
    Terminal,
}

fn classify_status(status: StatusCode) -> StatusClass {
    if status.is_success() {
        StatusClass::Ok
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        StatusClass::Transient
    } else {
        StatusClass::Terminal
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt)
}
