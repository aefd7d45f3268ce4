use crate::domain::ProcessedAgentData;
use std::fmt;
use std::time::Duration;
use tracing::warn;

/// A failed delivery attempt, reported as a value. The caller decides whether
/// the batch is dropped or tried again later.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryError {
    /// HTTP status, when the store answered at all.
    pub status: Option<u16>,
    pub message: String,
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "store responded {}: {}", status, self.message),
            None => write!(f, "transport failure: {}", self.message),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Pushes classified batches to the store over HTTP.
///
/// Each `send` issues one POST with the batch serialized as a JSON array.
/// Failed attempts are retried a bounded number of times with a fixed delay;
/// after the last attempt the error is returned.
pub struct UplinkClient {
    client: reqwest::Client,
    endpoint: String,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl UplinkClient {
    pub fn new(base_url: &str, retry_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/processed_agent_data/", base_url.trim_end_matches('/')),
            retry_attempts,
            retry_delay,
        }
    }

    /// Delivers one batch. Network I/O is the only side effect; no state is
    /// retained across calls beyond the target URL.
    pub async fn send(&self, batch: &[ProcessedAgentData]) -> Result<(), DeliveryError> {
        let mut last_error = None;

        for attempt in 0..=self.retry_attempts {
            match self.post_once(batch).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        attempts_allowed = self.retry_attempts + 1,
                        error = %e,
                        "batch delivery attempt failed"
                    );
                    last_error = Some(e);
                }
            }
            if attempt < self.retry_attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        // retry_attempts + 1 iterations always run at least once
        Err(last_error.unwrap_or_else(|| DeliveryError {
            status: None,
            message: "no delivery attempt was made".to_string(),
        }))
    }

    async fn post_once(&self, batch: &[ProcessedAgentData]) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(batch)
            .send()
            .await
            .map_err(|e| DeliveryError {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError {
                status: Some(status.as_u16()),
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    body
                },
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_error_display() {
        let with_status = DeliveryError {
            status: Some(422),
            message: "validation failed".to_string(),
        };
        assert_eq!(
            with_status.to_string(),
            "store responded 422: validation failed"
        );

        let transport = DeliveryError {
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(transport.to_string(), "transport failure: connection refused");
    }

    #[test]
    fn test_endpoint_normalization() {
        let client = UplinkClient::new("http://localhost:8000/", 0, Duration::ZERO);
        assert_eq!(
            client.endpoint,
            "http://localhost:8000/processed_agent_data/"
        );

        let client = UplinkClient::new("http://localhost:8000", 0, Duration::ZERO);
        assert_eq!(
            client.endpoint,
            "http://localhost:8000/processed_agent_data/"
        );
    }
}
