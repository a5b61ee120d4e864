//! Agent readiness probing.
//!
//! Every agent serves a public agent card at [`AGENT_CARD_PATH`]. An agent counts
//! as ready once that document is served with a 2xx status and parses as JSON.

use std::time::{Duration, Instant};

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::HealthError;

/// Well-known path of the agent card.
pub const AGENT_CARD_PATH: &str = "/.well-known/agent-card.json";

const USER_AGENT: &str = concat!("agentbeats-compose/", env!("CARGO_PKG_VERSION"));

/// Configuration for readiness polling.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthProbeConfig {
    /// Delay between attempts.
    pub interval: Duration,
    /// Give up after this much time has passed.
    pub timeout: Duration,
    /// Timeout for a single HTTP request.
    pub request_timeout: Duration,
}

impl Default for HealthProbeConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(180),
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl HealthProbeConfig {
    /// Sets the delay between attempts.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the overall timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// The parts of an agent card worth reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Outcome of a successful probe.
#[derive(Debug, Clone, Serialize)]
pub struct AgentHealth {
    pub endpoint: String,
    pub card: AgentCard,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Returns the agent card URL for an endpoint.
pub fn agent_card_url(endpoint: &str) -> String {
    format!("{}{}", endpoint.trim_end_matches('/'), AGENT_CARD_PATH)
}

/// Builds the HTTP client used for probing.
///
/// Agents live on the compose network, so system proxies are bypassed.
pub fn build_client(config: &HealthProbeConfig) -> Result<reqwest::Client, HealthError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.request_timeout)
        .no_proxy()
        .build()?)
}

async fn fetch_card(client: &reqwest::Client, url: &str) -> Result<AgentCard, String> {
    let response = client.get(url).send().await.map_err(|e| e.to_string())?;
    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {}", status));
    }
    response
        .json::<AgentCard>()
        .await
        .map_err(|e| format!("invalid agent card: {}", e))
}

/// Polls one endpoint until its agent card is served or the timeout passes.
pub async fn wait_for_agent(
    client: &reqwest::Client,
    endpoint: &str,
    config: &HealthProbeConfig,
) -> Result<AgentHealth, HealthError> {
    let url = agent_card_url(endpoint);
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match fetch_card(client, &url).await {
            Ok(card) => {
                let elapsed = started.elapsed();
                info!(
                    endpoint,
                    attempts,
                    agent = card.name.as_deref().unwrap_or("unknown"),
                    "Agent is ready"
                );
                return Ok(AgentHealth {
                    endpoint: endpoint.to_string(),
                    card,
                    attempts,
                    elapsed,
                });
            }
            Err(err) => {
                let elapsed = started.elapsed();
                let remaining = config.timeout.saturating_sub(elapsed);
                if remaining.is_zero() {
                    warn!(endpoint, attempts, error = %err, "Agent did not become ready");
                    return Err(HealthError::Timeout {
                        endpoint: endpoint.to_string(),
                        attempts,
                        elapsed,
                        last_error: err,
                    });
                }
                debug!(endpoint, attempt = attempts, error = %err, "Agent not ready yet");
                // The last attempt lands on the deadline instead of past it.
                tokio::time::sleep(config.interval.min(remaining)).await;
            }
        }
    }
}

/// Polls all endpoints concurrently; fails as soon as one of them times out.
pub async fn wait_for_all(
    endpoints: &[String],
    config: &HealthProbeConfig,
) -> Result<Vec<AgentHealth>, HealthError> {
    if endpoints.is_empty() {
        return Err(HealthError::NoEndpoints);
    }

    let client = build_client(config)?;
    info!(count = endpoints.len(), "Waiting for agents");
    try_join_all(
        endpoints
            .iter()
            .map(|endpoint| wait_for_agent(&client, endpoint, config)),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves `failures` 503 responses, then the agent card, on a local port.
    async fn spawn_card_server(failures: usize) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;

                let response = if n < failures {
                    "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        .to_string()
                } else {
                    let body = r#"{"name":"judge","version":"1.0.0","skills":[]}"#;
                    format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    )
                };
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}", addr), hits)
    }

    fn fast_config() -> HealthProbeConfig {
        HealthProbeConfig::default()
            .with_interval(Duration::from_millis(20))
            .with_timeout(Duration::from_secs(5))
            .with_request_timeout(Duration::from_secs(1))
    }

    #[test]
    fn test_agent_card_url() {
        assert_eq!(
            agent_card_url("http://green-agent:9009"),
            "http://green-agent:9009/.well-known/agent-card.json"
        );
        assert_eq!(
            agent_card_url("http://green-agent:9009/"),
            "http://green-agent:9009/.well-known/agent-card.json"
        );
    }

    #[tokio::test]
    async fn test_wait_for_ready_agent() {
        let (endpoint, hits) = spawn_card_server(0).await;
        let config = fast_config();
        let client = build_client(&config).unwrap();

        let health = wait_for_agent(&client, &endpoint, &config).await.unwrap();
        assert_eq!(health.attempts, 1);
        assert_eq!(health.card.name.as_deref(), Some("judge"));
        assert!(health.card.extra.contains_key("skills"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wait_retries_until_ready() {
        let (endpoint, _) = spawn_card_server(2).await;
        let config = fast_config();
        let client = build_client(&config).unwrap();

        let health = wait_for_agent(&client, &endpoint, &config).await.unwrap();
        assert_eq!(health.attempts, 3);
    }

    #[tokio::test]
    async fn test_wait_times_out_on_dead_endpoint() {
        let endpoint = dead_endpoint().await;
        let config = fast_config().with_timeout(Duration::from_millis(200));
        let client = build_client(&config).unwrap();
        let err = wait_for_agent(&client, &endpoint, &config)
            .await
            .unwrap_err();
        match err {
            HealthError::Timeout { attempts, .. } => assert!(attempts >= 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_wait_for_all() {
        let (green, _) = spawn_card_server(0).await;
        let (purple, _) = spawn_card_server(1).await;
        let results = wait_for_all(&[green.clone(), purple.clone()], &fast_config())
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].endpoint, green);
        assert_eq!(results[1].endpoint, purple);
    }

    async fn dead_endpoint() -> String {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_long_interval_is_capped_at_timeout() {
        let endpoint = dead_endpoint().await;
        let config = fast_config()
            .with_interval(Duration::MAX)
            .with_timeout(Duration::from_millis(200));
        let client = build_client(&config).unwrap();

        let err = wait_for_agent(&client, &endpoint, &config)
            .await
            .unwrap_err();
        match err {
            HealthError::Timeout {
                attempts, elapsed, ..
            } => {
                assert_eq!(attempts, 2);
                assert!(elapsed >= Duration::from_millis(200));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_wait_for_all_fails_on_dead_endpoint() {
        let (green, _) = spawn_card_server(0).await;
        let dead = dead_endpoint().await;
        let config = fast_config().with_timeout(Duration::from_millis(300));

        let started = Instant::now();
        let err = wait_for_all(&[green, dead.clone()], &config)
            .await
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(3));
        match err {
            HealthError::Timeout { endpoint, .. } => assert_eq!(endpoint, dead),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_wait_for_all_requires_endpoints() {
        let err = wait_for_all(&[], &fast_config()).await.unwrap_err();
        assert!(matches!(err, HealthError::NoEndpoints));
    }
}
