use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use bay_types::{BayError, Result};

/// Polls a Ship's `/health` until it answers or the budget is exhausted.
/// Pulled out behind a trait (mirroring [`crate::ContainerDriver`]) so the
/// allocator's provisioning path can be exercised in tests without a real
/// Ship listening on the other end.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn wait_until_ready(
        &self,
        ip_address: &str,
        timeout: Duration,
        interval: Duration,
    ) -> Result<()>;
}

/// Polls `GET http://{ip}:8123/health` over real HTTP via `reqwest`.
pub struct HttpReadinessProbe {
    client: reqwest::Client,
}

impl HttpReadinessProbe {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| BayError::ForwardError(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ReadinessProbe for HttpReadinessProbe {
    /// Poll `/health` every `interval` up to `timeout`, returning once the
    /// Ship answers with 2xx.
    async fn wait_until_ready(
        &self,
        ip_address: &str,
        timeout: Duration,
        interval: Duration,
    ) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let url = format!("http://{ip_address}:8123/health");

        loop {
            let attempt = self
                .client
                .get(&url)
                .timeout(Duration::from_secs(5))
                .send()
                .await;

            match attempt {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => warn!(ip_address, status = %resp.status(), "ship not ready yet"),
                Err(e) => warn!(ip_address, error = %e, "readiness probe failed"),
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(BayError::ReadinessTimeout);
            }

            tokio::time::sleep(interval).await;
        }
    }
}
