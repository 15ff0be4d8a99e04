use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use bay_types::{BayError, Result};

/// Resource envelope applied to a Ship's container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub image: String,
    pub network: String,
    pub cpus: f64,
    pub memory: String,
    pub ttl: i64,
}

/// Everything the allocator needs back from a successful provision.
#[derive(Debug, Clone)]
pub struct ProvisionedContainer {
    pub container_id: String,
    pub ip_address: String,
}

/// Abstraction over the container backend so the allocator and scheduler can
/// be tested without a real Docker daemon.
#[async_trait]
pub trait ContainerDriver: Send + Sync {
    async fn create(&self, ship_id: &str, spec: &ContainerSpec) -> Result<ProvisionedContainer>;
    async fn stop(&self, container_id: &str) -> Result<()>;
    async fn is_running(&self, container_id: &str) -> Result<bool>;
    async fn logs(&self, container_id: &str, tail: Option<u32>) -> Result<String>;
}

/// Shells out to the `docker` CLI. Grounded on the same process-spawning
/// idiom the teacher uses to launch agent containers, generalized to
/// long-lived Ship containers instead of one-shot task runners.
pub struct DockerContainerDriver;

impl DockerContainerDriver {
    pub fn new() -> Self {
        Self
    }

    /// `CpuQuota = cpus * 100000`, `CpuPeriod = 100000` — the same formula
    /// Docker's own `--cpus` flag implements.
    fn cpu_quota(cpus: f64) -> String {
        format!("{}", (cpus * 100_000.0).round() as i64)
    }

    /// Accepts suffixes k/kb/m/mb/g/gb (case-insensitive); a bare number is
    /// assumed to already be bytes.
    pub fn parse_memory_string(mem: &str) -> Result<u64> {
        let mem = mem.trim().to_lowercase();
        let (digits, multiplier): (&str, u64) = if let Some(d) = mem.strip_suffix("kb") {
            (d, 1024)
        } else if let Some(d) = mem.strip_suffix('k') {
            (d, 1024)
        } else if let Some(d) = mem.strip_suffix("mb") {
            (d, 1024 * 1024)
        } else if let Some(d) = mem.strip_suffix('m') {
            (d, 1024 * 1024)
        } else if let Some(d) = mem.strip_suffix("gb") {
            (d, 1024 * 1024 * 1024)
        } else if let Some(d) = mem.strip_suffix('g') {
            (d, 1024 * 1024 * 1024)
        } else {
            (mem.as_str(), 1)
        };

        let value: u64 = digits
            .trim()
            .parse()
            .map_err(|_| BayError::ProvisionError(format!("invalid memory string: {mem}")))?;

        Ok(value * multiplier)
    }
}

impl Default for DockerContainerDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerDriver for DockerContainerDriver {
    async fn create(&self, ship_id: &str, spec: &ContainerSpec) -> Result<ProvisionedContainer> {
        let memory_bytes = Self::parse_memory_string(&spec.memory)?;
        let container_name = format!("bay-ship-{ship_id}");

        let mut args: Vec<String> = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            container_name,
            "--restart".to_string(),
            "no".to_string(),
            "--cpu-quota".to_string(),
            Self::cpu_quota(spec.cpus),
            "--cpu-period".to_string(),
            "100000".to_string(),
            "--memory".to_string(),
            memory_bytes.to_string(),
            "--label".to_string(),
            format!("ship_id={ship_id}"),
            "--label".to_string(),
            "created_by=bay".to_string(),
            "--env".to_string(),
            format!("SHIP_ID={ship_id}"),
            "--env".to_string(),
            format!("TTL={}", spec.ttl),
            "-p".to_string(),
            "8123".to_string(),
        ];

        if !spec.network.is_empty() {
            args.push("--network".to_string());
            args.push(spec.network.clone());
        }

        args.push(spec.image.clone());

        debug!(ship_id, args = ?args, "Launching ship container");

        let output = Command::new("docker")
            .args(&args)
            .output()
            .await
            .map_err(|e| BayError::ProvisionError(format!("failed to spawn docker: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BayError::ProvisionError(format!(
                "docker run failed: {stderr}"
            )));
        }

        let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let ip_address = self.inspect_ip(&container_id, &spec.network).await?;

        Ok(ProvisionedContainer {
            container_id,
            ip_address,
        })
    }

    async fn stop(&self, container_id: &str) -> Result<()> {
        let output = Command::new("docker")
            .args(["rm", "-f", container_id])
            .output()
            .await
            .map_err(|e| BayError::ProvisionError(format!("failed to stop container: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.contains("No such container") {
                warn!(container_id, stderr = %stderr, "docker rm warning");
                return Err(BayError::ProvisionError(format!(
                    "failed to remove container: {stderr}"
                )));
            }
        }

        Ok(())
    }

    async fn is_running(&self, container_id: &str) -> Result<bool> {
        let output = Command::new("docker")
            .args(["inspect", "--format", "{{.State.Running}}", container_id])
            .output()
            .await
            .map_err(|e| BayError::ProvisionError(format!("failed to inspect container: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("No such container") {
                return Ok(false);
            }
            return Err(BayError::ProvisionError(format!(
                "failed to inspect container: {stderr}"
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim() == "true")
    }

    async fn logs(&self, container_id: &str, tail: Option<u32>) -> Result<String> {
        let mut args = vec!["logs".to_string()];
        if let Some(n) = tail {
            args.push("--tail".to_string());
            args.push(n.to_string());
        }
        args.push(container_id.to_string());

        let output = Command::new("docker")
            .args(&args)
            .output()
            .await
            .map_err(|e| BayError::ProvisionError(format!("failed to fetch logs: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BayError::ProvisionError(format!(
                "docker logs failed: {stderr}"
            )));
        }

        Ok(format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        ))
    }
}

impl DockerContainerDriver {
    async fn inspect_ip(&self, container_id: &str, network: &str) -> Result<String> {
        let format = if network.is_empty() {
            "{{.NetworkSettings.IPAddress}}".to_string()
        } else {
            format!("{{{{.NetworkSettings.Networks.{network}.IPAddress}}}}")
        };
        let output = Command::new("docker")
            .args(["inspect", "--format", &format, container_id])
            .output()
            .await
            .map_err(|e| BayError::ProvisionError(format!("failed to inspect network: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BayError::ProvisionError(format!(
                "failed to inspect container network: {stderr}"
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
