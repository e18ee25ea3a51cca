//! Runner configuration
//!
//! Defines the service address, polling behavior and working-directory
//! handling for jobs run through the bridge.

use std::path::PathBuf;
use std::time::Duration;
use tesbridge_client::normalize_addr;

use crate::scheduler::PollPolicy;
use crate::service::task_builder::DEFAULT_DOCKER_WORKDIR;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Task Execution Service address (e.g., "http://localhost:8000")
    pub tes_url: String,

    /// How long a worker sleeps before each status query
    pub poll_interval: Duration,

    /// Failed status queries tolerated per job before giving up
    pub poll_retries: u32,

    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,

    /// Directory relative paths are resolved against
    pub basedir: PathBuf,

    /// Working directory inside the container
    pub docker_workdir: String,

    /// Remove the job's temporary directory during cleanup
    pub rm_tmpdir: bool,

    /// Report `permanentFail` without collecting outputs when the task ends
    /// in a failed remote state or polling gives up
    pub fail_on_remote_error: bool,
}

impl RunnerConfig {
    /// Creates a new configuration with defaults
    ///
    /// `tes_url` is normalized the way the client does it, so
    /// `funnel:8000` becomes `http://funnel:8000`.
    pub fn new(tes_url: String) -> Self {
        Self {
            tes_url: normalize_addr(tes_url),
            poll_interval: Duration::from_secs(1),
            poll_retries: 10,
            request_timeout: Duration::from_secs(30),
            basedir: PathBuf::from("."),
            docker_workdir: DEFAULT_DOCKER_WORKDIR.to_string(),
            rm_tmpdir: true,
            fail_on_remote_error: false,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - TES_URL (required)
    /// - POLL_INTERVAL (optional, seconds, default: 1)
    /// - POLL_RETRIES (optional, default: 10)
    /// - REQUEST_TIMEOUT (optional, seconds, default: 30)
    /// - BASEDIR (optional, default: current directory)
    /// - DOCKER_WORKDIR (optional, default: /var/spool/cwl)
    /// - RM_TMPDIR (optional, true/false, default: true)
    /// - FAIL_ON_REMOTE_ERROR (optional, true/false, default: false)
    pub fn from_env() -> anyhow::Result<Self> {
        let tes_url = std::env::var("TES_URL")
            .map_err(|_| anyhow::anyhow!("TES_URL environment variable not set"))?;

        let mut config = Self::new(tes_url);

        if let Some(secs) = env_parse::<u64>("POLL_INTERVAL") {
            config.poll_interval = Duration::from_secs(secs);
        }

        if let Some(retries) = env_parse::<u32>("POLL_RETRIES") {
            config.poll_retries = retries;
        }

        if let Some(secs) = env_parse::<u64>("REQUEST_TIMEOUT") {
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Ok(basedir) = std::env::var("BASEDIR") {
            config.basedir = PathBuf::from(basedir);
        }

        if let Ok(workdir) = std::env::var("DOCKER_WORKDIR") {
            config.docker_workdir = workdir;
        }

        if let Some(rm) = env_parse::<bool>("RM_TMPDIR") {
            config.rm_tmpdir = rm;
        }

        if let Some(fail) = env_parse::<bool>("FAIL_ON_REMOTE_ERROR") {
            config.fail_on_remote_error = fail;
        }

        Ok(config)
    }

    /// Polling policy handed to every worker
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: self.poll_interval,
            retries: self.poll_retries,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tes_url.is_empty() {
            anyhow::bail!("tes_url cannot be empty");
        }

        if !self.tes_url.starts_with("http://") && !self.tes_url.starts_with("https://") {
            anyhow::bail!("tes_url must start with http:// or https://");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.poll_retries == 0 {
            anyhow::bail!("poll_retries must be greater than 0");
        }

        if self.docker_workdir.is_empty() {
            anyhow::bail!("docker_workdir cannot be empty");
        }

        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new("http://localhost:8000".to_string())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.poll_retries, 10);
        assert_eq!(config.docker_workdir, "/var/spool/cwl");
        assert!(config.rm_tmpdir);
        assert!(!config.fail_on_remote_error);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = RunnerConfig::default();

        // Valid config should pass
        assert!(config.validate().is_ok());

        // Invalid URL should fail
        config.tes_url = "ftp://tes.example.org".to_string();
        assert!(config.validate().is_err());

        config.tes_url = "https://tes.example.org".to_string();
        assert!(config.validate().is_ok());

        // Zero budget would give up before the first poll
        config.poll_retries = 0;
        assert!(config.validate().is_err());
        config.poll_retries = 1;

        config.poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        // Sub-second intervals are fine
        config.poll_interval = Duration::from_millis(250);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_address_without_scheme_is_normalized() {
        let config = RunnerConfig::new("funnel:8000/".to_string());
        assert_eq!(config.tes_url, "http://funnel:8000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_poll_policy() {
        let config = RunnerConfig {
            poll_interval: Duration::from_millis(5),
            poll_retries: 3,
            ..RunnerConfig::default()
        };

        assert_eq!(
            config.poll_policy(),
            PollPolicy {
                interval: Duration::from_millis(5),
                retries: 3,
            }
        );
    }
}
