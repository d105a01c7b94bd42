use std::path::PathBuf;
use std::time::Duration;

use gsplat_reconstruction::ReconstructionThresholds;
use gsplat_trainer::TrainerConfig;
use gsplat_uploader::{RetryPolicy, S3UploadConfig};
use thiserror::Error;

/// Default wall-clock budget for one job
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

/// Where finished artifacts go
#[derive(Debug, Clone)]
pub enum UploadTarget {
    /// The master server's HTTP upload endpoint
    Http,
    /// An S3-compatible bucket
    S3(S3UploadConfig),
}

/// Worker configuration, collected once at startup
///
/// Everything the pipeline needs flows from here; no module reads the
/// environment on its own.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base URL of the master server receiving artifacts
    pub master_server_url: String,
    /// Bearer token for the upload endpoint; omitted when unset
    pub upload_api_key: Option<String>,
    /// Which uploader the artifact goes through
    pub upload_target: UploadTarget,
    /// Root under which per-scene workspaces are created
    pub work_dir: PathBuf,
    /// Wall-clock budget for one job, end to end
    pub job_timeout: Duration,
    /// Keep the scene workspace after a successful job
    pub keep_workspace: bool,
    /// Minimum reconstruction size worth training on
    pub thresholds: ReconstructionThresholds,
    /// Upload retry behavior
    pub retry: RetryPolicy,
    /// How the training tool is launched
    pub trainer: TrainerConfig,
}

impl WorkerConfig {
    /// Read configuration from the environment
    ///
    /// `MASTER_SERVER_URL` is required; everything else has a default.
    /// `GSPLAT_UPLOAD_TARGET=s3` switches to the bucket uploader and makes
    /// the S3 variables required.
    pub fn from_env() -> Result<Self, ConfigError> {
        let master_server_url = require_var("MASTER_SERVER_URL")?;

        let upload_api_key = std::env::var("UPLOAD_API_KEY").ok().filter(|k| !k.is_empty());

        let upload_target = match std::env::var("GSPLAT_UPLOAD_TARGET").ok().as_deref() {
            None | Some("http") => UploadTarget::Http,
            Some("s3") => UploadTarget::S3(S3UploadConfig {
                bucket: require_var("GSPLAT_S3_BUCKET")?,
                region: std::env::var("GSPLAT_S3_REGION")
                    .unwrap_or_else(|_| "us-east-1".to_string()),
                endpoint: std::env::var("GSPLAT_S3_ENDPOINT").ok(),
                access_key_id: require_var("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require_var("AWS_SECRET_ACCESS_KEY")?,
                key_prefix: std::env::var("GSPLAT_S3_KEY_PREFIX")
                    .unwrap_or_else(|_| "gsplatt/".to_string()),
            }),
            Some(other) => {
                return Err(ConfigError::InvalidVar {
                    name: "GSPLAT_UPLOAD_TARGET",
                    value: other.to_string(),
                })
            }
        };

        let work_dir = std::env::var("GSPLAT_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("gsplat-worker"));

        let job_timeout = match std::env::var("GSPLAT_JOB_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(parse_secs(&raw).ok_or(ConfigError::InvalidVar {
                name: "GSPLAT_JOB_TIMEOUT_SECS",
                value: raw.clone(),
            })?),
            Err(_) => Duration::from_secs(DEFAULT_JOB_TIMEOUT_SECS),
        };

        let keep_workspace = std::env::var("GSPLAT_KEEP_WORKSPACE")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        Ok(Self {
            master_server_url,
            upload_api_key,
            upload_target,
            work_dir,
            job_timeout,
            keep_workspace,
            thresholds: ReconstructionThresholds::default(),
            retry: RetryPolicy::default(),
            trainer: TrainerConfig::default(),
        })
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn parse_secs(raw: &str) -> Option<u64> {
    raw.trim().parse().ok().filter(|&secs| secs > 0)
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_secs() {
        assert_eq!(parse_secs("3600"), Some(3600));
        assert_eq!(parse_secs(" 30 "), Some(30));
        assert_eq!(parse_secs("0"), None);
        assert_eq!(parse_secs("soon"), None);
    }

    // Env mutation in one sequential test; nothing else in the crate reads
    // these variables.
    #[test]
    fn test_from_env_upload_targets() {
        std::env::set_var("MASTER_SERVER_URL", "https://server");
        std::env::remove_var("GSPLAT_UPLOAD_TARGET");
        assert!(matches!(
            WorkerConfig::from_env().unwrap().upload_target,
            UploadTarget::Http
        ));

        std::env::set_var("GSPLAT_UPLOAD_TARGET", "s3");
        std::env::remove_var("GSPLAT_S3_BUCKET");
        assert!(matches!(
            WorkerConfig::from_env().unwrap_err(),
            ConfigError::MissingVar("GSPLAT_S3_BUCKET")
        ));

        std::env::set_var("GSPLAT_S3_BUCKET", "scenes");
        std::env::set_var("AWS_ACCESS_KEY_ID", "key");
        std::env::set_var("AWS_SECRET_ACCESS_KEY", "secret");
        match WorkerConfig::from_env().unwrap().upload_target {
            UploadTarget::S3(s3) => {
                assert_eq!(s3.bucket, "scenes");
                assert_eq!(s3.key_prefix, "gsplatt/");
                assert!(s3.endpoint.is_none());
            }
            UploadTarget::Http => panic!("expected the S3 target"),
        }

        std::env::set_var("GSPLAT_UPLOAD_TARGET", "carrier-pigeon");
        assert!(matches!(
            WorkerConfig::from_env().unwrap_err(),
            ConfigError::InvalidVar { .. }
        ));
        std::env::remove_var("GSPLAT_UPLOAD_TARGET");
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool("yes"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool(""));
        assert!(!parse_bool("no"));
    }
}
