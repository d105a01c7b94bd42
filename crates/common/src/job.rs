use serde::{Deserialize, Serialize};

/// Training parameter set, immutable once the job is accepted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainParams {
    /// Total training iterations
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Frame sampling rate (frames per second of source video)
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Checkpoint cadence in iterations; the tool's own default when unset
    #[serde(default)]
    pub checkpoint_interval: Option<u32>,
}

fn default_iterations() -> u32 {
    30_000
}

fn default_fps() -> f64 {
    2.0
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            fps: default_fps(),
            checkpoint_interval: None,
        }
    }
}

/// A job request as submitted by the hosting runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    /// Source video locator (http/https URL, or file:// for local staging)
    pub video_url: String,
    /// Caller-supplied unique scene identifier; generated when absent
    #[serde(default)]
    pub scene_id: Option<String>,
    /// Training parameters
    #[serde(default)]
    pub params: TrainParams,
}

impl JobRequest {
    /// Resolve the scene identifier, generating one when the caller omitted it
    #[must_use]
    pub fn scene_id_or_generated(&self) -> String {
        self.scene_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }
}

/// Final job status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Error,
}

/// The single entity exposed across the job boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub status: JobStatus,
    pub scene_id: String,
    /// Coarse progress percentage, 0-100
    pub progress: u8,
    /// Retrieval URL of the uploaded artifact (success only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plt_url: Option<String>,
    /// Human-readable error detail (failure only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResult {
    /// Build a successful result carrying the artifact URL
    #[must_use]
    pub fn success(scene_id: String, plt_url: String) -> Self {
        Self {
            status: JobStatus::Success,
            scene_id,
            progress: 100,
            plt_url: Some(plt_url),
            error: None,
        }
    }

    /// Build a failed result; `progress` is the last value reported
    #[must_use]
    pub fn failure(scene_id: String, progress: u8, error: String) -> Self {
        Self {
            status: JobStatus::Error,
            scene_id,
            progress,
            plt_url: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserialization_with_defaults() {
        let json = r#"{"video_url": "https://example.com/clip.mp4"}"#;
        let request: JobRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.video_url, "https://example.com/clip.mp4");
        assert!(request.scene_id.is_none());
        assert_eq!(request.params.iterations, 30_000);
        assert!((request.params.fps - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_request_deserialization_full() {
        let json = r#"{
            "video_url": "https://example.com/clip.mp4",
            "scene_id": "my-scene-123",
            "params": {"iterations": 7000, "fps": 4.0}
        }"#;
        let request: JobRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.scene_id.as_deref(), Some("my-scene-123"));
        assert_eq!(request.params.iterations, 7000);
        assert!(request.params.checkpoint_interval.is_none());
    }

    #[test]
    fn test_scene_id_generated_when_absent() {
        let request = JobRequest {
            video_url: "https://example.com/clip.mp4".into(),
            scene_id: None,
            params: TrainParams::default(),
        };
        let a = request.scene_id_or_generated();
        let b = request.scene_id_or_generated();
        assert!(!a.is_empty());
        // Generated ids are unique per call; caller-supplied ids are stable.
        assert_ne!(a, b);
    }

    #[test]
    fn test_success_result_serialization() {
        let result = JobResult::success(
            "my-scene-123".into(),
            "https://server/files/gsplatt/my-scene-123.zip".into(),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["progress"], 100);
        assert_eq!(
            json["plt_url"],
            "https://server/files/gsplatt/my-scene-123.zip"
        );
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_result_serialization() {
        let result = JobResult::failure("scene".into(), 20, "reconstruction failed".into());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["progress"], 20);
        assert!(json.get("plt_url").is_none());
        assert_eq!(json["error"], "reconstruction failed");
    }
}
