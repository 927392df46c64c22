use std::env;
use std::path::PathBuf;

use crate::confidence::ConfidencePolicy;
use crate::model_store::ModelStore;
use crate::runtime::RuntimeConfig;

/// Environment variable naming the model artifact manifest
pub const MODEL_ENV_VAR: &str = "SPAMSIFT_MODEL";

/// Everything needed to construct a [`crate::SpamDetector`]
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Path to the artifact manifest (JSON)
    pub artifact_path: PathBuf,
    pub runtime: RuntimeConfig,
    pub policy: ConfidencePolicy,
    /// Use the keyword classifier when the artifact cannot be loaded
    pub keyword_fallback: bool,
}

impl DetectorConfig {
    pub fn new(artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            artifact_path: artifact_path.into(),
            runtime: RuntimeConfig::default(),
            policy: ConfidencePolicy::default(),
            keyword_fallback: false,
        }
    }

    pub fn with_policy(mut self, policy: ConfidencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_runtime_config(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_keyword_fallback(mut self, enabled: bool) -> Self {
        self.keyword_fallback = enabled;
        self
    }

    /// `$SPAMSIFT_MODEL` if set, otherwise the manifest in the default model store directory
    pub fn default_artifact_path() -> PathBuf {
        match env::var(MODEL_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => ModelStore::get_default_models_dir().join(crate::artifact::MANIFEST_FILE),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new(Self::default_artifact_path())
    }
}
