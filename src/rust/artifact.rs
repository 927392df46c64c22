//! On-disk description of a spam classifier.
//!
//! An artifact is a single JSON manifest. ONNX artifacts reference a model file and a
//! tokenizer file next to it; keyword artifacts are self-contained.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierError;

/// File name used for manifests inside a [`crate::ModelStore`] directory
pub const MANIFEST_FILE: &str = "manifest.json";

fn default_max_sequence_length() -> usize {
    256
}

/// Top-level artifact manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub name: String,
    pub backend: Backend,
}

/// How the classifier is executed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backend {
    Onnx(OnnxSpec),
    Keywords(KeywordSpec),
}

/// An ONNX model fed by a Hugging Face tokenizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnnxSpec {
    pub model_file: String,
    pub tokenizer_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_sha256: Option<String>,
    /// Longer inputs are truncated by the tokenizer, keeping its special tokens
    #[serde(default = "default_max_sequence_length")]
    pub max_sequence_length: usize,
    pub capability: Capability,
    /// Optional integer label output; when absent labels are derived from the capability output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_output: Option<String>,
}

/// The confidence output a model exposes, named by its ONNX output tensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Capability {
    /// `[batch, 2]` float tensor of `[ham, spam]` probabilities
    Probabilities { output: String },
    /// `[batch]` or `[batch, 1]` float tensor of signed margins
    DecisionScores { output: String },
    /// `[batch]` integer tensor of 0/1 labels
    Labels { output: String },
}

impl Capability {
    pub fn output(&self) -> &str {
        match self {
            Self::Probabilities { output }
            | Self::DecisionScores { output }
            | Self::Labels { output } => output,
        }
    }
}

/// Keyword matching on lower-cased text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordSpec {
    pub keywords: Vec<String>,
}

impl ArtifactManifest {
    /// Reads and parses a manifest file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ClassifierError::ArtifactError(format!(
                "Model artifact not found: {}",
                path.display()
            )));
        }
        let bytes = fs::read(path)?;
        let manifest: Self = serde_json::from_slice(&bytes)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), ClassifierError> {
        match &self.backend {
            Backend::Onnx(spec) => {
                if spec.model_file.is_empty() || spec.tokenizer_file.is_empty() {
                    return Err(ClassifierError::ArtifactError(
                        "Model and tokenizer file names cannot be empty".into(),
                    ));
                }
                if spec.max_sequence_length == 0 {
                    return Err(ClassifierError::ArtifactError(
                        "max_sequence_length must be positive".into(),
                    ));
                }
                if spec.capability.output().is_empty() {
                    return Err(ClassifierError::ArtifactError(
                        "Capability output name cannot be empty".into(),
                    ));
                }
            }
            Backend::Keywords(spec) => {
                if spec.keywords.iter().all(|k| k.trim().is_empty()) {
                    return Err(ClassifierError::ArtifactError(
                        "Keyword artifact must list at least one keyword".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Files referenced by the manifest, relative to its directory
    pub fn referenced_files(&self) -> Vec<(&str, Option<&str>)> {
        match &self.backend {
            Backend::Onnx(spec) => vec![
                (spec.model_file.as_str(), spec.model_sha256.as_deref()),
                (spec.tokenizer_file.as_str(), spec.tokenizer_sha256.as_deref()),
            ],
            Backend::Keywords(_) => Vec::new(),
        }
    }
}

/// Resolves a manifest-relative file name
pub(crate) fn resolve(base_dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
