use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info};
use ort::session::Session;
use tokenizers::Tokenizer;

use super::classifier::Classifier;
use super::encoding::configure_truncation;
use super::error::ClassifierError;
use super::keywords::KeywordClassifier;
use super::model::OnnxModel;
use crate::artifact::{self, ArtifactManifest, Backend, Capability, OnnxSpec};
use crate::model_store::sha256_file;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// A builder that loads a [`Classifier`] from a model artifact.
///
/// The capability variant is decided here, once, from the manifest.
#[derive(Default, Debug)]
pub struct ClassifierBuilder {
    manifest: Option<ArtifactManifest>,
    base_dir: Option<PathBuf>,
    runtime_config: RuntimeConfig,
}

impl ClassifierBuilder {
    /// Creates a new empty ClassifierBuilder instance with default configuration
    pub fn new() -> Self {
        Self {
            manifest: None,
            base_dir: None,
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Sets the runtime configuration for ONNX model execution
    ///
    /// # Example
    /// ```
    /// use spamsift::{ClassifierBuilder, RuntimeConfig};
    ///
    /// let builder = ClassifierBuilder::new()
    ///     .with_runtime_config(RuntimeConfig::default());
    /// ```
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Reads the artifact manifest at `path`. Files it references are resolved
    /// against the manifest's directory.
    ///
    /// # Returns
    /// * `Result<Self, ClassifierError>` - The builder instance if successful, or an error if:
    ///   - A manifest is already set
    ///   - The file does not exist or cannot be read
    ///   - The manifest is not valid JSON or fails validation
    pub fn with_artifact<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ClassifierError> {
        if self.manifest.is_some() {
            return Err(ClassifierError::ArtifactError("Model artifact already set".to_string()));
        }
        let path = path.as_ref();
        info!("Reading model artifact from {:?}", path);
        let manifest = ArtifactManifest::from_file(path)?;
        let base_dir = path.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        self.manifest = Some(manifest);
        self.base_dir = Some(base_dir);
        Ok(self)
    }

    /// Uses an in-memory manifest; relative file names resolve against `base_dir`
    pub fn with_manifest(mut self, manifest: ArtifactManifest, base_dir: impl Into<PathBuf>) -> Result<Self, ClassifierError> {
        if self.manifest.is_some() {
            return Err(ClassifierError::ArtifactError("Model artifact already set".to_string()));
        }
        self.manifest = Some(manifest);
        self.base_dir = Some(base_dir.into());
        Ok(self)
    }

    /// Builds the classifier described by the manifest
    ///
    /// # Returns
    /// * `Result<Classifier, ClassifierError>` - The loaded classifier, or an error if:
    ///   - No artifact has been set
    ///   - A referenced file is missing or fails its SHA-256 check
    ///   - The tokenizer or ONNX model fails to load
    ///   - The model lacks `input_ids` or the declared outputs
    pub fn build(self) -> Result<Classifier, ClassifierError> {
        let manifest = self.manifest
            .ok_or_else(|| ClassifierError::ArtifactError("Model artifact must be set".to_string()))?;
        let base_dir = self.base_dir.unwrap_or_else(|| PathBuf::from("."));

        let classifier = match manifest.backend {
            Backend::Keywords(spec) => {
                let model = KeywordClassifier::new(manifest.name, spec.keywords)?;
                Classifier::LabelOnly(Arc::new(model))
            }
            Backend::Onnx(spec) => {
                let model = Self::load_onnx(manifest.name, &spec, &base_dir, &self.runtime_config)?;
                let model = Arc::new(model);
                match spec.capability {
                    Capability::Probabilities { .. } => Classifier::Probabilistic(model),
                    Capability::DecisionScores { .. } => Classifier::MarginScoring(model),
                    Capability::Labels { .. } => Classifier::LabelOnly(model),
                }
            }
        };
        info!("Loaded {} classifier '{}'", classifier.capability(), classifier.name());
        Ok(classifier)
    }

    fn load_onnx(
        name: String,
        spec: &OnnxSpec,
        base_dir: &Path,
        runtime_config: &RuntimeConfig,
    ) -> Result<OnnxModel, ClassifierError> {
        let model_path = artifact::resolve(base_dir, &spec.model_file);
        let tokenizer_path = artifact::resolve(base_dir, &spec.tokenizer_file);

        Self::check_file(&model_path, spec.model_sha256.as_deref())?;
        Self::check_file(&tokenizer_path, spec.tokenizer_sha256.as_deref())?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| {
                error!("Failed to load tokenizer: {}", e);
                ClassifierError::TokenizerError(format!("Failed to load tokenizer: {}", e))
            })?;
        configure_truncation(&mut tokenizer, spec.max_sequence_length)?;
        info!("Tokenizer loaded successfully");

        let session = create_session_builder(runtime_config)?
            .commit_from_file(&model_path)?;

        Self::validate_model(&session, spec)?;
        info!("Model structure validated successfully");

        let has_input = |wanted: &str| session.inputs.iter().any(|input| input.name == wanted);
        let feeds_attention_mask = has_input("attention_mask");
        let feeds_token_type_ids = has_input("token_type_ids");

        Ok(OnnxModel {
            name,
            model_path: model_path.to_string_lossy().to_string(),
            tokenizer: Arc::new(tokenizer),
            session: Arc::new(session),
            max_sequence_length: spec.max_sequence_length,
            capability: spec.capability.clone(),
            label_output: spec.label_output.clone(),
            feeds_attention_mask,
            feeds_token_type_ids,
        })
    }

    fn check_file(path: &Path, expected_sha256: Option<&str>) -> Result<(), ClassifierError> {
        if !path.exists() {
            return Err(ClassifierError::ArtifactError(format!("File not found: {}", path.display())));
        }
        if let Some(expected) = expected_sha256 {
            let actual = sha256_file(path)?;
            if !actual.eq_ignore_ascii_case(expected) {
                error!("Hash mismatch for {:?}: expected {}, got {}", path, expected, actual);
                return Err(ClassifierError::ArtifactError(format!(
                    "Hash mismatch for {}: expected {}, got {}",
                    path.display(), expected, actual
                )));
            }
        }
        Ok(())
    }

    /// Validates that the model has the expected input/output structure
    fn validate_model(session: &Session, spec: &OnnxSpec) -> Result<(), ClassifierError> {
        let inputs: Vec<&str> = session.inputs.iter().map(|i| i.name.as_str()).collect();
        let outputs: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
        Self::check_signature(&inputs, &outputs, spec)
    }

    /// # Returns
    /// * `Result<(), ClassifierError>` - Ok if validation passes, or an error if:
    ///   - The model doesn't have an `input_ids` input
    ///   - The capability output or the label output is missing
    fn check_signature(inputs: &[&str], outputs: &[&str], spec: &OnnxSpec) -> Result<(), ClassifierError> {
        if !inputs.contains(&"input_ids") {
            return Err(ClassifierError::ModelError(
                format!("Model must have an 'input_ids' input, found {:?}", inputs)
            ));
        }

        let required = std::iter::once(spec.capability.output())
            .chain(spec.label_output.as_deref());
        for output in required {
            if !outputs.contains(&output) {
                return Err(ClassifierError::ModelError(
                    format!("Model has no output named '{}'", output)
                ));
            }
        }

        Ok(())
    }
}
