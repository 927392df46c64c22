use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use crate::classifier::{Classifier, ClassifierError, KeywordClassifier, Label};
use crate::confidence::{Confidence, ConfidenceNormalizer, ConfidencePolicy, ConfidenceSource};
use crate::config::DetectorConfig;

/// Canonical spam sample offered by the "load example" shortcut
pub const EXAMPLE_SPAM: &str = "Congratulations! You have WON $5000! Claim now: http://bit.ly/claim-fast";

/// Canonical ham sample offered by the "load example" shortcut
pub const EXAMPLE_HAM: &str = "Hi David, reminder for our meeting tomorrow at 10 AM. Let me know if timing works.";

/// Returns the built-in example text for a label
pub fn example_text(label: Label) -> &'static str {
    match label {
        Label::Spam => EXAMPLE_SPAM,
        Label::Ham => EXAMPLE_HAM,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("Please enter some email content")]
    EmptyInput,
    #[error("Label prediction failed: {0}")]
    Prediction(#[source] ClassifierError),
}

/// Outcome of checking one email
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Analysis {
    pub label: Label,
    pub confidence: Confidence,
    pub source: ConfidenceSource,
    /// True when no model artifact was loaded
    pub degraded: bool,
}

impl Analysis {
    pub fn spam_percent(&self) -> f64 {
        self.confidence.spam * 100.0
    }

    pub fn ham_percent(&self) -> f64 {
        self.confidence.ham * 100.0
    }
}

/// Owns the loaded classifier for the lifetime of the application.
///
/// Construction never fails: when the artifact cannot be loaded the detector runs in
/// degraded mode and every confidence comes from the absent-model policy (or from the
/// keyword classifier when that fallback is enabled).
#[derive(Debug)]
pub struct SpamDetector {
    classifier: Option<Classifier>,
    normalizer: ConfidenceNormalizer,
    notice: Option<String>,
}

impl SpamDetector {
    /// Loads the artifact named by `config` once.
    pub fn load(config: &DetectorConfig) -> Self {
        let loaded = Classifier::builder()
            .with_runtime_config(config.runtime.clone())
            .with_artifact(&config.artifact_path)
            .and_then(|builder| builder.build());

        match loaded {
            Ok(classifier) => Self::new(Some(classifier), config.policy),
            Err(e) => {
                warn!("Running without a model: {}", e);
                let notice = format!(
                    "Model unavailable ({}). Results use the fallback policy.",
                    e
                );
                // The keyword fallback is label-only, so its confidences come from the
                // policy's label stand-ins like any other label-only classifier.
                let fallback = config.keyword_fallback.then(|| {
                    info!("Using keyword fallback classifier");
                    Classifier::LabelOnly(Arc::new(KeywordClassifier::default()))
                });
                Self {
                    classifier: fallback,
                    normalizer: ConfidenceNormalizer::new(config.policy),
                    notice: Some(notice),
                }
            }
        }
    }

    /// Wraps an already constructed classifier. `None` means degraded mode.
    pub fn new(classifier: Option<Classifier>, policy: ConfidencePolicy) -> Self {
        let notice = classifier
            .is_none()
            .then(|| "No model loaded. Results use the fallback policy.".to_string());
        Self {
            classifier,
            normalizer: ConfidenceNormalizer::new(policy),
            notice,
        }
    }

    pub fn classifier(&self) -> Option<&Classifier> {
        self.classifier.as_ref()
    }

    pub fn is_degraded(&self) -> bool {
        self.notice.is_some()
    }

    /// User-facing notice explaining degraded mode
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Classifies one email.
    ///
    /// Whitespace-only input is rejected before the classifier is touched. A failing
    /// label prediction is reported as [`DetectorError::Prediction`]; a failing confidence
    /// estimate only downgrades the confidence to neutral.
    ///
    /// ```rust
    /// use spamsift::{ConfidencePolicy, Label, SpamDetector, EXAMPLE_SPAM};
    ///
    /// let detector = SpamDetector::new(None, ConfidencePolicy::default());
    /// let analysis = detector.analyze(EXAMPLE_SPAM).unwrap();
    /// assert_eq!(analysis.label, Label::Spam);
    /// assert!(analysis.degraded);
    /// ```
    pub fn analyze(&self, text: &str) -> Result<Analysis, DetectorError> {
        let email = text.trim();
        if email.is_empty() {
            return Err(DetectorError::EmptyInput);
        }

        let estimate = self.normalizer.normalize(self.classifier(), email);
        let label = match self.classifier() {
            Some(classifier) => classifier.predict_one(email).map_err(DetectorError::Prediction)?,
            None => estimate.confidence.leaning(),
        };

        Ok(Analysis {
            label,
            confidence: estimate.confidence,
            source: estimate.source,
            degraded: self.is_degraded(),
        })
    }
}
