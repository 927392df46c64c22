//! A spam/ham email checker built around a pre-trained classifier artifact.
//!
//! The classifier can expose probabilities, decision margins or bare labels. Whatever it
//! exposes, callers get one `[ham, spam]` confidence pair back.
//!
//! # Basic Usage
//!
//! ```rust
//! use spamsift::{DetectorConfig, Label, SpamDetector, EXAMPLE_HAM};
//!
//! let config = DetectorConfig::new("/path/that/does/not/exist/manifest.json")
//!     .with_keyword_fallback(true);
//! let detector = SpamDetector::load(&config);
//! assert!(detector.is_degraded());
//!
//! let analysis = detector.analyze(EXAMPLE_HAM).unwrap();
//! assert_eq!(analysis.label, Label::Ham);
//! println!("spam {:.1}% / ham {:.1}%", analysis.spam_percent(), analysis.ham_percent());
//! ```
//!
//! # Custom classifiers
//!
//! Anything implementing [`LabelPredictor`] plus [`ProbabilityEstimator`] or
//! [`MarginScorer`] can be wrapped in a [`Classifier`]:
//!
//! ```rust
//! use std::sync::Arc;
//! use spamsift::{normalize_confidence, Classifier, ClassifierError, Label, LabelPredictor, MarginScorer};
//!
//! struct Linear;
//!
//! impl LabelPredictor for Linear {
//!     fn predict(&self, batch: &[&str]) -> Result<Vec<Label>, ClassifierError> {
//!         Ok(batch.iter().map(|_| Label::Ham).collect())
//!     }
//! }
//!
//! impl MarginScorer for Linear {
//!     fn decision_function(&self, batch: &[&str]) -> Result<Vec<f64>, ClassifierError> {
//!         Ok(batch.iter().map(|_| 0.0).collect())
//!     }
//! }
//!
//! let classifier = Classifier::MarginScoring(Arc::new(Linear));
//! assert_eq!(normalize_confidence(Some(&classifier), "hello").pair(), [0.5, 0.5]);
//! ```

pub mod artifact;
pub mod classifier;
pub mod confidence;
pub mod config;
pub mod detector;
pub mod model_store;
mod runtime;

pub use artifact::{ArtifactManifest, Backend, Capability, KeywordSpec, OnnxSpec};
pub use classifier::{
    Classifier, ClassifierBuilder, ClassifierError, KeywordClassifier, Label, LabelPredictor,
    MarginScorer, OnnxModel, ProbabilityEstimator,
};
pub use confidence::{
    normalize_confidence, Confidence, ConfidenceNormalizer, ConfidencePolicy, ConfidenceSource, Estimate,
};
pub use config::DetectorConfig;
pub use detector::{example_text, Analysis, DetectorError, SpamDetector, EXAMPLE_HAM, EXAMPLE_SPAM};
pub use model_store::{ModelStore, StoreError};
pub use runtime::{create_session_builder, RuntimeConfig};

pub fn init_logger() {
    env_logger::init();
}
