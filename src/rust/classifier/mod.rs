mod error;
mod encoding;
mod model;
mod keywords;
mod classifier;
pub mod builder;
pub(crate) mod utils;

pub use error::ClassifierError;
pub use model::OnnxModel;
pub use keywords::{KeywordClassifier, DEFAULT_SPAM_KEYWORDS};
pub use classifier::{Classifier, Label, LabelPredictor, MarginScorer, ProbabilityEstimator};
pub use builder::ClassifierBuilder;
