use criterion::{black_box, criterion_group, criterion_main, Criterion};
use spamsift::{
    normalize_confidence, Classifier, ClassifierError, KeywordClassifier, Label, LabelPredictor, MarginScorer,
    ProbabilityEstimator, SpamDetector, ConfidencePolicy, EXAMPLE_SPAM,
};
use std::sync::Arc;

struct Constant;

impl LabelPredictor for Constant {
    fn predict(&self, batch: &[&str]) -> Result<Vec<Label>, ClassifierError> {
        Ok(vec![Label::Spam; batch.len()])
    }
}

impl ProbabilityEstimator for Constant {
    fn predict_proba(&self, batch: &[&str]) -> Result<Vec<[f64; 2]>, ClassifierError> {
        Ok(vec![[0.2, 0.8]; batch.len()])
    }
}

impl MarginScorer for Constant {
    fn decision_function(&self, batch: &[&str]) -> Result<Vec<f64>, ClassifierError> {
        Ok(vec![1.25; batch.len()])
    }
}

fn bench_normalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("Normalization");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    let probabilistic = Classifier::Probabilistic(Arc::new(Constant));
    let margin = Classifier::MarginScoring(Arc::new(Constant));
    let label_only = Classifier::LabelOnly(Arc::new(Constant));

    group.bench_function("absent", |b| b.iter(|| {
        normalize_confidence(black_box(None), black_box(EXAMPLE_SPAM))
    }));
    group.bench_function("probabilistic", |b| b.iter(|| {
        normalize_confidence(black_box(Some(&probabilistic)), black_box(EXAMPLE_SPAM))
    }));
    group.bench_function("margin", |b| b.iter(|| {
        normalize_confidence(black_box(Some(&margin)), black_box(EXAMPLE_SPAM))
    }));
    group.bench_function("label_only", |b| b.iter(|| {
        normalize_confidence(black_box(Some(&label_only)), black_box(EXAMPLE_SPAM))
    }));

    group.finish();
}

fn bench_keyword_detector(c: &mut Criterion) {
    let detector = SpamDetector::new(
        Some(Classifier::LabelOnly(Arc::new(KeywordClassifier::default()))),
        ConfidencePolicy::default(),
    );
    let long_email = EXAMPLE_SPAM.repeat(200);

    let mut group = c.benchmark_group("Detector");
    group.bench_function("short_email", |b| b.iter(|| {
        detector.analyze(black_box(EXAMPLE_SPAM)).unwrap()
    }));
    group.bench_function("long_email", |b| b.iter(|| {
        detector.analyze(black_box(&long_email)).unwrap()
    }));
    group.finish();
}

criterion_group!(benches, bench_normalization, bench_keyword_detector);
criterion_main!(benches);
