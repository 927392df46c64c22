use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use spamsift::{
    example_text, Analysis, ConfidencePolicy, DetectorConfig, DetectorError, Label, ModelStore, SpamDetector,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Example {
    Spam,
    Ham,
}

impl From<Example> for Label {
    fn from(example: Example) -> Self {
        match example {
            Example::Spam => Label::Spam,
            Example::Ham => Label::Ham,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about = "Check whether an email is spam", long_about = None)]
struct Args {
    /// Path to the model artifact manifest
    #[arg(short, long, env = "SPAMSIFT_MODEL")]
    model: Option<PathBuf>,

    /// Email text to analyze (read from stdin when omitted)
    #[arg(short, long, conflicts_with = "example")]
    text: Option<String>,

    /// Analyze a built-in example email
    #[arg(short, long, value_enum)]
    example: Option<Example>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Confidence reported when only a label (or no model) is available
    #[arg(long, value_name = "P")]
    stand_in_confidence: Option<f64>,

    /// Fall back to keyword matching when the model cannot be loaded
    #[arg(long)]
    keyword_fallback: bool,

    /// Download the model artifact from this base URL into the model store and use it
    /// (takes precedence over --model)
    #[arg(long, value_name = "BASE_URL")]
    fetch: Option<String>,

    /// Remove any stored artifact before fetching
    #[arg(short, long, requires = "fetch")]
    fresh: bool,
}

/// Where the model artifact comes from
#[derive(Debug, PartialEq)]
enum ArtifactSource<'a> {
    Fetch(&'a str),
    Path(PathBuf),
}

fn artifact_source(args: &Args) -> ArtifactSource<'_> {
    match (&args.fetch, &args.model) {
        (Some(base_url), model) => {
            if let Some(path) = model {
                warn!("--fetch takes precedence, ignoring model path {:?}", path);
                eprintln!("Notice: ignoring model path {} in favour of --fetch", path.display());
            }
            ArtifactSource::Fetch(base_url)
        }
        (None, Some(path)) => ArtifactSource::Path(path.clone()),
        (None, None) => ArtifactSource::Path(DetectorConfig::default_artifact_path()),
    }
}

async fn fetch_artifact(store: &ModelStore, base_url: &str, fresh: bool) -> Result<()> {
    if fresh {
        info!("Fresh download requested - removing any existing artifact...");
        store.remove_artifact()?;
    }

    if !store.verify_artifact()? {
        info!("Downloading model artifact...");
        store.download_artifact(base_url).await
            .with_context(|| format!("failed to download model artifact from {}", base_url))?;
    }

    Ok(())
}

fn read_input(args: &Args) -> Result<String> {
    if let Some(example) = args.example {
        return Ok(example_text(example.into()).to_string());
    }
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        eprintln!("Paste the email content, then press Ctrl-D:");
    }
    let mut buffer = String::new();
    stdin.read_to_string(&mut buffer).context("failed to read email from stdin")?;
    Ok(buffer)
}

fn bar(fraction: f64) -> String {
    const WIDTH: usize = 30;
    let filled = (fraction.clamp(0.0, 1.0) * WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(WIDTH - filled))
}

fn render(analysis: &Analysis) {
    match analysis.label {
        Label::Spam => println!("SPAM DETECTED"),
        Label::Ham => println!("HAM - SAFE EMAIL"),
    }
    println!();
    println!("Confidence Levels");
    println!("  Spam Probability: {:>5.1}% {}", analysis.spam_percent(), bar(analysis.confidence.spam));
    println!("  Ham Probability:  {:>5.1}% {}", analysis.ham_percent(), bar(analysis.confidence.ham));
}

#[tokio::main]
async fn main() -> Result<()> {
    spamsift::init_logger();
    let args = Args::parse();

    let artifact_path = match artifact_source(&args) {
        ArtifactSource::Fetch(base_url) => {
            let store = ModelStore::new_default().context("failed to open model store")?;
            fetch_artifact(&store, base_url, args.fresh).await?;
            store.manifest_path()
        }
        ArtifactSource::Path(path) => path,
    };

    let mut config = DetectorConfig::new(artifact_path).with_keyword_fallback(args.keyword_fallback);
    if let Some(p) = args.stand_in_confidence {
        config = config.with_policy(ConfidencePolicy::with_stand_in(p)?);
    }

    let detector = SpamDetector::load(&config);
    if let Some(notice) = detector.notice() {
        eprintln!("Notice: {}", notice);
    }

    let email = read_input(&args)?;
    let analysis = match detector.analyze(&email) {
        Ok(analysis) => analysis,
        Err(DetectorError::EmptyInput) => {
            eprintln!("Warning: please enter some email content.");
            std::process::exit(2);
        }
        Err(e) => return Err(e).context("classification failed"),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        render(&analysis);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_path_used_without_fetch() {
        let args = Args::try_parse_from(["spamsift", "--model", "/models/spam/manifest.json"]).unwrap();
        assert_eq!(
            artifact_source(&args),
            ArtifactSource::Path(PathBuf::from("/models/spam/manifest.json"))
        );
    }

    #[test]
    fn test_fetch_overrides_model_path() {
        let args = Args::try_parse_from([
            "spamsift",
            "--model",
            "/models/spam/manifest.json",
            "--fetch",
            "https://models.example.com/spam",
        ])
        .unwrap();
        assert_eq!(artifact_source(&args), ArtifactSource::Fetch("https://models.example.com/spam"));
    }

    #[test]
    fn test_fresh_requires_fetch() {
        assert!(Args::try_parse_from(["spamsift", "--fresh"]).is_err());
        assert!(Args::try_parse_from(["spamsift", "--fresh", "--fetch", "https://models.example.com"]).is_ok());
    }

    #[test]
    fn test_text_conflicts_with_example() {
        assert!(Args::try_parse_from(["spamsift", "--text", "hi", "--example", "spam"]).is_err());
    }
}
