//! Command line interface of the `fake-news` binary.

use std::{
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use fake_news_preprocessing::pre_processor::Tokenizer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config::Settings,
    dataset,
    service::{BatchItem, PredictResponse, PredictionResult, Predictor},
    train::{Trainer, TrainingReport},
};

#[derive(Parser)]
#[command(name = "fake-news")]
#[command(about = "Classify news articles as fake or real", version, long_about = None)]
pub struct Cli {
    /// Settings file (defaults to ./fake-news.toml when present)
    #[arg(short, long, global = true, value_name = "PATH", env = "FAKE_NEWS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the model artifacts
    #[arg(short, long, global = true, value_name = "DIR")]
    model_dir: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify one or more texts
    Predict(PredictArgs),
    /// Train a model from labeled CSV data
    Train(TrainArgs),
    /// Describe the model in the model directory
    Info,
    /// Check that a model can be loaded
    Health,
}

#[derive(Args)]
struct PredictArgs {
    /// Text to analyze (if not provided, reads from stdin)
    #[arg(value_name = "TEXT")]
    text: Option<String>,

    /// Read text from file
    #[arg(short, long, value_name = "PATH", conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Batch process texts (one per line)
    #[arg(short, long, value_name = "PATH", conflicts_with_all = ["text", "file"])]
    batch: Option<PathBuf>,

    /// Batch process from JSON array
    #[arg(long, value_name = "PATH", conflicts_with_all = ["text", "file", "batch"])]
    batch_json: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "human")]
    format: OutputFormat,
}

#[derive(Args)]
struct TrainArgs {
    /// CSV with a `label` column and `title`/`text` columns
    #[arg(short, long, value_name = "PATH", required_unless_present_all = ["fake", "real"])]
    data: Option<PathBuf>,

    /// CSV of fake articles
    #[arg(long, value_name = "PATH", conflicts_with = "data", requires = "real")]
    fake: Option<PathBuf>,

    /// CSV of real articles
    #[arg(long, value_name = "PATH", conflicts_with = "data", requires = "fake")]
    real: Option<PathBuf>,

    /// Where to write the artifacts (defaults to the model directory)
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Vocabulary size limit
    #[arg(long)]
    max_features: Option<usize>,

    /// Inverse regularization strength
    #[arg(short = 'C', long = "c")]
    regularization: Option<f64>,

    /// Share of each class held out for evaluation
    #[arg(long)]
    test_size: Option<f64>,

    /// Seed of the train/validation split
    #[arg(long)]
    seed: Option<u64>,

    /// Optimizer iteration limit
    #[arg(long)]
    max_iter: Option<usize>,
}

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    /// Output just the label (fake or real)
    Label,
    /// Output the fake probability as a float 0-1
    Probability,
    /// Output the full result as JSON
    Json,
    /// Human-readable output with confidence (default)
    Human,
}

enum InputSource {
    Single(String),
    Batch(Vec<String>),
}

pub fn run(cli: &Cli) -> Result<()> {
    init_logging(cli);

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(model_dir) = &cli.model_dir {
        settings.model_dir.clone_from(model_dir);
    }

    match &cli.command {
        Command::Predict(args) => predict(args, &settings),
        Command::Train(args) => train(args, settings),
        Command::Info => {
            let info = Predictor::from_settings(&settings).info()?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
        Command::Health => {
            let health = Predictor::from_settings(&settings).health();
            println!("{}", serde_json::to_string(&health)?);
            if health.model_loaded {
                Ok(())
            } else {
                anyhow::bail!("no usable model in {}", settings.model_dir.display())
            }
        }
    }
}

fn init_logging(cli: &Cli) {
    let default_level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (_, true) => "debug",
        _ => "info",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A second initialisation (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn predict(args: &PredictArgs, settings: &Settings) -> Result<()> {
    let input = determine_input_source(args)?;
    let predictor = Predictor::from_settings(settings);
    let start = Instant::now();

    match input {
        InputSource::Single(text) => {
            let result = predictor.predict(&text)?;
            info!(elapsed = ?start.elapsed(), "Inference finished");
            output_result(&result, args.format)?;
        }
        InputSource::Batch(texts) => {
            let items = predictor.predict_batch(&texts)?;
            let failed = items.iter().filter(|item| item.response.is_error()).count();
            info!(texts = texts.len(), elapsed = ?start.elapsed(), "Batch inference finished");
            if failed > 0 {
                warn!(failed, "Some texts could not be classified");
            }
            write_batch_results(&mut std::io::stdout().lock(), &items, args.format)?;
        }
    }
    Ok(())
}

/// Priority: text arg > file > batch > batch_json > stdin
fn determine_input_source(args: &PredictArgs) -> Result<InputSource> {
    if let Some(text) = &args.text {
        return Ok(InputSource::Single(text.clone()));
    }

    if let Some(path) = &args.file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        return Ok(InputSource::Single(text));
    }

    if let Some(path) = &args.batch {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read batch file: {}", path.display()))?;
        let texts = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(String::from)
            .collect();
        return Ok(InputSource::Batch(texts));
    }

    if let Some(path) = &args.batch_json {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read JSON batch file: {}", path.display()))?;
        let texts: Vec<String> =
            serde_json::from_str(&contents).context("Failed to parse JSON array")?;
        return Ok(InputSource::Batch(texts));
    }

    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read from stdin")?;
    Ok(InputSource::Single(buffer))
}

fn output_result(result: &PredictionResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Label => println!("{}", result.prediction),
        OutputFormat::Probability => println!("{:.4}", result.fake_probability),
        OutputFormat::Json => println!("{}", serde_json::to_string(result)?),
        OutputFormat::Human => {
            println!("Result: {}", result.prediction.to_string().to_uppercase());
            println!(
                "Confidence: {:.2}% ({})",
                result.confidence_percentage, result.confidence_level
            );
            println!(
                "P(fake): {:.4}  P(real): {:.4}",
                result.fake_probability, result.real_probability
            );
        }
    }
    Ok(())
}

/// One line per input text; failed texts get an error line in their slot.
fn write_batch_results(
    out: &mut impl Write,
    items: &[BatchItem],
    format: OutputFormat,
) -> Result<()> {
    if matches!(format, OutputFormat::Json) {
        writeln!(out, "{}", serde_json::to_string(items)?)?;
        return Ok(());
    }
    for item in items {
        match (&item.response, format) {
            (PredictResponse::Prediction(result), OutputFormat::Human) => writeln!(
                out,
                "{:>5}  {:<4}  {:>6.2}%  {}",
                item.index + 1,
                result.prediction,
                result.confidence_percentage,
                result.confidence_level
            )?,
            (PredictResponse::Prediction(result), OutputFormat::Probability) => {
                writeln!(out, "{:.4}", result.fake_probability)?;
            }
            (PredictResponse::Prediction(result), _) => writeln!(out, "{}", result.prediction)?,
            (PredictResponse::Error(error), OutputFormat::Human) => {
                writeln!(out, "{:>5}  error: {}", item.index + 1, error.error)?;
            }
            (PredictResponse::Error(error), _) => writeln!(out, "error: {}", error.error)?,
        }
    }
    Ok(())
}

fn train(args: &TrainArgs, settings: Settings) -> Result<()> {
    let documents = match (&args.data, &args.fake, &args.real) {
        (Some(data), _, _) => dataset::load_labeled_csv(data)?,
        (None, Some(fake), Some(real)) => dataset::load_split_csv(fake, real)?,
        _ => anyhow::bail!("either --data or both --fake and --real are required"),
    };

    let mut vectorizer = settings.vectorizer;
    if args.max_features.is_some() {
        vectorizer = vectorizer.with_max_features(args.max_features);
    }
    let mut params = settings.training;
    if let Some(c) = args.regularization {
        params.regularization = c;
    }
    if let Some(test_size) = args.test_size {
        params.test_size = test_size;
    }
    if let Some(seed) = args.seed {
        params.random_state = seed;
    }
    if let Some(max_iter) = args.max_iter {
        params.max_iter = max_iter;
    }

    let outcome = Trainer::new()
        .with_tokenizer(Tokenizer::new(settings.normalizer, settings.tokenizer))
        .with_vectorizer_params(vectorizer)
        .with_params(params)
        .train(&documents)?;

    let output = args.output.as_deref().unwrap_or(&settings.model_dir);
    outcome
        .save(output)
        .with_context(|| format!("Failed to save model to {}", output.display()))?;
    print_report(&outcome.report, output);
    Ok(())
}

fn print_report(report: &TrainingReport, output: &Path) {
    println!(
        "Trained on {} documents ({} fake, {} real, {} dropped)",
        report.num_train,
        report.class_counts.fake,
        report.class_counts.real,
        report.dropped_documents
    );
    println!("Vocabulary size: {}", report.vocabulary_size);
    println!(
        "Optimizer: {} iterations, converged: {}",
        report.optimizer.iterations, report.optimizer.converged
    );
    println!("Training accuracy: {:.4}", report.train_accuracy);
    match &report.validation {
        Some(validation) => println!("\nValidation ({} documents)\n{validation}", report.num_validation),
        None => println!("No validation split"),
    }
    println!("\nArtifacts written to {}", output.display());
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_train_with_split_files() {
        let cli = Cli::try_parse_from([
            "fake-news", "train", "--fake", "Fake.csv", "--real", "True.csv", "-C", "10",
        ])
        .unwrap();
        match cli.command {
            Command::Train(args) => {
                assert_eq!(args.fake, Some(PathBuf::from("Fake.csv")));
                assert_eq!(args.regularization, Some(10.0));
            }
            _ => panic!("expected the train command"),
        }
    }

    #[test]
    fn test_train_needs_a_dataset() {
        assert!(Cli::try_parse_from(["fake-news", "train"]).is_err());
        assert!(Cli::try_parse_from(["fake-news", "train", "--fake", "Fake.csv"]).is_err());
    }

    #[test]
    fn test_text_argument_wins() {
        let cli = Cli::try_parse_from(["fake-news", "predict", "some article text"]).unwrap();
        let Command::Predict(args) = cli.command else {
            panic!("expected the predict command");
        };
        match determine_input_source(&args).unwrap() {
            InputSource::Single(text) => assert_eq!(text, "some article text"),
            InputSource::Batch(_) => panic!("expected a single text"),
        }
    }

    #[test]
    fn test_batch_file_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.txt");
        std::fs::write(&path, "first article\n\nsecond article\n").unwrap();
        let cli = Cli::try_parse_from([
            "fake-news",
            "predict",
            "--batch",
            path.to_str().unwrap(),
        ])
        .unwrap();
        let Command::Predict(args) = cli.command else {
            panic!("expected the predict command");
        };
        match determine_input_source(&args).unwrap() {
            InputSource::Batch(texts) => assert_eq!(texts, ["first article", "second article"]),
            InputSource::Single(_) => panic!("expected a batch"),
        }
    }

    #[test]
    fn test_batch_output_keeps_failed_texts_in_place() {
        let predictor = Predictor::from_model(crate::model::tests::tiny_model());
        let texts = [
            "A perfectly valid long article text",
            "tiny",
            "Another valid article text",
        ];
        let items = predictor.predict_batch(&texts).unwrap();

        let mut out = Vec::new();
        write_batch_results(&mut out, &items, OutputFormat::Human).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("    1  "));
        assert!(!lines[0].contains("error"));
        assert_eq!(
            lines[1],
            "    2  error: invalid input: text must be at least 10 characters long"
        );
        assert!(lines[2].starts_with("    3  "));

        let mut out = Vec::new();
        write_batch_results(&mut out, &items, OutputFormat::Label).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("error: "));

        let mut out = Vec::new();
        write_batch_results(&mut out, &items, OutputFormat::Json).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 3);
        assert_eq!(json[1]["index"], 1);
        assert_eq!(json[1]["kind"], "invalid_input");
    }
}
