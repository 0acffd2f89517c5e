use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use lectern::commands;
use lectern::config::LecternConfig;
use lectern::segment::DEFAULT_SENTENCES_PER_SEGMENT;

#[derive(Parser)]
#[command(name = "lectern")]
#[command(about = "Lectern - Concept Coverage for Classrooms\n\
  Match questions and student answers against lecture and textbook knowledge")]
#[command(version)]
struct Cli {
  /// Configuration file (defaults to $LECTERN_CONFIG, lectern.yaml, config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Enable debug logging on stderr
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

/// Source material for the knowledge base
#[derive(Args)]
struct Sources {
  /// Lecture transcript text file
  #[arg(short, long)]
  lecture: PathBuf,
  /// Textbook content text file
  #[arg(short, long)]
  textbook: PathBuf,
}

#[derive(Subcommand)]
enum Command {
  /// Split a text file into knowledge segments
  Segment {
    /// Text file to segment
    file: PathBuf,
    /// Sentences per segment
    #[arg(short, long, default_value_t = DEFAULT_SENTENCES_PER_SEGMENT)]
    sentences: usize,
  },
  /// Evaluate answers to one question against the lecture and textbook
  Analyze {
    #[command(flatten)]
    sources: Sources,
    /// Question asked to the class
    #[arg(short, long)]
    question: String,
    /// Answers file, one answer per line or a JSON array
    #[arg(short, long)]
    answers: PathBuf,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
  },
  /// Build class reports for every question in a submissions file
  Report {
    #[command(flatten)]
    sources: Sources,
    /// Test submissions JSON file
    #[arg(short, long)]
    submissions: PathBuf,
    /// Print the reports as JSON
    #[arg(long)]
    json: bool,
  },
  /// Score multiple-choice submissions against an answer key
  Grade {
    /// Answer key JSON file
    #[arg(short, long)]
    key: PathBuf,
    /// Test submissions JSON file
    #[arg(short, long)]
    submissions: PathBuf,
  },
  /// Ask the chat endpoint for a written analysis of a class's submissions
  Analyse {
    #[command(flatten)]
    sources: Sources,
    /// Test submissions JSON file
    #[arg(short, long)]
    submissions: PathBuf,
  },
  /// Draft questions common to the lecture and textbook using the chat endpoint
  Questions {
    #[command(flatten)]
    sources: Sources,
    /// Number of questions to request
    #[arg(short = 'n', long)]
    count: Option<usize>,
  },
}

fn init_logging(verbose: bool) {
  let default_filter = if verbose { "lectern=debug" } else { "lectern=warn" };
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

  tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();
}

fn load_config(path: Option<&PathBuf>) -> Result<LecternConfig> {
  let config = match path {
    Some(path) => LecternConfig::load_from_file(path)?,
    None => LecternConfig::load()?,
  };
  Ok(config)
}

async fn handle(command: Command, config: LecternConfig) -> Result<()> {
  match command {
    Command::Segment { file, sentences } => commands::segment_file(&file, sentences),
    Command::Analyze { sources, question, answers, json } => {
      commands::analyze(&config, &sources.lecture, &sources.textbook, &question, &answers, json)
    }
    Command::Report { sources, submissions, json } => {
      commands::report(&config, &sources.lecture, &sources.textbook, &submissions, json)
    }
    Command::Grade { key, submissions } => commands::grade(&key, &submissions),
    Command::Analyse { sources, submissions } => {
      commands::analyse_class(&config, &sources.lecture, &sources.textbook, &submissions).await
    }
    Command::Questions { sources, count } => {
      commands::draft_questions(&config, &sources.lecture, &sources.textbook, count).await
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let config = load_config(cli.config.as_ref())?;
  handle(cli.command, config).await
}
