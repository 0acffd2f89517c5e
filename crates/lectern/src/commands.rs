use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

use crate::chat::ChatClient;
use crate::config::LecternConfig;
use crate::display;
use crate::embedding::{create_embedder, Embedder};
use crate::engine::Analyzer;
use crate::error::LecternError;
use crate::grading::{grade_choices, AnswerKey};
use crate::segment::segment;
use crate::submissions::{class_reports, load_submissions, question_report};

/// Read a whole text file, naming it in the error
pub fn read_text(path: &Path) -> Result<String> {
  fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Answers are one per non-empty line, or a JSON array of strings for `.json` files
pub fn read_answers(path: &Path) -> Result<Vec<String>> {
  let content = read_text(path)?;

  let answers: Vec<String> = if path.extension().and_then(|e| e.to_str()) == Some("json") {
    serde_json::from_str(&content)
      .with_context(|| format!("{} is not a JSON array of strings", path.display()))?
  } else {
    content.lines().map(str::trim).filter(|line| !line.is_empty()).map(String::from).collect()
  };

  if answers.is_empty() {
    return Err(LecternError::input(format!("no answers found in {}", path.display())).into());
  }

  Ok(answers)
}

fn analyzer(config: &LecternConfig) -> Result<Analyzer<Box<dyn Embedder>>> {
  let embedder = create_embedder(&config.embedder)?;
  Ok(Analyzer::new(embedder, config.engine.clone())?)
}

pub fn segment_file(path: &Path, sentences: usize) -> Result<()> {
  let text = read_text(path)?;
  display::display_segments(&segment(&text, sentences));
  Ok(())
}

pub fn analyze(
  config: &LecternConfig,
  lecture: &Path,
  textbook: &Path,
  question: &str,
  answers: &Path,
  json: bool,
) -> Result<()> {
  let analyzer = analyzer(config)?;
  let knowledge_base = analyzer.build_knowledge_base(&read_text(lecture)?, &read_text(textbook)?)?;
  let answers = read_answers(answers)?;

  let report = question_report(&analyzer, &knowledge_base, question, &answers)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    display::display_report(&report);
  }
  Ok(())
}

pub fn report(
  config: &LecternConfig,
  lecture: &Path,
  textbook: &Path,
  submissions: &Path,
  json: bool,
) -> Result<()> {
  let submissions = load_submissions(submissions)?;
  if submissions.is_empty() {
    println!("No submissions found");
    return Ok(());
  }

  let analyzer = analyzer(config)?;
  let knowledge_base = analyzer.build_knowledge_base(&read_text(lecture)?, &read_text(textbook)?)?;
  let reports = class_reports(&analyzer, &knowledge_base, &submissions)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&reports)?);
  } else {
    println!("{} {} submissions", "Total:".bold(), submissions.submissions.len());
    println!();
    for report in &reports {
      display::display_report(report);
    }
  }
  Ok(())
}

pub fn grade(key: &Path, submissions: &Path) -> Result<()> {
  let key = AnswerKey::load(key)?;
  let submissions = load_submissions(submissions)?;

  if submissions.is_empty() {
    println!("No submissions found");
    return Ok(());
  }

  for submission in &submissions.submissions {
    let answers: Vec<String> =
      submission.questions_and_answers.iter().map(|qa| qa.answer.clone()).collect();
    display::display_choice_score(&submission.student_name, &grade_choices(&key, &answers));
  }
  Ok(())
}

pub async fn draft_questions(
  config: &LecternConfig,
  lecture: &Path,
  textbook: &Path,
  count: Option<usize>,
) -> Result<()> {
  let client = ChatClient::new(config.llm.clone())?;
  let count = count.unwrap_or(config.llm.num_questions);

  let questions = client.draft_questions(&read_text(lecture)?, &read_text(textbook)?, count).await?;
  display::display_questions(&questions);
  Ok(())
}

pub async fn analyse_class(
  config: &LecternConfig,
  lecture: &Path,
  textbook: &Path,
  submissions: &Path,
) -> Result<()> {
  let submissions = load_submissions(submissions)?;
  if submissions.is_empty() {
    println!("No submissions found");
    return Ok(());
  }

  let client = ChatClient::new(config.llm.clone())?;
  let analysis =
    client.analyse_class(&read_text(lecture)?, &read_text(textbook)?, &submissions).await?;
  display::display_class_analysis(&analysis);
  Ok(())
}
