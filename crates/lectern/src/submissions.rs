//! Student test submissions and the per-question class reports built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::embedding::Embedder;
use crate::engine::Analyzer;
use crate::error::Result;
use crate::evaluate::AnswerEvaluation;
use crate::insights::ClassInsights;
use crate::knowledge::KnowledgeBase;
use crate::matcher::QuestionAnalysis;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnswer {
  pub question: String,
  pub answer: String,
}

/// One student's completed test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
  pub student_name: String,
  pub questions_and_answers: Vec<QuestionAnswer>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionSet {
  pub submissions: Vec<Submission>,
}

impl SubmissionSet {
  pub fn new(submissions: Vec<Submission>) -> Self {
    Self { submissions }
  }

  /// Questions as asked in the first submission
  pub fn questions(&self) -> Vec<String> {
    self
      .submissions
      .first()
      .map(|s| s.questions_and_answers.iter().map(|qa| qa.question.clone()).collect())
      .unwrap_or_default()
  }

  /// Every student's answer to `question`, in submission order
  pub fn answers_for(&self, question: &str) -> Vec<String> {
    self
      .submissions
      .iter()
      .filter_map(|submission| {
        submission
          .questions_and_answers
          .iter()
          .find(|qa| qa.question == question)
          .map(|qa| qa.answer.clone())
      })
      .collect()
  }

  pub fn answers_by_student(&self) -> BTreeMap<String, Vec<String>> {
    self
      .submissions
      .iter()
      .map(|submission| {
        let answers = submission.questions_and_answers.iter().map(|qa| qa.answer.clone()).collect();
        (submission.student_name.clone(), answers)
      })
      .collect()
  }

  pub fn is_empty(&self) -> bool {
    self.submissions.is_empty()
  }
}

/// Read a JSON array of submissions. A missing file is an empty set.
pub fn load_submissions<P: AsRef<Path>>(path: P) -> Result<SubmissionSet> {
  let path = path.as_ref();
  if !path.exists() {
    debug!(path = %path.display(), "no submissions file");
    return Ok(SubmissionSet::default());
  }

  let content = fs::read_to_string(path)?;
  let submissions: Vec<Submission> = serde_json::from_str(&content)?;
  Ok(SubmissionSet::new(submissions))
}

/// Everything an instructor sees for one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionReport {
  pub analysis: QuestionAnalysis,
  pub evaluations: Vec<AnswerEvaluation>,
  pub insights: ClassInsights,
  pub generated_at: DateTime<Utc>,
}

/// Run analysis, evaluation and aggregation for one question
pub fn question_report<E: Embedder>(
  analyzer: &Analyzer<E>,
  knowledge_base: &KnowledgeBase,
  question: &str,
  answers: &[String],
) -> Result<QuestionReport> {
  let analysis = analyzer.analyze_question(question, knowledge_base)?;
  let evaluations = analyzer.evaluate_answers(&analysis, knowledge_base, answers)?;
  let insights = analyzer.generate_insights(&analysis, &evaluations);

  Ok(QuestionReport { analysis, evaluations, insights, generated_at: Utc::now() })
}

/// One report per question of the submission set, in question order
pub fn class_reports<E: Embedder>(
  analyzer: &Analyzer<E>,
  knowledge_base: &KnowledgeBase,
  submissions: &SubmissionSet,
) -> Result<Vec<QuestionReport>> {
  submissions
    .questions()
    .iter()
    .map(|question| {
      let answers = submissions.answers_for(question);
      question_report(analyzer, knowledge_base, question, &answers)
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn submission(name: &str, pairs: &[(&str, &str)]) -> Submission {
    Submission {
      student_name: name.to_string(),
      questions_and_answers: pairs
        .iter()
        .map(|(q, a)| QuestionAnswer { question: q.to_string(), answer: a.to_string() })
        .collect(),
    }
  }

  #[test]
  fn test_questions_from_first_submission() {
    let set = SubmissionSet::new(vec![
      submission("ada", &[("Q1", "a1"), ("Q2", "a2")]),
      submission("bo", &[("Q2", "b2")]),
    ]);
    assert_eq!(set.questions(), vec!["Q1".to_string(), "Q2".to_string()]);
  }

  #[test]
  fn test_answers_for_skips_missing() {
    let set = SubmissionSet::new(vec![
      submission("ada", &[("Q1", "a1"), ("Q2", "a2")]),
      submission("bo", &[("Q2", "b2")]),
    ]);
    assert_eq!(set.answers_for("Q1"), vec!["a1".to_string()]);
    assert_eq!(set.answers_for("Q2"), vec!["a2".to_string(), "b2".to_string()]);
    assert!(set.answers_for("Q3").is_empty());
  }

  #[test]
  fn test_answers_by_student() {
    let set = SubmissionSet::new(vec![
      submission("zoe", &[("Q1", "z1")]),
      submission("ada", &[("Q1", "a1")]),
    ]);
    let by_student = set.answers_by_student();
    assert_eq!(by_student.keys().collect::<Vec<_>>(), vec!["ada", "zoe"]);
    assert_eq!(by_student["zoe"], vec!["z1".to_string()]);
  }

  #[test]
  fn test_empty_set() {
    let set = SubmissionSet::default();
    assert!(set.is_empty());
    assert!(set.questions().is_empty());
  }
}
