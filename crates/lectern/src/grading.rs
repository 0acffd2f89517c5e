//! Exact-match scoring for multiple-choice tests.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{LecternError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedQuestion {
  pub question: String,
  #[serde(default)]
  pub options: Vec<String>,
  pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerKey {
  pub questions: Vec<KeyedQuestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceScore {
  pub score: usize,
  pub total: usize,
}

impl AnswerKey {
  pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    if !path.exists() {
      return Err(LecternError::input(format!("answer key {} not found", path.display())));
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
  }

  pub fn len(&self) -> usize {
    self.questions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.questions.is_empty()
  }
}

/// Count submitted answers that match the key at the same position.
///
/// `total` is the number of submitted answers; answers beyond the end of the
/// key never score.
pub fn grade_choices(key: &AnswerKey, submitted: &[String]) -> ChoiceScore {
  let score = submitted
    .iter()
    .zip(key.questions.iter())
    .filter(|(answer, keyed)| **answer == keyed.answer)
    .count();

  ChoiceScore { score, total: submitted.len() }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(answers: &[&str]) -> AnswerKey {
    AnswerKey {
      questions: answers
        .iter()
        .enumerate()
        .map(|(i, answer)| KeyedQuestion {
          question: format!("Question {i}"),
          options: vec!["A".to_string(), "B".to_string(), "C".to_string(), "D".to_string()],
          answer: answer.to_string(),
        })
        .collect(),
    }
  }

  fn submitted(answers: &[&str]) -> Vec<String> {
    answers.iter().map(|a| a.to_string()).collect()
  }

  #[test]
  fn test_exact_matches_score() {
    let score = grade_choices(&key(&["A", "C", "D"]), &submitted(&["A", "B", "D"]));
    assert_eq!(score, ChoiceScore { score: 2, total: 3 });
  }

  #[test]
  fn test_extra_answers_count_toward_total_only() {
    let score = grade_choices(&key(&["A"]), &submitted(&["A", "A", "A"]));
    assert_eq!(score, ChoiceScore { score: 1, total: 3 });
  }

  #[test]
  fn test_match_is_case_sensitive() {
    let score = grade_choices(&key(&["B"]), &submitted(&["b"]));
    assert_eq!(score.score, 0);
  }

  #[test]
  fn test_key_parses_from_plain_array() {
    let json = r#"[{"question": "2+2?", "options": ["3", "4"], "answer": "4"}]"#;
    let key: AnswerKey = serde_json::from_str(json).unwrap();
    assert_eq!(key.len(), 1);
    assert_eq!(key.questions[0].answer, "4");
  }
}
