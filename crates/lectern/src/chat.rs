//! Workspace chat endpoint client: drafts descriptive questions from lecture
//! and textbook text, and asks for a written analysis of a class's test.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{LecternError, Result};
use crate::submissions::SubmissionSet;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
  message: String,
  mode: String,
  session_id: String,
  attachments: Vec<String>,
  reset: bool,
}

impl ChatRequest {
  fn new(message: String) -> Self {
    Self {
      message,
      mode: "chat".to_string(),
      session_id: uuid::Uuid::new_v4().to_string(),
      attachments: Vec::new(),
      reset: false,
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
  text_response: Option<String>,
}

impl ChatResponse {
  fn into_text(self) -> Result<String> {
    self
      .text_response
      .ok_or_else(|| LecternError::input("chat response has no textResponse field"))
  }
}

pub struct ChatClient {
  client: Client,
  config: LlmConfig,
}

impl ChatClient {
  pub fn new(config: LlmConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| LecternError::input(format!("Failed to create HTTP client: {e}")))?;

    Ok(Self { client, config })
  }

  pub fn endpoint(&self) -> String {
    chat_endpoint(&self.config.base_url, &self.config.workspace_slug)
  }

  /// Ask the model for `count` questions common to both passages
  pub async fn draft_questions(
    &self,
    lecture_text: &str,
    textbook_text: &str,
    count: usize,
  ) -> anyhow::Result<Vec<String>> {
    debug!(count, "requesting question drafts");
    let text = self.send(build_question_prompt(lecture_text, textbook_text, count)).await?;
    Ok(parse_questions(&text))
  }

  /// Ask the model for a written review of the whole class's submissions
  pub async fn analyse_class(
    &self,
    lecture_text: &str,
    textbook_text: &str,
    submissions: &SubmissionSet,
  ) -> anyhow::Result<String> {
    debug!(students = submissions.submissions.len(), "requesting class analysis");
    let prompt = build_analysis_prompt(
      lecture_text,
      textbook_text,
      &submissions.questions(),
      &submissions.answers_by_student(),
    );
    let text = self.send(prompt).await?;
    Ok(text.trim().to_string())
  }

  async fn send(&self, message: String) -> anyhow::Result<String> {
    let url = self.endpoint();
    debug!(%url, "posting chat message");

    let mut builder = self.client.post(&url).json(&ChatRequest::new(message));
    if let Some(key) = &self.config.api_key {
      builder = builder.bearer_auth(key);
    }

    let response = builder.send().await?;
    if !response.status().is_success() {
      let status = response.status();
      let error_text = response.text().await?;
      return Err(anyhow::anyhow!("Chat request failed ({}): {}", status, error_text));
    }

    let body: ChatResponse = response.json().await?;
    Ok(body.into_text()?)
  }
}

pub fn chat_endpoint(base_url: &str, workspace_slug: &str) -> String {
  format!("{}/workspace/{}/chat", base_url.trim_end_matches('/'), workspace_slug)
}

pub fn build_question_prompt(lecture_text: &str, textbook_text: &str, count: usize) -> String {
  format!(
    "Based on the paragraphs {lecture_text} and {textbook_text}, generate {count} descriptive \
     questions that test understanding of the key concepts.\n\
     The questions you are taking should be common to both the paragraphs."
  )
}

/// Prompt carrying both sources, the questions asked and every student's answers
pub fn build_analysis_prompt(
  lecture_text: &str,
  textbook_text: &str,
  questions: &[String],
  answers_by_student: &BTreeMap<String, Vec<String>>,
) -> String {
  let mut prompt = String::from("Analyze the following test submissions and provide insights:\n\n");

  prompt.push_str("Materials used for questions:\n");
  prompt.push_str(&format!("1. Lecture transcript: {lecture_text}\n"));
  prompt.push_str(&format!("2. Textbook content: {textbook_text}\n\n"));

  prompt.push_str("Questions asked:\n");
  for (i, question) in questions.iter().enumerate() {
    prompt.push_str(&format!("{}. {question}\n", i + 1));
  }

  prompt.push_str("\nStudent answers:\n");
  for (student, answers) in answers_by_student {
    prompt.push_str(&format!("{student}:\n"));
    for (i, answer) in answers.iter().enumerate() {
      prompt.push_str(&format!("  {}. {answer}\n", i + 1));
    }
  }

  prompt.push_str(
    "\nPlease provide:\n\
     1. Overall class performance analysis\n\
     2. Common misconceptions or areas where students struggled\n\
     3. Suggestions for improvement\n\
     4. Individual student performance highlights",
  );
  prompt
}

/// Split a model reply into questions.
///
/// Questions are separated by blank lines. The last chunk is the model's
/// closing remark and is dropped.
pub fn parse_questions(text: &str) -> Vec<String> {
  let chunks: Vec<&str> = text.split("\n\n").collect();
  let keep = chunks.len().saturating_sub(1);

  chunks[..keep]
    .iter()
    .map(|chunk| chunk.trim())
    .filter(|chunk| !chunk.is_empty())
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_questions_drops_trailing_chunk() {
    let reply = "1. What is photosynthesis?\n\n2. Where does it occur?\n\nLet me know if you need more.";
    assert_eq!(
      parse_questions(reply),
      vec!["1. What is photosynthesis?".to_string(), "2. Where does it occur?".to_string()]
    );
  }

  #[test]
  fn test_parse_questions_single_chunk() {
    assert!(parse_questions("Only one block of text").is_empty());
    assert!(parse_questions("").is_empty());
  }

  #[test]
  fn test_parse_questions_skips_blank_chunks() {
    let reply = "Q1?\n\n\n\nQ2?\n\n";
    assert_eq!(parse_questions(reply), vec!["Q1?".to_string(), "Q2?".to_string()]);
  }

  #[test]
  fn test_chat_endpoint() {
    assert_eq!(
      chat_endpoint("http://localhost:3001/api/v1/", "biology"),
      "http://localhost:3001/api/v1/workspace/biology/chat"
    );
  }

  #[test]
  fn test_question_prompt_mentions_both_sources() {
    let prompt = build_question_prompt("LECTURE", "TEXTBOOK", 4);
    assert!(prompt.contains("LECTURE"));
    assert!(prompt.contains("TEXTBOOK"));
    assert!(prompt.contains("generate 4 descriptive"));
  }

  #[test]
  fn test_analysis_prompt_lists_questions_and_students() {
    let questions = vec!["What do chloroplasts do?".to_string(), "Name the gas".to_string()];
    let mut answers = BTreeMap::new();
    answers.insert("Bo".to_string(), vec!["No idea".to_string(), "Nitrogen".to_string()]);
    answers.insert("Ada".to_string(), vec!["Capture light".to_string(), "Oxygen".to_string()]);

    let prompt = build_analysis_prompt("LECTURE", "TEXTBOOK", &questions, &answers);

    assert!(prompt.contains("1. Lecture transcript: LECTURE"));
    assert!(prompt.contains("2. Textbook content: TEXTBOOK"));
    assert!(prompt.contains("1. What do chloroplasts do?\n2. Name the gas\n"));
    assert!(prompt.contains("Ada:\n  1. Capture light\n  2. Oxygen\n"));
    assert!(prompt.contains("Bo:\n  1. No idea\n  2. Nitrogen\n"));
    // students are listed by name
    assert!(prompt.find("Ada:").unwrap() < prompt.find("Bo:").unwrap());
    assert!(prompt.ends_with("4. Individual student performance highlights"));
  }

  #[test]
  fn test_analysis_prompt_without_submissions() {
    let prompt = build_analysis_prompt("L", "T", &[], &BTreeMap::new());
    assert!(prompt.contains("Questions asked:\n\nStudent answers:\n\nPlease provide:"));
  }

  #[test]
  fn test_request_serializes_camel_case() {
    let request = ChatRequest::new("m".to_string());
    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["message"], "m");
    assert_eq!(json["mode"], "chat");
    assert!(json["sessionId"].is_string());
    assert_eq!(json["reset"], false);
  }

  #[test]
  fn test_response_text() {
    let body: ChatResponse =
      serde_json::from_str(r#"{"id": "x", "textResponse": "The class did well."}"#).unwrap();
    assert_eq!(body.into_text().unwrap(), "The class did well.");
  }

  #[test]
  fn test_response_without_text() {
    let body: ChatResponse = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
    let err = body.into_text().unwrap_err();
    assert!(matches!(err, LecternError::Input { .. }));
  }
}
