//! Configuration management for Lectern
//!
//! Handles loading, validating and saving the engine thresholds, the embedder
//! selection and the question-drafting endpoint settings.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{LecternError, Result};

pub const CONFIG_ENV_VAR: &str = "LECTERN_CONFIG";
pub const API_KEY_ENV_VAR: &str = "LECTERN_API_KEY";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LecternConfig {
  #[serde(default)]
  pub engine: EngineConfig,
  #[serde(default)]
  pub embedder: EmbedderConfig,
  #[serde(default)]
  pub llm: LlmConfig,
}

/// Matching and scoring thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
  /// Minimum cosine similarity for a concept to count as matched (exclusive)
  #[serde(default = "default_concept_threshold")]
  pub concept_threshold: f32,
  /// Sentences grouped into each knowledge segment
  #[serde(default = "default_sentences_per_segment")]
  pub sentences_per_segment: usize,
  /// Maximum relevant concepts kept per question
  #[serde(default = "default_max_concepts")]
  pub max_concepts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
  Hashing,
  Onnx,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedderConfig {
  #[serde(default = "default_embedder_kind")]
  pub kind: EmbedderKind,
  /// Width of the hashing embedder's vectors
  #[serde(default = "default_dimensions")]
  pub dimensions: usize,
  #[serde(default)]
  pub model_path: Option<PathBuf>,
  #[serde(default)]
  pub tokenizer_path: Option<PathBuf>,
}

/// Chat endpoint used to draft questions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub api_key: Option<String>,
  #[serde(default = "default_workspace_slug")]
  pub workspace_slug: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  #[serde(default = "default_num_questions")]
  pub num_questions: usize,
}

fn default_concept_threshold() -> f32 {
  0.7
}
fn default_sentences_per_segment() -> usize {
  2
}
fn default_max_concepts() -> usize {
  3
}
fn default_embedder_kind() -> EmbedderKind {
  EmbedderKind::Hashing
}
pub const DEFAULT_DIMENSIONS: usize = 384;

fn default_dimensions() -> usize {
  DEFAULT_DIMENSIONS
}
fn default_base_url() -> String {
  "http://localhost:3001/api/v1".to_string()
}
fn default_workspace_slug() -> String {
  "lectern".to_string()
}
fn default_timeout_secs() -> u64 {
  120
}
fn default_num_questions() -> usize {
  5
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      concept_threshold: default_concept_threshold(),
      sentences_per_segment: default_sentences_per_segment(),
      max_concepts: default_max_concepts(),
    }
  }
}

impl Default for EmbedderConfig {
  fn default() -> Self {
    Self {
      kind: default_embedder_kind(),
      dimensions: default_dimensions(),
      model_path: None,
      tokenizer_path: None,
    }
  }
}

impl Default for LlmConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      api_key: None,
      workspace_slug: default_workspace_slug(),
      timeout_secs: default_timeout_secs(),
      num_questions: default_num_questions(),
    }
  }
}

impl EngineConfig {
  pub fn validate(&self) -> Result<()> {
    if !(-1.0..=1.0).contains(&self.concept_threshold) {
      return Err(LecternError::invalid_config(format!(
        "concept_threshold must be within [-1, 1], got {}",
        self.concept_threshold
      )));
    }
    if self.sentences_per_segment == 0 {
      return Err(LecternError::invalid_config("sentences_per_segment must be at least 1"));
    }
    if self.max_concepts == 0 {
      return Err(LecternError::invalid_config("max_concepts must be at least 1"));
    }
    Ok(())
  }
}

impl LecternConfig {
  /// Load configuration from a YAML file
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let content = std::fs::read_to_string(path)?;
    let mut config: LecternConfig = serde_yaml::from_str(&content)?;
    config.apply_env();
    config.validate()?;
    Ok(config)
  }

  /// Load configuration from `$LECTERN_CONFIG`, the current directory, the
  /// user config directory, or defaults
  pub fn load() -> Result<Self> {
    if let Ok(path) = env::var(CONFIG_ENV_VAR) {
      return Self::load_from_file(path);
    }

    for path in Self::search_paths() {
      if path.exists() {
        return Self::load_from_file(path);
      }
    }

    let mut config = LecternConfig::default();
    config.apply_env();
    Ok(config)
  }

  fn search_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> =
      ["lectern.yaml", ".lectern.yaml", "config.yaml"].iter().map(PathBuf::from).collect();
    if let Some(dir) = dirs::config_dir() {
      paths.push(dir.join("lectern").join("config.yaml"));
    }
    paths
  }

  /// Save configuration to a YAML file
  pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
    let content = serde_yaml::to_string(self)?;
    std::fs::write(path, content)?;
    Ok(())
  }

  pub fn validate(&self) -> Result<()> {
    self.engine.validate()?;
    if self.embedder.dimensions == 0 {
      return Err(LecternError::invalid_config("embedder.dimensions must be at least 1"));
    }
    Ok(())
  }

  fn apply_env(&mut self) {
    if let Ok(key) = env::var(API_KEY_ENV_VAR) {
      if !key.is_empty() {
        self.llm.api_key = Some(key);
      }
    }
  }
}
