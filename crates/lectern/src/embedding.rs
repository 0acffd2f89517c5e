use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::config::{EmbedderConfig, EmbedderKind};
use crate::error::LecternError;

/// Text to vector capability consumed by the engine.
///
/// Implementations must be deterministic for a given input and must not let
/// the composition or order of a batch change any row.
pub trait Embedder: Send + Sync {
  fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

  fn embed(&self, text: &str) -> Result<Vec<f32>> {
    self
      .embed_batch(&[text.to_string()])?
      .pop()
      .ok_or_else(|| anyhow!("Embedder returned no vector for a single text"))
  }

  fn name(&self) -> &str;
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
  fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    (**self).embed_batch(texts)
  }

  fn name(&self) -> &str {
    (**self).name()
  }
}

/// Embed a batch and check the result has one vector per text, all of one width.
///
/// Any failure becomes `LecternError::Embedding`; nothing is padded or zero-filled.
pub(crate) fn embed_all<E: Embedder + ?Sized>(
  embedder: &E,
  texts: &[String],
) -> crate::error::Result<Vec<Vec<f32>>> {
  if texts.is_empty() {
    return Ok(Vec::new());
  }

  let vectors = embedder
    .embed_batch(texts)
    .map_err(|e| LecternError::embedding(format!("{}: {e:#}", embedder.name())))?;

  if vectors.len() != texts.len() {
    return Err(LecternError::embedding(format!(
      "{} returned {} vectors for {} texts",
      embedder.name(),
      vectors.len(),
      texts.len()
    )));
  }

  let width = vectors[0].len();
  if width == 0 || vectors.iter().any(|v| v.len() != width) {
    return Err(LecternError::embedding(format!(
      "{} returned vectors of inconsistent dimension",
      embedder.name()
    )));
  }

  Ok(vectors)
}

/// Fail unless every vector is `width` wide
pub(crate) fn ensure_width(
  vectors: &[Vec<f32>],
  width: usize,
  what: &str,
) -> crate::error::Result<()> {
  match vectors.iter().find(|vector| vector.len() != width) {
    Some(vector) => Err(LecternError::embedding(format!(
      "{what} has dimension {}, expected {width}",
      vector.len()
    ))),
    None => Ok(()),
  }
}

/// Build the embedder described by the configuration
pub fn create_embedder(config: &EmbedderConfig) -> crate::error::Result<Box<dyn Embedder>> {
  match config.kind {
    EmbedderKind::Hashing => Ok(Box::new(HashingEmbedder::new(config.dimensions))),
    #[cfg(feature = "neural")]
    EmbedderKind::Onnx => {
      let model = config
        .model_path
        .as_deref()
        .ok_or_else(|| LecternError::invalid_config("embedder.model_path is required for onnx"))?;
      let tokenizer = config.tokenizer_path.as_deref().ok_or_else(|| {
        LecternError::invalid_config("embedder.tokenizer_path is required for onnx")
      })?;
      let embedder = onnx::OnnxEmbedder::load(model, tokenizer)
        .map_err(|e| LecternError::embedding(format!("{e:#}")))?;
      Ok(Box::new(embedder))
    }
    #[cfg(not(feature = "neural"))]
    EmbedderKind::Onnx => Err(LecternError::invalid_config(
      "onnx embedder requested but lectern was built without the `neural` feature",
    )),
  }
}

const STOP_WORDS: &[&str] = &[
  "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "from",
  "is", "are", "was", "were", "be", "been", "do", "does", "did", "it", "its", "this", "that",
];

/// Deterministic bag-of-words embedder using signed feature hashing.
///
/// Needs no model files, which makes it the default for offline use. Texts that
/// share content words land close together; paraphrases do not.
pub struct HashingEmbedder {
  dimensions: usize,
  stop_words: HashSet<&'static str>,
}

impl HashingEmbedder {
  pub fn new(dimensions: usize) -> Self {
    Self { dimensions: dimensions.max(1), stop_words: STOP_WORDS.iter().copied().collect() }
  }

  pub fn dimensions(&self) -> usize {
    self.dimensions
  }

  fn embed_one(&self, text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; self.dimensions];

    let words = text
      .split_whitespace()
      .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
      .filter(|word| !word.is_empty() && !self.stop_words.contains(word.as_str()));

    for word in words {
      let hash = fnv1a(word.as_bytes());
      let bucket = (hash % self.dimensions as u64) as usize;
      let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
      vector[bucket] += sign;
    }

    normalize_vector(vector)
  }
}

impl Default for HashingEmbedder {
  fn default() -> Self {
    Self::new(crate::config::DEFAULT_DIMENSIONS)
  }
}

impl Embedder for HashingEmbedder {
  fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    Ok(texts.iter().map(|text| self.embed_one(text)).collect())
  }

  fn name(&self) -> &str {
    "hashing"
  }
}

fn fnv1a(bytes: &[u8]) -> u64 {
  let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
  for byte in bytes {
    hash ^= u64::from(*byte);
    hash = hash.wrapping_mul(0x0100_0000_01b3);
  }
  hash
}

fn normalize_vector(vector: Vec<f32>) -> Vec<f32> {
  let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
  if magnitude > 0.0 {
    vector.into_iter().map(|x| x / magnitude).collect()
  } else {
    vector
  }
}

/// Lookup-table embedder for tests and demos.
///
/// Texts found in `vectors` get their fixed vector; everything else gets
/// `fallback`. Every batch it receives is recorded in order.
pub struct MockEmbedder {
  pub vectors: HashMap<String, Vec<f32>>,
  pub fallback: Vec<f32>,
  pub fail_on_texts: Vec<String>,
  calls: Mutex<Vec<Vec<String>>>,
}

impl MockEmbedder {
  pub fn new() -> Self {
    Self {
      vectors: HashMap::new(),
      fallback: vec![0.1, 0.2, 0.3],
      fail_on_texts: vec![],
      calls: Mutex::new(Vec::new()),
    }
  }

  pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
    self.vectors.insert(text.to_string(), vector);
    self
  }

  pub fn with_fallback(mut self, vector: Vec<f32>) -> Self {
    self.fallback = vector;
    self
  }

  pub fn failing_on(mut self, text: &str) -> Self {
    self.fail_on_texts.push(text.to_string());
    self
  }

  /// Every batch passed to `embed_batch`, oldest first
  pub fn calls(&self) -> Vec<Vec<String>> {
    self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
  }
}

impl Default for MockEmbedder {
  fn default() -> Self {
    Self::new()
  }
}

impl Embedder for MockEmbedder {
  fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    if let Ok(mut calls) = self.calls.lock() {
      calls.push(texts.to_vec());
    }

    for text in texts {
      if self.fail_on_texts.contains(text) {
        return Err(anyhow!("Mock failure for text: {}", text));
      }
    }

    Ok(texts.iter().map(|text| self.vectors.get(text).unwrap_or(&self.fallback).clone()).collect())
  }

  fn name(&self) -> &str {
    "mock"
  }
}

#[cfg(feature = "neural")]
pub mod onnx {
  use anyhow::{anyhow, Result};
  use ort::session::{builder::GraphOptimizationLevel, Session};
  use ort::value::Tensor;
  use std::path::Path;
  use std::sync::Mutex;

  use super::{normalize_vector, Embedder};

  const MAX_TEXT_LEN: usize = 8192;

  /// Sentence-transformer model (e.g. all-MiniLM-L6-v2) exported to ONNX
  pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
  }

  impl OnnxEmbedder {
    pub fn load(model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
      let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level1)?
        .commit_from_file(model_path)
        .map_err(|e| anyhow!("Failed to load ONNX model {}: {}", model_path.display(), e))?;

      let tokenizer = tokenizers::Tokenizer::from_file(tokenizer_path)
        .map_err(|e| anyhow!("Failed to load tokenizer {}: {}", tokenizer_path.display(), e))?;

      Ok(Self { session: Mutex::new(session), tokenizer })
    }
  }

  impl Embedder for OnnxEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
      if texts.is_empty() {
        return Ok(vec![]);
      }

      for text in texts {
        if text.len() > MAX_TEXT_LEN {
          return Err(anyhow!("Text too long: {} characters (max {})", text.len(), MAX_TEXT_LEN));
        }
      }

      let text_refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
      let encodings = self
        .tokenizer
        .encode_batch(text_refs, true)
        .map_err(|e| anyhow!("Failed to encode texts: {}", e))?;

      let (ids, mask, batch, length) = batch_tokens(&encodings);
      let token_type_ids = vec![0i64; batch * length];

      let ids = Tensor::from_array(([batch, length], ids.into_boxed_slice()))?;
      let mask_tensor = Tensor::from_array(([batch, length], mask.clone().into_boxed_slice()))?;
      let token_type_ids = Tensor::from_array(([batch, length], token_type_ids.into_boxed_slice()))?;

      let mut session = self.session.lock().map_err(|_| anyhow!("ONNX session lock poisoned"))?;
      let outputs = session.run(ort::inputs![
        "input_ids" => ids,
        "attention_mask" => mask_tensor,
        "token_type_ids" => token_type_ids
      ])?;

      let output = outputs
        .get("last_hidden_state")
        .ok_or_else(|| anyhow!("Model has no last_hidden_state output"))?;
      let (shape, data) = output.try_extract_tensor::<f32>()?;

      if shape.len() != 3 {
        return Err(anyhow!("Unexpected output shape {:?}", shape));
      }
      let hidden = shape[2] as usize;

      Ok(mean_pool(data, &mask, batch, length, hidden))
    }

    fn name(&self) -> &str {
      "onnx"
    }
  }

  fn batch_tokens(encodings: &[tokenizers::Encoding]) -> (Vec<i64>, Vec<i64>, usize, usize) {
    let batch = encodings.len();
    let length = encodings.iter().map(|e| e.len()).max().unwrap_or(0);

    let mut ids = Vec::with_capacity(batch * length);
    let mut mask = Vec::with_capacity(batch * length);

    for encoding in encodings {
      let encoding_ids = encoding.get_ids();
      let encoding_mask = encoding.get_attention_mask();

      for i in 0..length {
        if i < encoding_ids.len() {
          ids.push(i64::from(encoding_ids[i]));
          mask.push(i64::from(encoding_mask[i]));
        } else {
          ids.push(0);
          mask.push(0);
        }
      }
    }

    (ids, mask, batch, length)
  }

  /// Attention-masked mean over token states, then L2 normalization
  fn mean_pool(data: &[f32], mask: &[i64], batch: usize, length: usize, hidden: usize) -> Vec<Vec<f32>> {
    (0..batch)
      .map(|b| {
        let mut pooled = vec![0.0f32; hidden];
        let mut tokens = 0.0f32;
        for t in 0..length {
          if mask[b * length + t] == 0 {
            continue;
          }
          tokens += 1.0;
          let offset = (b * length + t) * hidden;
          for (h, value) in pooled.iter_mut().enumerate() {
            *value += data[offset + h];
          }
        }
        if tokens > 0.0 {
          pooled.iter_mut().for_each(|v| *v /= tokens);
        }
        normalize_vector(pooled)
      })
      .collect()
  }
}
