use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::embedding::{embed_all, ensure_width, Embedder};
use crate::error::Result;
use crate::segment::segment;

/// Where a piece of knowledge came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
  Lecture,
  Textbook,
}

impl fmt::Display for Source {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Source::Lecture => write!(f, "lecture"),
      Source::Textbook => write!(f, "textbook"),
    }
  }
}

/// A few consecutive sentences of lecture or textbook text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
  pub content: String,
  pub source: Source,
  /// Position in the combined (lecture first) ordering
  pub index: usize,
}

/// Segmented and embedded lecture and textbook material.
///
/// Combined rows are the lecture segments followed by the textbook segments;
/// row `i` of `combined_embeddings` belongs to `combined_segments[i]`.
/// Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeBase {
  lecture_segments: Vec<String>,
  textbook_segments: Vec<String>,
  lecture_embeddings: Vec<Vec<f32>>,
  textbook_embeddings: Vec<Vec<f32>>,
  combined_segments: Vec<Segment>,
  combined_embeddings: Vec<Vec<f32>>,
}

impl KnowledgeBase {
  /// Segment and embed both sources.
  ///
  /// Segment text is embedded exactly as written. The embedder is called once
  /// for the lecture and once for the textbook; the combined matrix is their
  /// concatenation. Either source may be empty.
  pub fn build<E: Embedder + ?Sized>(
    embedder: &E,
    lecture_text: &str,
    textbook_text: &str,
    sentences_per_segment: usize,
  ) -> Result<Self> {
    let lecture_segments = segment(lecture_text, sentences_per_segment);
    let textbook_segments = segment(textbook_text, sentences_per_segment);

    let lecture_embeddings = embed_all(embedder, &lecture_segments)?;
    let textbook_embeddings = embed_all(embedder, &textbook_segments)?;
    if let Some(width) = lecture_embeddings.first().map(Vec::len) {
      ensure_width(&textbook_embeddings, width, "textbook embedding")?;
    }

    debug!(
      lecture_segments = lecture_segments.len(),
      textbook_segments = textbook_segments.len(),
      embedder = embedder.name(),
      "built knowledge base"
    );

    Ok(Self::from_parts(lecture_segments, lecture_embeddings, textbook_segments, textbook_embeddings))
  }

  /// Assemble a knowledge base from already embedded segments
  pub fn from_parts(
    lecture_segments: Vec<String>,
    lecture_embeddings: Vec<Vec<f32>>,
    textbook_segments: Vec<String>,
    textbook_embeddings: Vec<Vec<f32>>,
  ) -> Self {
    let lecture = lecture_segments.iter().map(|content| (content, Source::Lecture));
    let textbook = textbook_segments.iter().map(|content| (content, Source::Textbook));

    let combined_segments = lecture
      .chain(textbook)
      .enumerate()
      .map(|(index, (content, source))| Segment { content: content.clone(), source, index })
      .collect();

    let combined_embeddings =
      lecture_embeddings.iter().chain(textbook_embeddings.iter()).cloned().collect();

    Self {
      lecture_segments,
      textbook_segments,
      lecture_embeddings,
      textbook_embeddings,
      combined_segments,
      combined_embeddings,
    }
  }

  pub fn lecture_segments(&self) -> &[String] {
    &self.lecture_segments
  }

  pub fn textbook_segments(&self) -> &[String] {
    &self.textbook_segments
  }

  pub fn lecture_embeddings(&self) -> &[Vec<f32>] {
    &self.lecture_embeddings
  }

  pub fn textbook_embeddings(&self) -> &[Vec<f32>] {
    &self.textbook_embeddings
  }

  pub fn combined_segments(&self) -> &[Segment] {
    &self.combined_segments
  }

  pub fn combined_embeddings(&self) -> &[Vec<f32>] {
    &self.combined_embeddings
  }

  /// Source of the combined row at `index`
  pub fn source_of(&self, index: usize) -> Source {
    if index < self.lecture_segments.len() {
      Source::Lecture
    } else {
      Source::Textbook
    }
  }

  /// Width of the stored embeddings, `None` when empty
  pub fn dimensions(&self) -> Option<usize> {
    self.combined_embeddings.first().map(Vec::len)
  }

  pub fn len(&self) -> usize {
    self.combined_segments.len()
  }

  pub fn is_empty(&self) -> bool {
    self.combined_segments.is_empty()
  }
}

/// Publication point for the knowledge base a service is currently serving.
///
/// Readers take an `Arc` snapshot; rebuilding constructs a complete new
/// knowledge base first and then swaps it in, so a snapshot never changes
/// underneath its reader.
#[derive(Debug, Default)]
pub struct SharedKnowledge {
  current: RwLock<Arc<KnowledgeBase>>,
}

impl SharedKnowledge {
  pub fn new(knowledge_base: KnowledgeBase) -> Self {
    Self { current: RwLock::new(Arc::new(knowledge_base)) }
  }

  pub fn snapshot(&self) -> Arc<KnowledgeBase> {
    match self.current.read() {
      Ok(guard) => Arc::clone(&guard),
      Err(poisoned) => Arc::clone(&poisoned.into_inner()),
    }
  }

  /// Replace the served knowledge base, returning the previous one
  pub fn publish(&self, knowledge_base: KnowledgeBase) -> Arc<KnowledgeBase> {
    self.swap(Arc::new(knowledge_base))
  }

  fn swap(&self, next: Arc<KnowledgeBase>) -> Arc<KnowledgeBase> {
    let mut guard = match self.current.write() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    std::mem::replace(&mut *guard, next)
  }

  /// Build from fresh texts and publish only if building succeeds
  pub fn rebuild<E: Embedder + ?Sized>(
    &self,
    embedder: &E,
    lecture_text: &str,
    textbook_text: &str,
    sentences_per_segment: usize,
  ) -> Result<Arc<KnowledgeBase>> {
    let knowledge_base =
      Arc::new(KnowledgeBase::build(embedder, lecture_text, textbook_text, sentences_per_segment)?);
    self.swap(Arc::clone(&knowledge_base));
    Ok(knowledge_base)
  }
}
