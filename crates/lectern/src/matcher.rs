use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::embedding::{embed_all, ensure_width, Embedder};
use crate::error::Result;
use crate::knowledge::{KnowledgeBase, Source};
use crate::segment::normalize;
use crate::similarity::{rank_descending, similarities};

/// A knowledge segment judged relevant to a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevantConcept {
  pub content: String,
  pub source: Source,
  pub similarity: f32,
}

/// What a question is about, in terms of the knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnalysis {
  pub original_question: String,
  /// Most similar first, all strictly above the concept threshold
  pub relevant_concepts: Vec<RelevantConcept>,
  pub main_topic: Option<String>,
}

impl QuestionAnalysis {
  /// Contents of the relevant concepts, in ranked order
  pub fn expected_concepts(&self) -> Vec<String> {
    self.relevant_concepts.iter().map(|concept| concept.content.clone()).collect()
  }
}

/// Find the knowledge segments a question is asking about.
///
/// The question is normalized before embedding. The `max_concepts` most
/// similar segments are considered and only those strictly above
/// `concept_threshold` are kept. Equal similarities favour the earlier
/// segment, so lecture material wins ties. An empty knowledge base yields no
/// concepts without touching the embedder.
pub fn analyze_question<E: Embedder + ?Sized>(
  embedder: &E,
  knowledge_base: &KnowledgeBase,
  question: &str,
  config: &EngineConfig,
) -> Result<QuestionAnalysis> {
  if knowledge_base.is_empty() {
    debug!("knowledge base is empty, no concepts to match");
    return Ok(QuestionAnalysis {
      original_question: question.to_string(),
      relevant_concepts: Vec::new(),
      main_topic: None,
    });
  }

  let query = vec![normalize(question)];
  let mut embedded = embed_all(embedder, &query)?;
  if let Some(width) = knowledge_base.dimensions() {
    ensure_width(&embedded, width, "question embedding")?;
  }
  let question_embedding = embedded.remove(0);

  let scores = similarities(&question_embedding, knowledge_base.combined_embeddings());
  let segments = knowledge_base.combined_segments();

  let relevant_concepts: Vec<RelevantConcept> = rank_descending(&scores)
    .into_iter()
    .take(config.max_concepts)
    .filter(|&index| scores[index] > config.concept_threshold)
    .map(|index| RelevantConcept {
      content: segments[index].content.clone(),
      source: knowledge_base.source_of(index),
      similarity: scores[index],
    })
    .collect();

  debug!(
    candidates = scores.len(),
    relevant = relevant_concepts.len(),
    threshold = config.concept_threshold,
    "analyzed question"
  );

  let main_topic = relevant_concepts.first().map(|concept| concept.content.clone());

  Ok(QuestionAnalysis { original_question: question.to_string(), relevant_concepts, main_topic })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::embedding::MockEmbedder;
  use crate::error::LecternError;

  fn kb_with(embedder: &MockEmbedder, lecture: &str, textbook: &str) -> KnowledgeBase {
    KnowledgeBase::build(embedder, lecture, textbook, 1).unwrap()
  }

  fn embedder() -> MockEmbedder {
    MockEmbedder::new()
      .with_vector("Alpha.", vec![1.0, 0.0, 0.0])
      .with_vector("Beta.", vec![0.9, 0.1, 0.0])
      .with_vector("Gamma.", vec![0.0, 1.0, 0.0])
      .with_vector("Delta.", vec![0.8, 0.2, 0.0])
      .with_vector("Alpha twin.", vec![1.0, 0.0, 0.0])
      .with_vector("what is alpha?", vec![1.0, 0.0, 0.0])
      .with_fallback(vec![0.0, 0.0, 1.0])
  }

  #[test]
  fn test_top_concepts_ranked_and_thresholded() -> Result<()> {
    let embedder = embedder();
    let kb = kb_with(&embedder, "Alpha. Gamma.", "Beta. Delta.");

    let analysis = analyze_question(&embedder, &kb, "  What IS   alpha? ", &EngineConfig::default())?;

    let contents: Vec<&str> = analysis.relevant_concepts.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["Alpha.", "Beta.", "Delta."]);
    assert_eq!(analysis.relevant_concepts[0].source, Source::Lecture);
    assert_eq!(analysis.relevant_concepts[1].source, Source::Textbook);
    assert!(analysis.relevant_concepts.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    assert!(analysis.relevant_concepts.iter().all(|c| c.similarity > 0.7));
    assert_eq!(analysis.main_topic.as_deref(), Some("Alpha."));
    assert_eq!(analysis.original_question, "  What IS   alpha? ");
    Ok(())
  }

  #[test]
  fn test_question_is_normalized_before_embedding() -> Result<()> {
    let embedder = embedder();
    let kb = kb_with(&embedder, "Alpha.", "");
    analyze_question(&embedder, &kb, "What\tis ALPHA?", &EngineConfig::default())?;

    let calls = embedder.calls();
    assert_eq!(calls.last().unwrap(), &vec!["what is alpha?".to_string()]);
    Ok(())
  }

  #[test]
  fn test_ties_prefer_lecture() -> Result<()> {
    let embedder = embedder();
    let kb = kb_with(&embedder, "Gamma.", "Alpha twin.");
    let kb_tied = kb_with(&embedder, "Alpha.", "Alpha twin.");

    let config = EngineConfig { max_concepts: 1, ..EngineConfig::default() };
    let analysis = analyze_question(&embedder, &kb_tied, "what is alpha?", &config)?;
    assert_eq!(analysis.relevant_concepts.len(), 1);
    assert_eq!(analysis.relevant_concepts[0].content, "Alpha.");
    assert_eq!(analysis.relevant_concepts[0].source, Source::Lecture);

    let analysis = analyze_question(&embedder, &kb, "what is alpha?", &config)?;
    assert_eq!(analysis.relevant_concepts[0].source, Source::Textbook);
    Ok(())
  }

  #[test]
  fn test_threshold_above_all_similarities() -> Result<()> {
    let embedder = embedder();
    let kb = kb_with(&embedder, "Alpha. Gamma.", "Beta.");
    let config = EngineConfig { concept_threshold: 1.0, ..EngineConfig::default() };

    let analysis = analyze_question(&embedder, &kb, "what is alpha?", &config)?;
    assert!(analysis.relevant_concepts.is_empty());
    assert_eq!(analysis.main_topic, None);
    Ok(())
  }

  #[test]
  fn test_threshold_is_strict() -> Result<()> {
    let embedder = MockEmbedder::new()
      .with_vector("Exact.", vec![1.0, 0.0])
      .with_vector("q", vec![1.0, 0.0]);
    let kb = kb_with(&embedder, "Exact.", "");
    let config = EngineConfig { concept_threshold: 1.0, ..EngineConfig::default() };

    let analysis = analyze_question(&embedder, &kb, "q", &config)?;
    assert!(analysis.relevant_concepts.is_empty());
    Ok(())
  }

  #[test]
  fn test_empty_knowledge_base() -> Result<()> {
    let embedder = embedder();
    let kb = KnowledgeBase::default();

    let analysis = analyze_question(&embedder, &kb, "anything?", &EngineConfig::default())?;
    assert!(analysis.relevant_concepts.is_empty());
    assert_eq!(analysis.main_topic, None);
    assert!(embedder.calls().is_empty());
    Ok(())
  }

  #[test]
  fn test_question_of_another_width_is_rejected() {
    let embedder = MockEmbedder::new()
      .with_vector("Lecture fact.", vec![1.0, 0.0, 0.0])
      .with_vector("Book fact.", vec![0.0, 1.0, 0.0])
      .with_vector("q", vec![0.0, 1.0]);
    let kb = kb_with(&embedder, "Lecture fact.", "Book fact.");

    let result = analyze_question(&embedder, &kb, "q", &EngineConfig::default());
    match result {
      Err(LecternError::Embedding { message }) => {
        assert!(message.contains("question embedding has dimension 2, expected 3"))
      }
      other => panic!("expected an embedding error, got {other:?}"),
    }
  }

  #[test]
  fn test_embedding_failure_propagates() {
    let embedder = embedder().failing_on("broken question");
    let kb = kb_with(&embedder, "Alpha.", "");

    let result = analyze_question(&embedder, &kb, "Broken  Question", &EngineConfig::default());
    assert!(matches!(result, Err(LecternError::Embedding { .. })));
  }

  #[test]
  fn test_expected_concepts_order() -> Result<()> {
    let embedder = embedder();
    let kb = kb_with(&embedder, "Delta. Alpha.", "Beta.");
    let analysis = analyze_question(&embedder, &kb, "what is alpha?", &EngineConfig::default())?;
    assert_eq!(analysis.expected_concepts(), vec!["Alpha.", "Beta.", "Delta."]);
    Ok(())
  }
}
