use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::embedding::{embed_all, ensure_width, Embedder};
use crate::error::Result;
use crate::knowledge::KnowledgeBase;
use crate::matcher::QuestionAnalysis;
use crate::segment::normalize;
use crate::similarity::{argmax, cosine_similarity, similarities};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveredConcept {
  pub concept: String,
  pub similarity: f32,
}

/// Closest segment in the whole knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeAlignment {
  pub best_match: String,
  pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEvaluation {
  pub answer: String,
  /// Expected concepts matched above the threshold, in expected order
  pub covered_concepts: Vec<CoveredConcept>,
  /// Covered over expected, 0 when nothing was expected
  pub coverage_score: f32,
  /// `None` only when the knowledge base is empty
  pub knowledge_alignment: Option<KnowledgeAlignment>,
  pub needs_review: bool,
}

/// Score each answer against the concepts relevant to its question.
///
/// Expected concept embeddings are computed once and reused for every answer,
/// and all answers are embedded in a single batch after normalization. Results
/// come back in answer order.
pub fn evaluate_answers<E: Embedder + ?Sized>(
  embedder: &E,
  knowledge_base: &KnowledgeBase,
  analysis: &QuestionAnalysis,
  answers: &[String],
  config: &EngineConfig,
) -> Result<Vec<AnswerEvaluation>> {
  if answers.is_empty() {
    return Ok(Vec::new());
  }

  let expected_concepts = analysis.expected_concepts();
  let expected_embeddings = embed_all(embedder, &expected_concepts)?;

  let normalized: Vec<String> = answers.iter().map(|answer| normalize(answer)).collect();
  let answer_embeddings = embed_all(embedder, &normalized)?;

  // everything is compared against one width: the knowledge base's, else the concepts'
  let width = knowledge_base.dimensions().or_else(|| expected_embeddings.first().map(Vec::len));
  if let Some(width) = width {
    ensure_width(&expected_embeddings, width, "expected concept embedding")?;
    ensure_width(&answer_embeddings, width, "answer embedding")?;
  }

  let evaluations: Vec<AnswerEvaluation> = answers
    .iter()
    .zip(answer_embeddings.iter())
    .map(|(answer, embedding)| {
      score_answer(
        answer,
        embedding,
        &expected_concepts,
        &expected_embeddings,
        knowledge_base,
        config.concept_threshold,
      )
    })
    .collect();

  debug!(
    answers = evaluations.len(),
    expected = expected_concepts.len(),
    flagged = evaluations.iter().filter(|e| e.needs_review).count(),
    "evaluated answers"
  );

  Ok(evaluations)
}

fn score_answer(
  answer: &str,
  embedding: &[f32],
  expected_concepts: &[String],
  expected_embeddings: &[Vec<f32>],
  knowledge_base: &KnowledgeBase,
  threshold: f32,
) -> AnswerEvaluation {
  let covered_concepts: Vec<CoveredConcept> = expected_concepts
    .iter()
    .zip(expected_embeddings.iter())
    .filter_map(|(concept, concept_embedding)| {
      let similarity = cosine_similarity(embedding, concept_embedding);
      (similarity > threshold).then(|| CoveredConcept { concept: concept.clone(), similarity })
    })
    .collect();

  let knowledge_scores = similarities(embedding, knowledge_base.combined_embeddings());
  let knowledge_alignment = argmax(&knowledge_scores).map(|best| KnowledgeAlignment {
    best_match: knowledge_base.combined_segments()[best].content.clone(),
    score: knowledge_scores[best],
  });

  let covered = covered_concepts.len();
  let expected = expected_concepts.len();

  AnswerEvaluation {
    answer: answer.to_string(),
    covered_concepts,
    coverage_score: coverage_score(covered, expected),
    knowledge_alignment,
    needs_review: needs_review(covered, expected),
  }
}

/// Fraction of expected concepts covered; 0 when nothing is expected
pub fn coverage_score(covered: usize, expected: usize) -> f32 {
  if expected == 0 {
    0.0
  } else {
    covered as f32 / expected as f32
  }
}

/// Strictly fewer than half the expected concepts covered.
///
/// Exactly half is not flagged, and nothing expected is never flagged.
pub fn needs_review(covered: usize, expected: usize) -> bool {
  (covered as f64) < (expected as f64) / 2.0
}
