use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::evaluate::AnswerEvaluation;
use crate::matcher::QuestionAnalysis;

/// Concepts covered by fewer than this share of answers are problem areas
pub const PROBLEM_AREA_PERCENTAGE: f32 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptPerformance {
  pub concept: String,
  pub times_covered: usize,
  pub times_missed: usize,
  /// Mean similarity over the answers that covered the concept
  pub average_similarity: f32,
  pub coverage_percentage: f32,
}

/// Class-wide view of how one question was answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInsights {
  pub question: String,
  pub main_topic: Option<String>,
  pub concept_performance: Vec<ConceptPerformance>,
  pub problem_areas: Vec<String>,
  /// Mean coverage score as a percentage
  pub class_coverage: f32,
  pub total_answers: usize,
}

#[derive(Default)]
struct ConceptTally {
  times_covered: usize,
  times_missed: usize,
  similarity_sum: f32,
}

/// Aggregate answer evaluations into per-concept class statistics.
///
/// Every relevant concept gets an entry, even if no answer covered it.
/// Concepts with identical content share one entry, at the rank of their first
/// occurrence, and count at most once per answer. Ratios with a zero
/// denominator are reported as 0.
pub fn generate_insights(
  analysis: &QuestionAnalysis,
  evaluations: &[AnswerEvaluation],
) -> ClassInsights {
  let mut concepts = analysis.expected_concepts();
  let mut seen = HashSet::new();
  concepts.retain(|concept| seen.insert(concept.clone()));

  let mut tallies: Vec<ConceptTally> = concepts.iter().map(|_| ConceptTally::default()).collect();

  for evaluation in evaluations {
    for (concept, tally) in concepts.iter().zip(tallies.iter_mut()) {
      match evaluation.covered_concepts.iter().find(|covered| covered.concept == *concept) {
        Some(covered) => {
          tally.times_covered += 1;
          tally.similarity_sum += covered.similarity;
        }
        None => tally.times_missed += 1,
      }
    }
  }

  let total_answers = evaluations.len();

  let concept_performance: Vec<ConceptPerformance> = concepts
    .into_iter()
    .zip(tallies)
    .map(|(concept, tally)| ConceptPerformance {
      concept,
      times_covered: tally.times_covered,
      times_missed: tally.times_missed,
      average_similarity: ratio(tally.similarity_sum, tally.times_covered),
      coverage_percentage: ratio(tally.times_covered as f32, total_answers) * 100.0,
    })
    .collect();

  let problem_areas = concept_performance
    .iter()
    .filter(|performance| performance.coverage_percentage < PROBLEM_AREA_PERCENTAGE)
    .map(|performance| performance.concept.clone())
    .collect();

  let coverage_sum: f32 = evaluations.iter().map(|e| e.coverage_score).sum();

  ClassInsights {
    question: analysis.original_question.clone(),
    main_topic: analysis.main_topic.clone(),
    concept_performance,
    problem_areas,
    class_coverage: ratio(coverage_sum, total_answers) * 100.0,
    total_answers,
  }
}

fn ratio(numerator: f32, denominator: usize) -> f32 {
  if denominator == 0 {
    0.0
  } else {
    numerator / denominator as f32
  }
}
