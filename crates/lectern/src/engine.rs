use crate::config::EngineConfig;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::evaluate::{self, AnswerEvaluation};
use crate::insights::{self, ClassInsights};
use crate::knowledge::KnowledgeBase;
use crate::matcher::{self, QuestionAnalysis};

/// Entry point tying an embedder to the engine thresholds.
///
/// Holds no knowledge base of its own: callers build one and pass it into
/// each operation, and own its lifecycle (see `SharedKnowledge`).
pub struct Analyzer<E: Embedder> {
  embedder: E,
  config: EngineConfig,
}

impl<E: Embedder> Analyzer<E> {
  pub fn new(embedder: E, config: EngineConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self { embedder, config })
  }

  pub fn with_defaults(embedder: E) -> Self {
    Self { embedder, config: EngineConfig::default() }
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub fn embedder(&self) -> &E {
    &self.embedder
  }

  pub fn build_knowledge_base(&self, lecture_text: &str, textbook_text: &str) -> Result<KnowledgeBase> {
    KnowledgeBase::build(&self.embedder, lecture_text, textbook_text, self.config.sentences_per_segment)
  }

  pub fn analyze_question(&self, question: &str, knowledge_base: &KnowledgeBase) -> Result<QuestionAnalysis> {
    matcher::analyze_question(&self.embedder, knowledge_base, question, &self.config)
  }

  pub fn evaluate_answers(
    &self,
    analysis: &QuestionAnalysis,
    knowledge_base: &KnowledgeBase,
    answers: &[String],
  ) -> Result<Vec<AnswerEvaluation>> {
    evaluate::evaluate_answers(&self.embedder, knowledge_base, analysis, answers, &self.config)
  }

  pub fn generate_insights(
    &self,
    analysis: &QuestionAnalysis,
    evaluations: &[AnswerEvaluation],
  ) -> ClassInsights {
    insights::generate_insights(analysis, evaluations)
  }
}
