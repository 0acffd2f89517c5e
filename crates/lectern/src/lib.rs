//! Lectern - Semantic Concept Matching for Classrooms
//!
//! Builds a knowledge base from a lecture transcript and textbook text, finds
//! the concepts a question is about, scores free-text student answers against
//! those concepts and aggregates class-wide coverage for instructors.

pub mod chat;
pub mod commands;
pub mod config;
pub mod display;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod grading;
pub mod insights;
pub mod knowledge;
pub mod matcher;
pub mod segment;
pub mod similarity;
pub mod submissions;

pub use config::{EngineConfig, LecternConfig};
pub use embedding::{Embedder, HashingEmbedder, MockEmbedder};
pub use engine::Analyzer;
pub use error::{LecternError, Result};
pub use evaluate::{AnswerEvaluation, CoveredConcept, KnowledgeAlignment};
pub use insights::{ClassInsights, ConceptPerformance};
pub use knowledge::{KnowledgeBase, Segment, SharedKnowledge, Source};
pub use matcher::{QuestionAnalysis, RelevantConcept};
