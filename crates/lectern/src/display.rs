//! Display formatting utilities for CLI output

use colored::*;

use crate::evaluate::AnswerEvaluation;
use crate::grading::ChoiceScore;
use crate::insights::ClassInsights;
use crate::matcher::QuestionAnalysis;
use crate::submissions::QuestionReport;

const PREVIEW_CHARS: usize = 60;

/// Shorten text to `max` characters, marking the cut with an ellipsis
pub fn preview(text: &str, max: usize) -> String {
  if text.chars().count() <= max {
    text.to_string()
  } else {
    format!("{}...", text.chars().take(max).collect::<String>())
  }
}

/// Wrap text to fit within a specified width
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
  let mut lines = Vec::new();

  for paragraph in text.split('\n') {
    if paragraph.trim().is_empty() {
      lines.push(String::new());
      continue;
    }

    let mut current_line = String::new();

    for word in paragraph.split_whitespace() {
      if current_line.is_empty() {
        current_line = word.to_string();
      } else if current_line.len() + 1 + word.len() <= width {
        current_line.push(' ');
        current_line.push_str(word);
      } else {
        lines.push(current_line);
        current_line = word.to_string();
      }
    }

    if !current_line.is_empty() {
      lines.push(current_line);
    }
  }

  lines
}

pub fn display_segments(segments: &[String]) {
  if segments.is_empty() {
    println!("No segments found");
    return;
  }

  for (i, segment) in segments.iter().enumerate() {
    println!("{} {}", format!("[{i}]").cyan(), segment);
  }
}

pub fn display_analysis(analysis: &QuestionAnalysis) {
  println!("{} {}", "Question:".bold(), analysis.original_question);

  match &analysis.main_topic {
    Some(topic) => println!("{} {}", "Main topic:".bold(), preview(topic, PREVIEW_CHARS).yellow()),
    None => println!("{} {}", "Main topic:".bold(), "none above threshold".dimmed()),
  }

  for concept in &analysis.relevant_concepts {
    println!(
      "  - {} ({}, similarity {:.2})",
      preview(&concept.content, PREVIEW_CHARS),
      concept.source.to_string().blue(),
      concept.similarity
    );
  }
  println!();
}

pub fn display_evaluations(evaluations: &[AnswerEvaluation]) {
  for evaluation in evaluations {
    println!("{} {}", "Answer:".bold(), evaluation.answer);
    println!("  Coverage: {:.1}%", evaluation.coverage_score * 100.0);

    if let Some(alignment) = &evaluation.knowledge_alignment {
      println!(
        "  Best knowledge match: {} ({:.2})",
        preview(&alignment.best_match, PREVIEW_CHARS),
        alignment.score
      );
    }

    let review = if evaluation.needs_review { "Yes".red().bold() } else { "No".green() };
    println!("  Needs review: {review}");
    println!();
  }
}

pub fn display_insights(insights: &ClassInsights) {
  println!("{}", "=== Class insights ===".blue().bold());
  println!("Overall coverage: {:.1}% across {} answers", insights.class_coverage, insights.total_answers);
  println!();

  for performance in &insights.concept_performance {
    println!("- {}", preview(&performance.concept, PREVIEW_CHARS));
    println!("  - Coverage: {:.1}%", performance.coverage_percentage);
    println!("  - Avg similarity: {:.2}", performance.average_similarity);
  }

  if insights.problem_areas.is_empty() {
    println!("{} No significant problem areas detected.", "✓".green());
  } else {
    println!("{}", "Topics needing review:".yellow().bold());
    for concept in &insights.problem_areas {
      println!("- {}", preview(concept, PREVIEW_CHARS));
    }
  }
  println!();
}

pub fn display_report(report: &QuestionReport) {
  display_analysis(&report.analysis);
  display_evaluations(&report.evaluations);
  display_insights(&report.insights);
}

pub fn display_choice_score(student: &str, score: &ChoiceScore) {
  println!("{}: {}/{}", student.cyan(), score.score, score.total);
}

pub fn display_questions(questions: &[String]) {
  if questions.is_empty() {
    println!("No questions returned");
    return;
  }

  for question in questions {
    for line in wrap_text(question, 80) {
      println!("{line}");
    }
    println!();
  }
}

pub fn display_class_analysis(analysis: &str) {
  println!("{}", "=== Class analysis ===".blue().bold());
  for line in wrap_text(analysis, 80) {
    println!("{line}");
  }
  println!();
}
