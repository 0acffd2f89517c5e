//! Sentence segmentation and query normalization.
//!
//! Segmentation is purely syntactic: text is split on every `.`, so decimals
//! ("3.14") and abbreviations ("e.g.") are split as well.

pub const DEFAULT_SENTENCES_PER_SEGMENT: usize = 2;

/// Split `text` into segments of up to `sentences_per_segment` sentences.
///
/// Sentences are rejoined with `". "` and every segment ends with `.`.
/// Empty or whitespace-only input yields no segments. A chunk size of zero
/// is treated as one.
pub fn segment(text: &str, sentences_per_segment: usize) -> Vec<String> {
  let per_segment = sentences_per_segment.max(1);

  let sentences: Vec<&str> =
    text.split('.').map(str::trim).filter(|sentence| !sentence.is_empty()).collect();

  sentences.chunks(per_segment).map(|chunk| format!("{}.", chunk.join(". "))).collect()
}

/// Lowercase and collapse whitespace runs to single spaces
pub fn normalize(text: &str) -> String {
  text.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_segment_pairs_sentences() {
    let text = "One. Two. Three. Four. Five.";
    let segments = segment(text, 2);
    assert_eq!(segments, vec!["One. Two.", "Three. Four.", "Five."]);
  }

  #[test]
  fn test_segment_two_sentences_single_segment() {
    let text = "Photosynthesis converts light energy to chemical energy. \
                This process occurs in chloroplasts.";
    let segments = segment(text, DEFAULT_SENTENCES_PER_SEGMENT);
    assert_eq!(segments.len(), 1);
    assert_eq!(
      segments[0],
      "Photosynthesis converts light energy to chemical energy. This process occurs in chloroplasts."
    );
  }

  #[test]
  fn test_segment_without_trailing_period() {
    assert_eq!(segment("Alpha. Beta", 2), vec!["Alpha. Beta."]);
  }

  #[test]
  fn test_segment_empty_and_whitespace() {
    assert!(segment("", 2).is_empty());
    assert!(segment("   \n\t ", 2).is_empty());
    assert!(segment(" . .. . ", 2).is_empty());
  }

  #[test]
  fn test_segment_splits_decimals_literally() {
    let segments = segment("Pi is 3.14 roughly. Done.", 1);
    assert_eq!(segments, vec!["Pi is 3.", "14 roughly.", "Done."]);
  }

  #[test]
  fn test_segment_zero_chunk_size() {
    assert_eq!(segment("A. B.", 0), vec!["A.", "B."]);
  }

  #[test]
  fn test_segment_preserves_every_sentence_once() {
    let text = "a. b.  c .d. e. f. g";
    let segments = segment(text, 3);

    let rejoined: Vec<String> = segments
      .iter()
      .flat_map(|s| s.split('.').map(str::trim).filter(|s| !s.is_empty()).map(String::from))
      .collect();
    assert_eq!(rejoined, vec!["a", "b", "c", "d", "e", "f", "g"]);
    assert!(segments.iter().all(|s| s.matches('.').count() <= 3));
  }

  #[test]
  fn test_normalize() {
    assert_eq!(normalize("  How DO plants\n\tmake   Energy? "), "how do plants make energy?");
    assert_eq!(normalize("   "), "");
  }
}
