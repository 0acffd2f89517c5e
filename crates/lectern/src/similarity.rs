/// Calculate cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
  if a.len() != b.len() {
    return 0.0;
  }

  let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
  let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
  let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

  if magnitude_a == 0.0 || magnitude_b == 0.0 {
    0.0
  } else {
    dot_product / (magnitude_a * magnitude_b)
  }
}

/// Similarity of `query` against every row, in row order
pub fn similarities(query: &[f32], rows: &[Vec<f32>]) -> Vec<f32> {
  rows.iter().map(|row| cosine_similarity(query, row)).collect()
}

/// NaN ranks below every real score
fn rank_key(score: f32) -> f32 {
  if score.is_nan() {
    f32::NEG_INFINITY
  } else {
    score
  }
}

/// Row indices ordered by similarity, highest first. Equal scores keep row order.
pub fn rank_descending(scores: &[f32]) -> Vec<usize> {
  let mut indices: Vec<usize> = (0..scores.len()).collect();
  // sort_by is stable, so ties resolve to the lower index
  indices.sort_by(|&a, &b| rank_key(scores[b]).total_cmp(&rank_key(scores[a])));
  indices
}

/// Index of the highest score, first occurrence on ties
pub fn argmax(scores: &[f32]) -> Option<usize> {
  let mut best: Option<usize> = None;
  for (i, score) in scores.iter().enumerate() {
    match best {
      Some(b) if rank_key(*score) <= rank_key(scores[b]) => {}
      _ => best = Some(i),
    }
  }
  best
}
