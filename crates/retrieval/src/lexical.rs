//! Term-vector similarity.
//!
//! Texts become sparse term-frequency vectors; closeness is their cosine.
//! Good enough to rank a few hundred template chunks without an embedding
//! model.

use std::collections::HashMap;

/// A sparse term-frequency vector.
pub type TermVector = HashMap<String, f32>;

/// Lowercased alphanumeric terms of length two or more.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(|t| t.to_lowercase())
}

pub fn term_vector(text: &str) -> TermVector {
    let mut tf = TermVector::new();
    for term in tokenize(text) {
        *tf.entry(term).or_insert(0.0) += 1.0;
    }
    tf
}

/// Cosine similarity in [0, 1]; 0.0 if either vector is empty.
pub fn cosine_similarity(a: &TermVector, b: &TermVector) -> f32 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(term, x)| large.get(term).map(|y| *x as f64 * *y as f64))
        .sum();

    let norm = |v: &TermVector| v.values().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let denom = norm(a) * norm(b);
    if denom < 1e-10 {
        return 0.0;
    }
    (dot / denom) as f32
}
