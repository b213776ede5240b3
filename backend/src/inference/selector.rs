use std::cmp::Ordering;

pub const TOP_K: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub top_class: String,
    pub top_confidence: f32,
    pub top3: Vec<(String, f32)>,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("empty score vector")]
    EmptyScores,
    #[error("{scores} scores but only {classes} class names")]
    MissingClassNames { scores: usize, classes: usize },
}

/// Picks the arg-max class and the top-3 classes from a score vector.
/// Confidences are percentages (score * 100). Fewer than 3 scores yield
/// fewer top entries rather than an error.
pub fn select(scores: &[f32], class_names: &[&str]) -> Result<Selection, SelectionError> {
    if scores.is_empty() {
        return Err(SelectionError::EmptyScores);
    }
    if scores.len() > class_names.len() {
        return Err(SelectionError::MissingClassNames {
            scores: scores.len(),
            classes: class_names.len(),
        });
    }

    // Stable sort keeps the lower index first on ties, including
    // bit-identical scores; NaN compares as equal.
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));

    let top1 = order[0];
    let top3 = order
        .iter()
        .take(TOP_K)
        .map(|&i| (class_names[i].to_string(), scores[i] * 100.0))
        .collect();

    Ok(Selection {
        top_class: class_names[top1].to_string(),
        top_confidence: scores[top1] * 100.0,
        top3,
    })
}
