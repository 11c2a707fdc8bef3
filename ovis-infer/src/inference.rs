//! Batch inference over flattened windows
//!
//! The classifier is an injected collaborator: anything that maps a
//! `(N, window_length, 3)` tensor to an `(N, num_labels)` probability matrix.
//! Loading and caching the model is the caller's concern.

use ndarray::{Array2, Array3, ArrayView1};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::records::{FlattenedTable, LabeledRow, LabeledTable};
use crate::tensor::to_tensor;

/// Sequence classifier backend
pub trait Classifier {
    /// Score a batch of windows
    ///
    /// `input` has shape `(N, window_length, 3)`; the result must have shape
    /// `(N, num_labels)`. Rows need not sum to one.
    fn predict(&self, input: &Array3<f32>) -> Result<Array2<f32>>;
}

impl<F> Classifier for F
where
    F: Fn(&Array3<f32>) -> Result<Array2<f32>>,
{
    fn predict(&self, input: &Array3<f32>) -> Result<Array2<f32>> {
        self(input)
    }
}

/// Index and value of the largest non-NaN entry; ties keep the lowest index
pub fn argmax(scores: ArrayView1<'_, f32>) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((idx, score)),
        }
    }
    best
}

/// Label every window in `table` with one batched classifier call
pub fn predict<C>(table: &FlattenedTable, classifier: &C, labels: &[String]) -> Result<LabeledTable>
where
    C: Classifier + ?Sized,
{
    if labels.is_empty() {
        return Err(Error::configuration("label vocabulary is empty"));
    }

    let mut labeled = LabeledTable::new(
        table.window_length(),
        table.entity_column().map(str::to_string),
    );

    if table.is_empty() {
        debug!("No windows to classify, skipping classifier call");
        return Ok(labeled);
    }

    let input = to_tensor(table.rows(), table.window_length())?;
    let probabilities = classifier.predict(&input)?;

    let (rows, classes) = probabilities.dim();
    if classes != labels.len() {
        return Err(Error::inference(format!(
            "classifier returned {} classes but the label vocabulary has {} ({:?})",
            classes,
            labels.len(),
            labels
        )));
    }
    if rows != table.len() {
        return Err(Error::inference(format!(
            "classifier returned {} rows for {} windows (expected shape ({}, {}))",
            rows,
            table.len(),
            table.len(),
            labels.len()
        )));
    }

    for (row_idx, (window, scores)) in table
        .rows()
        .iter()
        .zip(probabilities.rows())
        .enumerate()
    {
        let (label_idx, confidence) = argmax(scores).ok_or_else(|| {
            Error::inference(format!("row {}: every class probability is NaN", row_idx))
        })?;
        if !confidence.is_finite() {
            return Err(Error::inference(format!(
                "row {}: confidence {} is not finite",
                row_idx, confidence
            )));
        }

        labeled.push(LabeledRow {
            window: window.clone(),
            behaviour: labels[label_idx].clone(),
            confidence: f64::from(confidence),
        })?;
    }

    info!(
        windows = labeled.len(),
        classes = labels.len(),
        "Classified windows"
    );

    Ok(labeled)
}
